//! Overlay presenter that reports markers as output lines.

use tokio::sync::mpsc::UnboundedSender;

use anchor_recall::{MarkerId, OverlayPresenter, ScreenPoint};

use crate::types::Output;

/// Forwards `show`/`close` to the output writer.
pub struct ChannelOverlay {
    tx: UnboundedSender<Output>,
}

impl ChannelOverlay {
    pub fn new(tx: UnboundedSender<Output>) -> Self {
        Self { tx }
    }
}

impl OverlayPresenter for ChannelOverlay {
    fn show(&self, marker: MarkerId, at: ScreenPoint) {
        if self.tx.send(Output::MarkerShown { marker, at }).is_err() {
            tracing::debug!("Output closed, marker {marker:?} not reported");
        }
    }

    fn close(&self, marker: MarkerId) {
        if self.tx.send(Output::MarkerClosed { marker }).is_err() {
            tracing::debug!("Output closed, marker {marker:?} close not reported");
        }
    }
}
