//! Drives one engine from script commands.
//!
//! The driver stands in for the platform hook and the real screen: it turns
//! commands into input signals and swaps the scripted foreground window.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use anchor_recall::{
    capture_from_base64, capture_from_file, Clock, Dispatched, InputEvent, NccMatcher,
    RecallEngine, ScreenPoint, ScreenRect, ScriptedScreen, SystemClock, WindowRef,
    WindowSnapshot,
};

use crate::overlay::ChannelOverlay;
use crate::types::{CliError, CliResult, Output, ScreenParams, ScriptCommand};

pub struct Driver {
    engine: Arc<RecallEngine>,
    screen: Arc<ScriptedScreen>,
    output: UnboundedSender<Output>,
    pending: Vec<JoinHandle<()>>,
    runtime: Handle,
}

impl Driver {
    pub fn new(output: UnboundedSender<Output>, runtime: Handle) -> Self {
        Self::with_clock(output, Arc::new(SystemClock), runtime)
    }

    pub fn with_clock(
        output: UnboundedSender<Output>,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        let screen = Arc::new(ScriptedScreen::new());
        let overlay = Arc::new(ChannelOverlay::new(output.clone()));
        let engine = Arc::new(RecallEngine::with_parts(
            screen.clone(),
            overlay,
            Arc::new(NccMatcher),
            clock,
            runtime.clone(),
        ));
        Self {
            engine,
            screen,
            output,
            pending: Vec::new(),
            runtime,
        }
    }

    pub fn engine(&self) -> &Arc<RecallEngine> {
        &self.engine
    }

    /// Apply one command. Input signals return as soon as work is dispatched.
    pub async fn apply(&mut self, command: ScriptCommand) -> CliResult<()> {
        if let Some(event) = command.input_event()? {
            self.feed(event);
            return Ok(());
        }

        match command {
            ScriptCommand::Screen(params) => self.load_screen(params)?,
            ScriptCommand::Cursor { x, y } => {
                if !self.screen.move_cursor(ScreenPoint::new(x, y)) {
                    return Err(CliError::NoScreen);
                }
            }
            ScriptCommand::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            ScriptCommand::Anchors => self.emit(Output::Anchors {
                anchors: self.engine.buffer().summaries(),
            }),
            ScriptCommand::Raw(raw) => {
                tracing::debug!("Ignoring raw message {:#06x}", raw.msg);
            }
            ScriptCommand::Pulse | ScriptCommand::HoldDown | ScriptCommand::HoldUp => {}
        }
        Ok(())
    }

    /// Deliver one input signal to the engine.
    pub fn feed(&mut self, event: InputEvent) {
        match self.engine.dispatch(event) {
            Dispatched::Ignored => {}
            Dispatched::Capture(handle) => {
                let tx = self.output.clone();
                self.pending.push(self.runtime.spawn(async move {
                    if let Ok(Some(anchor_id)) = handle.await {
                        let _ = tx.send(Output::Captured { anchor_id });
                    }
                }));
            }
            Dispatched::Recall(handle) => {
                // Outcome is reported only through the overlay.
                self.pending.push(self.runtime.spawn(async move {
                    let _ = handle.await;
                }));
            }
        }
        self.pending.retain(|h| !h.is_finished());
    }

    /// Wait for every capture and recall started so far.
    pub async fn drain(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("In-flight work failed: {e}");
            }
        }
    }

    /// Report an error as an output line.
    pub fn report(&self, error: &CliError) {
        self.emit(Output::Error {
            code: error.code(),
            message: error.to_string(),
        });
    }

    fn emit(&self, output: Output) {
        if self.output.send(output).is_err() {
            tracing::debug!("Output closed");
        }
    }

    fn load_screen(&self, params: ScreenParams) -> CliResult<()> {
        let bitmap = match (&params.path, &params.data) {
            (Some(path), _) => capture_from_file(path)?,
            (None, Some(data)) => {
                capture_from_base64(data, params.mime.as_deref().unwrap_or("image/png"))?
            }
            (None, None) => {
                return Err(CliError::InvalidCommand(
                    "'path' or 'data' required for screen".to_string(),
                ))
            }
        };

        let (width, height) = (bitmap.width() as i32, bitmap.height() as i32);
        let bounds = params
            .bounds
            .unwrap_or_else(|| ScreenRect::new(0, 0, width, height));
        if bounds.width != width || bounds.height != height {
            return Err(CliError::InvalidCommand(format!(
                "bounds {}x{} do not match image {width}x{height}",
                bounds.width, bounds.height
            )));
        }

        tracing::debug!("Screen set to window {} at {bounds:?}", params.window);
        self.screen.set_frame(WindowSnapshot {
            window: WindowRef(params.window),
            bounds,
            cursor: params.cursor,
            bitmap,
        });
        Ok(())
    }
}
