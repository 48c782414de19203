//! Reads script lines from any async reader and writes output lines.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::driver::Driver;
use crate::types::{CliResult, Output};

use super::framing;

/// Replays a script through a driver.
pub struct ScriptTransport {
    driver: Driver,
}

impl ScriptTransport {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    /// Run until EOF, then wait for in-flight captures and markers.
    ///
    /// Bad lines are reported as `error` output and skipped. Lines starting
    /// with `#` are comments.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> CliResult<()> {
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        tracing::info!("Script transport started");

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let result = match framing::parse_command(trimmed) {
                Ok(command) => self.driver.apply(command).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!("Line {line_no}: {e}");
                self.driver.report(&e);
            }
        }

        tracing::info!("End of script, waiting for in-flight work");
        self.driver.drain().await;
        Ok(())
    }
}

/// Write outputs as JSON lines until every sender is dropped.
pub async fn write_outputs<W: AsyncWrite + Unpin>(
    mut rx: UnboundedReceiver<Output>,
    mut writer: W,
) -> CliResult<()> {
    while let Some(output) = rx.recv().await {
        let framed = framing::frame_output(&output)?;
        writer.write_all(framed.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
