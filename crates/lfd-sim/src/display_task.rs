//! Virtual display pump
//!
//! Drives a [`VirtualDisplay`] over any async byte stream: read request
//! bytes, let the display process them, write the replies it queued back
//! out. Tests pair this with `tokio::io::duplex` to stand in for a real
//! display at the end of a TCP connection.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::display::VirtualDisplay;

/// Commands for a running display task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTaskCommand {
    /// Stop pumping and return
    Shutdown,
}

/// Run a virtual display over `stream` until it closes, errors, or a
/// shutdown command arrives.
pub async fn run_display_task<S>(
    mut stream: S,
    mut display: VirtualDisplay,
    mut cmd_rx: mpsc::Receiver<DisplayTaskCommand>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; 1024];
    let display_id = display.id();
    info!(id = %display_id, "virtual display task started");
    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("virtual display stream closed");
                        break;
                    }
                    Ok(n) => {
                        display.handle_chunk(&buf[..n]);
                        while let Some(reply) = display.take_output() {
                            stream.write_all(&reply).await?;
                        }
                        stream.flush().await?;
                    }
                    Err(e) => {
                        warn!(error = %e, "virtual display stream error");
                        return Err(e);
                    }
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(DisplayTaskCommand::Shutdown) | None => break,
                }
            }
        }
    }
    info!("virtual display task ended");
    Ok(())
}
