//! Connection session driver
//!
//! A session owns one transport connection and splits it between the
//! outgoing request queue and the incoming reply stream. Displays answer
//! strictly in arrival order, so the session keeps a single request in
//! flight and attributes each decoded reply to it. `run_session` drives one
//! connection until it drops; `run_tcp_session` wraps it in a
//! connect/retry loop so a power-cycled display picks back up on its own.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use lfd_protocol::assembler::{Direction, FrameAssembler};
use lfd_protocol::command::{Reply, ReplyId};
use lfd_protocol::frame;

use crate::error::ClientError;
use crate::events::SessionEvent;
use crate::queue::RequestQueue;

/// Tuning knobs for a display session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a sent request may wait for its reply
    pub reply_timeout: Duration,
    /// How often in-flight requests are checked for expiry
    pub timeout_poll: Duration,
    /// Pause before dialing again after a lost connection
    pub reconnect_delay: Duration,
    /// Whether to dial again after a lost connection
    pub reconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(1000),
            timeout_poll: Duration::from_millis(100),
            reconnect_delay: Duration::from_millis(1000),
            reconnect: true,
        }
    }
}

/// Commands sent to a running session
#[derive(Debug)]
pub enum SessionCommand {
    /// Transmit a frame and route the matching reply back
    Send {
        /// Encoded request frame
        payload: Vec<u8>,
        /// Reply class expected back; `None` accepts any reply
        expected: Option<ReplyId>,
        /// Channel the outcome is delivered on
        response: oneshot::Sender<Result<Reply, ClientError>>,
    },

    /// Stop the session and drop the connection
    Shutdown,
}

/// Why a session loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// Stopped on request
    Shutdown,
    /// The transport closed or failed
    ConnectionLost,
}

/// Drive one established connection until shutdown or loss.
///
/// Requests arrive on `cmd_rx` and queue behind each other; replies are
/// reassembled from the read side and matched to the request in flight.
/// Stream-hygiene and lifecycle events go out on `event_tx`.
pub async fn run_session<T>(
    mut io: T,
    config: &SessionConfig,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
    event_tx: &mpsc::Sender<SessionEvent>,
) -> SessionExit
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut queue = RequestQueue::new();
    let mut assembler = FrameAssembler::new(Direction::Reply);
    let mut read_buf = vec![0u8; 1024];
    let mut seen_dropped_frames = 0u64;
    let mut seen_dropped_bytes = 0u64;

    let mut ticker = interval(config.timeout_poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Send { payload, expected, response }) => {
                        queue.push(expected, payload, response);
                        if let Err(e) = flush_next(&mut io, &mut queue).await {
                            return fail_and_exit(&mut queue, e);
                        }
                    }
                    Some(SessionCommand::Shutdown) | None => {
                        queue.fail_all(|| ClientError::Disconnected);
                        return SessionExit::Shutdown;
                    }
                }
            }

            read = io.read(&mut read_buf) => {
                match read {
                    Ok(0) => {
                        info!("Display closed the connection");
                        queue.fail_all(|| ClientError::Disconnected);
                        return SessionExit::ConnectionLost;
                    }
                    Ok(n) => {
                        assembler.push_chunk(&read_buf[..n]);
                        report_drops(
                            &assembler,
                            event_tx,
                            &mut seen_dropped_frames,
                            &mut seen_dropped_bytes,
                        )
                        .await;
                        while let Some(reply_frame) = assembler.next_frame() {
                            handle_reply(&mut queue, &reply_frame);
                        }
                        if let Err(e) = flush_next(&mut io, &mut queue).await {
                            return fail_and_exit(&mut queue, e);
                        }
                    }
                    Err(e) => {
                        return fail_and_exit(&mut queue, e);
                    }
                }
            }

            _ = ticker.tick() => {
                if queue.expire(Instant::now(), config.reply_timeout) {
                    debug!("Request timed out after {:?}", config.reply_timeout);
                    if let Err(e) = flush_next(&mut io, &mut queue).await {
                        return fail_and_exit(&mut queue, e);
                    }
                }
            }
        }
    }
}

/// Send the next queued request if none is in flight.
async fn flush_next<T>(io: &mut T, queue: &mut RequestQueue) -> std::io::Result<()>
where
    T: AsyncWrite + Unpin,
{
    if let Some(payload) = queue.take_sendable(Instant::now()) {
        debug!("OUT {:02X?}", &payload[..payload.len().min(64)]);
        io.write_all(&payload).await?;
        io.flush().await?;
    }
    Ok(())
}

/// Decode one reassembled frame and resolve the request in flight.
fn handle_reply(queue: &mut RequestQueue, reply_frame: &[u8]) {
    match frame::parse_reply(reply_frame) {
        Ok(reply) => {
            if let Some(stray) = queue.complete(reply) {
                debug!("Dropping unsolicited reply: {:?}", stray);
            }
        }
        Err(e) => {
            warn!("Undecodable reply: {}", e);
            queue.fail_in_flight(ClientError::Parse(e));
        }
    }
}

/// Emit one event per frame and byte-run the assembler discarded since the
/// last check.
async fn report_drops(
    assembler: &FrameAssembler,
    event_tx: &mpsc::Sender<SessionEvent>,
    seen_frames: &mut u64,
    seen_bytes: &mut u64,
) {
    while *seen_frames < assembler.dropped_frames() {
        *seen_frames += 1;
        let _ = event_tx.send(SessionEvent::FrameDropped).await;
    }
    let dropped = assembler.dropped_bytes();
    if dropped > *seen_bytes {
        let count = dropped - *seen_bytes;
        *seen_bytes = dropped;
        let _ = event_tx
            .send(SessionEvent::TrailingBytesDropped { count })
            .await;
    }
}

fn fail_and_exit(queue: &mut RequestQueue, error: std::io::Error) -> SessionExit {
    warn!("Connection error: {}", error);
    queue.fail_in_flight(ClientError::Io(error));
    queue.fail_all(|| ClientError::Disconnected);
    SessionExit::ConnectionLost
}

/// Dial `addr` and run sessions until shutdown.
///
/// While `reconnect` is set, a lost connection or failed dial schedules
/// another attempt after `reconnect_delay`; requests arriving during the
/// gap are rejected rather than held.
pub async fn run_tcp_session(
    addr: String,
    config: SessionConfig,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    loop {
        let stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Connect to {} failed: {}", addr, e);
                if !config.reconnect || !wait_reconnect(&config, &mut cmd_rx, &event_tx).await {
                    break;
                }
                continue;
            }
        };

        info!("Connected to {}", addr);
        let _ = event_tx.send(SessionEvent::Connected).await;

        match run_session(stream, &config, &mut cmd_rx, &event_tx).await {
            SessionExit::Shutdown => break,
            SessionExit::ConnectionLost => {
                let _ = event_tx.send(SessionEvent::Disconnected).await;
                if !config.reconnect || !wait_reconnect(&config, &mut cmd_rx, &event_tx).await {
                    break;
                }
            }
        }
    }

    info!("Session stopped");
}

/// Wait out the reconnect delay, rejecting requests that arrive meanwhile.
///
/// Returns `false` when a shutdown arrived and the caller should stop
/// dialing.
async fn wait_reconnect(
    config: &SessionConfig,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
    event_tx: &mpsc::Sender<SessionEvent>,
) -> bool {
    let _ = event_tx.send(SessionEvent::Reconnecting).await;
    let delay = sleep(config.reconnect_delay);
    tokio::pin!(delay);

    loop {
        tokio::select! {
            _ = &mut delay => return true,
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Send { response, .. }) => {
                        let _ = response.send(Err(ClientError::Disconnected));
                    }
                    Some(SessionCommand::Shutdown) | None => return false,
                }
            }
        }
    }
}
