//! High-level display handle
//!
//! `DisplayClient` is a cheap cloneable handle to a background session
//! task. Every operation encodes a request frame, queues it on the session,
//! and awaits the decoded reply. Handles address one destination; clone a
//! handle and change the destination to drive several panels on a daisy
//! chain through the same socket.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use lfd_protocol::catalog;
use lfd_protocol::error::CommandError;
use lfd_protocol::frame;
use lfd_protocol::{MonitorId, ParameterReply, PowerMode, Reply, ReplyId};

use crate::error::ClientError;
use crate::events::SessionEvent;
use crate::session::{run_session, run_tcp_session, SessionCommand, SessionConfig, SessionExit};

/// Channel depth between handles and the session task.
const CHANNEL_CAPACITY: usize = 32;

/// Handle to a display session.
#[derive(Debug, Clone)]
pub struct DisplayClient {
    cmd_tx: mpsc::Sender<SessionCommand>,
    destination: MonitorId,
}

impl DisplayClient {
    /// Start a session against `addr` and return a handle plus the session
    /// event stream.
    ///
    /// Dialing happens on the spawned task, so this returns immediately;
    /// requests sent before the connection is up wait in the queue.
    pub fn connect(
        addr: impl Into<String>,
        destination: MonitorId,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run_tcp_session(addr.into(), config, cmd_rx, event_tx));
        (
            Self {
                cmd_tx,
                destination,
            },
            event_rx,
        )
    }

    /// Run a session over an already established transport.
    ///
    /// No reconnection: when `io` closes, the session ends.
    pub fn spawn_with_io<T>(
        io: T,
        destination: MonitorId,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>)
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let _ = event_tx.send(SessionEvent::Connected).await;
            let exit = run_session(io, &config, &mut cmd_rx, &event_tx).await;
            if exit == SessionExit::ConnectionLost {
                let _ = event_tx.send(SessionEvent::Disconnected).await;
            }
        });
        (
            Self {
                cmd_tx,
                destination,
            },
            event_rx,
        )
    }

    /// Destination this handle addresses.
    pub fn destination(&self) -> MonitorId {
        self.destination
    }

    /// Same session, different destination.
    pub fn with_destination(&self, destination: MonitorId) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            destination,
        }
    }

    /// Read a catalog parameter by key, for example `"picture.brightness"`.
    pub async fn get(&self, key: &str) -> Result<ParameterReply, ClientError> {
        let spec = catalog::find_by_key(key)?;
        let payload = frame::build_get(self.destination, spec.page, spec.code)?;
        let expected = ReplyId::Parameter {
            page: spec.page,
            code: spec.code,
        };
        match self.send(payload, Some(expected)).await? {
            Reply::Parameter(reply) => Ok(reply),
            other => Err(mismatch(expected, other)),
        }
    }

    /// Write a catalog parameter by key.
    ///
    /// The value is range-checked against the catalog before anything goes
    /// on the wire. Momentary parameters ignore `value` and send their
    /// fixed trigger value.
    pub async fn set(&self, key: &str, value: u16) -> Result<ParameterReply, ClientError> {
        let spec = catalog::find_by_key(key)?;
        let value = spec.validate_set(value)?;
        self.set_raw(spec.page, spec.code, value).await
    }

    /// Write an option parameter by option name, for example
    /// `set_option("picture.gamma", "srgb")`.
    pub async fn set_option(&self, key: &str, option: &str) -> Result<ParameterReply, ClientError> {
        let spec = catalog::find_by_key(key)?;
        let value = spec
            .option_code(option)
            .ok_or_else(|| CommandError::UnknownOptionName {
                key: spec.key,
                name: option.to_string(),
            })?;
        self.set_raw(spec.page, spec.code, value).await
    }

    async fn set_raw(&self, page: u8, code: u8, value: u16) -> Result<ParameterReply, ClientError> {
        let payload = frame::build_set(self.destination, page, code, value)?;
        let expected = ReplyId::Parameter { page, code };
        match self.send(payload, Some(expected)).await? {
            Reply::Parameter(reply) => Ok(reply),
            other => Err(mismatch(expected, other)),
        }
    }

    /// Query the current power state.
    pub async fn get_power(&self) -> Result<PowerMode, ClientError> {
        let payload = frame::build_get_power(self.destination)?;
        match self.send(payload, Some(ReplyId::PowerStatus)).await? {
            Reply::PowerStatus(mode) => Ok(mode),
            other => Err(mismatch(ReplyId::PowerStatus, other)),
        }
    }

    /// Change the power state. Returns the state the display acknowledged.
    pub async fn set_power(&self, mode: PowerMode) -> Result<PowerMode, ClientError> {
        let payload = frame::build_set_power(self.destination, mode)?;
        match self.send(payload, Some(ReplyId::PowerSet)).await? {
            Reply::PowerSet(mode) => Ok(mode),
            other => Err(mismatch(ReplyId::PowerSet, other)),
        }
    }

    /// Query the model name.
    pub async fn get_model(&self) -> Result<String, ClientError> {
        let payload = frame::build_get_model(self.destination)?;
        match self.send(payload, Some(ReplyId::Model)).await? {
            Reply::Model(name) => Ok(name),
            other => Err(mismatch(ReplyId::Model, other)),
        }
    }

    /// Query the serial number.
    pub async fn get_serial(&self) -> Result<String, ClientError> {
        let payload = frame::build_get_serial(self.destination)?;
        match self.send(payload, Some(ReplyId::Serial)).await? {
            Reply::Serial(serial) => Ok(serial),
            other => Err(mismatch(ReplyId::Serial, other)),
        }
    }

    /// Run the display's self-diagnosis and return its status byte.
    /// Zero means no fault detected.
    pub async fn self_diagnosis(&self) -> Result<u8, ClientError> {
        let payload = frame::build_self_diagnosis(self.destination)?;
        match self.send(payload, Some(ReplyId::SelfDiagnosis)).await? {
            Reply::SelfDiagnosis(status) => Ok(status),
            other => Err(mismatch(ReplyId::SelfDiagnosis, other)),
        }
    }

    /// Commit current settings to the display's non-volatile memory.
    pub async fn save_settings(&self) -> Result<(), ClientError> {
        let payload = frame::build_save_settings(self.destination)?;
        match self.send(payload, Some(ReplyId::SaveSettings)).await? {
            Reply::SaveSettings => Ok(()),
            other => Err(mismatch(ReplyId::SaveSettings, other)),
        }
    }

    /// Send an already encoded frame and return whatever reply comes back.
    ///
    /// Escape hatch for opcodes the catalog does not model. The payload
    /// must be a complete frame, checksum and all; `frame::build_command`
    /// produces suitable input.
    pub async fn send_raw(&self, payload: Vec<u8>) -> Result<Reply, ClientError> {
        self.send(payload, None).await
    }

    /// Stop the session task. Outstanding requests fail with
    /// [`ClientError::Disconnected`].
    pub async fn close(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(
        &self,
        payload: Vec<u8>,
        expected: Option<ReplyId>,
    ) -> Result<Reply, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Send {
                payload,
                expected,
                response: tx,
            })
            .await
            .map_err(|_| ClientError::Disconnected)?;
        rx.await.map_err(|_| ClientError::Disconnected)?
    }
}

fn mismatch(expected: ReplyId, reply: Reply) -> ClientError {
    ClientError::ReplyMismatch {
        expected,
        actual: reply.id(),
    }
}
