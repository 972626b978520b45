//! Client error types

use thiserror::Error;

use lfd_protocol::command::ReplyId;
use lfd_protocol::error::{CommandError, ParseError};

/// Errors surfaced by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Key lookup, value validation or request building failed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// The reply frame could not be decoded.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// No reply arrived within the configured timeout.
    #[error("timed out waiting for a reply")]
    Timeout,

    /// The session is not connected; the request was never sent.
    #[error("not connected")]
    Disconnected,

    /// The reply does not answer the request that was in flight.
    #[error("reply mismatch: expected {expected:?}, got {actual:?}")]
    ReplyMismatch {
        /// Reply class the request expected
        expected: ReplyId,
        /// Reply class that actually arrived
        actual: ReplyId,
    },

    /// The transport failed while the request was being written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
