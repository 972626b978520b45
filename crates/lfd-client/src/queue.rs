//! Outgoing request bookkeeping
//!
//! The wire protocol carries no correlation ids, so only one request may be
//! outstanding at a time: whatever reply arrives next answers the oldest
//! sent request. The queue enforces that discipline. It is a plain data
//! structure fed explicit timestamps, so the send/complete/expire rules are
//! testable without a runtime or socket.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use lfd_protocol::command::{Reply, ReplyId};

use crate::error::ClientError;

/// One request waiting to be sent or answered.
#[derive(Debug)]
struct PendingRequest {
    /// Reply class this request expects; `None` accepts any reply
    expected: Option<ReplyId>,
    /// Encoded frame to transmit
    payload: Vec<u8>,
    /// Completion channel back to the caller
    responder: oneshot::Sender<Result<Reply, ClientError>>,
    /// Whether the payload has been handed to the transport
    sent: bool,
    /// When the payload was handed to the transport
    sent_at: Option<Instant>,
}

/// FIFO queue holding at most one request in flight.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: VecDeque<PendingRequest>,
}

impl RequestQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request behind everything already queued.
    pub fn push(
        &mut self,
        expected: Option<ReplyId>,
        payload: Vec<u8>,
        responder: oneshot::Sender<Result<Reply, ClientError>>,
    ) {
        self.entries.push_back(PendingRequest {
            expected,
            payload,
            responder,
            sent: false,
            sent_at: None,
        });
    }

    /// If the head request has not been transmitted yet, mark it sent at
    /// `now` and return its payload. Returns `None` while a request is
    /// already in flight or the queue is empty.
    pub fn take_sendable(&mut self, now: Instant) -> Option<Vec<u8>> {
        let head = self.entries.front_mut()?;
        if head.sent {
            return None;
        }
        head.sent = true;
        head.sent_at = Some(now);
        Some(head.payload.clone())
    }

    /// Whether a request is currently awaiting its reply.
    pub fn in_flight(&self) -> bool {
        self.entries.front().map(|e| e.sent).unwrap_or(false)
    }

    /// Number of requests queued, including the one in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attribute a decoded reply to the request in flight.
    ///
    /// Returns the reply back when no request was waiting for one, leaving
    /// the caller to log it. A reply of the wrong class consumes the
    /// request with a mismatch error and is dropped.
    pub fn complete(&mut self, reply: Reply) -> Option<Reply> {
        match self.entries.front() {
            Some(head) if head.sent => {}
            _ => return Some(reply),
        }
        let Some(entry) = self.entries.pop_front() else {
            return Some(reply);
        };
        if let Some(expected) = entry.expected {
            if reply.id() != expected {
                let _ = entry.responder.send(Err(ClientError::ReplyMismatch {
                    expected,
                    actual: reply.id(),
                }));
                return None;
            }
        }
        let _ = entry.responder.send(Ok(reply));
        None
    }

    /// Reject the request in flight with `error`. Returns whether one was.
    pub fn fail_in_flight(&mut self, error: ClientError) -> bool {
        match self.entries.front() {
            Some(head) if head.sent => {}
            _ => return false,
        }
        if let Some(entry) = self.entries.pop_front() {
            let _ = entry.responder.send(Err(error));
            return true;
        }
        false
    }

    /// Reject the request in flight if it has been waiting at least
    /// `timeout`. Returns whether it expired.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> bool {
        let expired = match self.entries.front() {
            Some(head) => {
                head.sent
                    && head
                        .sent_at
                        .map(|at| now.duration_since(at) >= timeout)
                        .unwrap_or(false)
            }
            None => false,
        };
        if expired {
            if let Some(entry) = self.entries.pop_front() {
                let _ = entry.responder.send(Err(ClientError::Timeout));
            }
        }
        expired
    }

    /// Reject everything queued or in flight.
    pub fn fail_all(&mut self, make_error: impl Fn() -> ClientError) {
        for entry in self.entries.drain(..) {
            let _ = entry.responder.send(Err(make_error()));
        }
    }
}
