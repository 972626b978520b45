//! Frame reassembly
//!
//! TCP hands the session arbitrary chunks: half a frame, a frame and a
//! half, one byte. The assembler buffers chunks until the byte count the
//! header declares has arrived, then hands out the exact frame. A chunk
//! that opens with a fresh header supersedes whatever partial frame was
//! accumulating, and bytes that belong to no frame are dropped with a
//! warning rather than poisoning the stream.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::ParseError;
use crate::frame::{self, FrameHeader};

/// Which envelope layout the assembler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frames sent by displays: 0x30 in byte 2, source id in byte 3
    Reply,
    /// Frames sent by controllers: destination id in byte 2, 0x30 in byte 3
    Request,
}

impl Direction {
    fn peek(self, data: &[u8]) -> Result<FrameHeader, ParseError> {
        match self {
            Direction::Reply => frame::peek_reply_header(data),
            Direction::Request => frame::peek_request_header(data),
        }
    }
}

/// Accumulates received chunks into complete frames.
#[derive(Debug)]
pub struct FrameAssembler {
    direction: Direction,
    /// Bytes of the frame currently accumulating; empty when idle
    buf: Vec<u8>,
    /// Complete frames waiting to be taken
    ready: VecDeque<Vec<u8>>,
    dropped_frames: u64,
    dropped_bytes: u64,
}

impl FrameAssembler {
    /// Create an assembler for one traffic direction.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            buf: Vec::new(),
            ready: VecDeque::new(),
            dropped_frames: 0,
            dropped_bytes: 0,
        }
    }

    /// Feed one received chunk.
    pub fn push_chunk(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.direction.peek(data) {
            Ok(_) => {
                // A fresh header. The frame that was accumulating can never
                // complete now; anything completable was already drained.
                if !self.buf.is_empty() {
                    warn!(
                        have = self.buf.len(),
                        "discarding partial frame superseded by a new header"
                    );
                    self.dropped_frames += 1;
                    self.buf.clear();
                }
                self.buf.extend_from_slice(data);
            }
            Err(ParseError::Incomplete { .. }) if self.buf.is_empty() => {
                // Too short to carry a full header but still a plausible
                // frame start; hold it until more arrives.
                self.buf.extend_from_slice(data);
            }
            Err(_) if self.buf.is_empty() => {
                warn!(len = data.len(), "dropping bytes that start no frame");
                self.dropped_bytes += data.len() as u64;
                return;
            }
            Err(_) => {
                // Continuation of the frame in progress.
                self.buf.extend_from_slice(data);
            }
        }
        self.drain_complete();
    }

    fn drain_complete(&mut self) {
        let header = match self.direction.peek(&self.buf) {
            Ok(header) => header,
            Err(ParseError::Incomplete { .. }) => return,
            Err(e) => {
                // The held prefix stopped looking like a frame.
                warn!(error = %e, len = self.buf.len(), "dropping buffered bytes");
                self.dropped_bytes += self.buf.len() as u64;
                self.buf.clear();
                return;
            }
        };
        let total = header.total_len();
        if self.buf.len() < total {
            return;
        }
        let excess = self.buf.split_off(total);
        self.ready.push_back(std::mem::take(&mut self.buf));
        if !excess.is_empty() {
            warn!(len = excess.len(), "discarding trailing bytes after a complete frame");
            self.dropped_bytes += excess.len() as u64;
        }
    }

    /// Take the next complete frame, oldest first.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    /// Whether a partial frame is buffered.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Incomplete frames discarded so far.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Raw bytes dropped outside any complete frame so far.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }

    /// Drop all buffered state, counting nothing as lost.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.ready.clear();
    }
}
