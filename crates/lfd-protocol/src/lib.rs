//! Wire protocol for the external control port of networked large format
//! displays.
//!
//! Displays listen on TCP port 7142 and speak a framed, hex-expanded
//! protocol: every logical byte crosses the wire as the two ASCII
//! characters of its hex spelling, wrapped in an SOH-led envelope with an
//! XOR checksum. This crate owns that wire format end to end. It builds
//! request frames, parses reply frames, reassembles frames out of arbitrary
//! TCP chunks, and carries the catalog of every parameter the displays
//! expose.
//!
//! # Architecture
//!
//! - [`catalog`]: the static command table and its key/address lookups
//! - [`frame`]: frame construction and parsing for both directions
//! - [`assembler`]: chunk-to-frame reassembly
//! - [`command`]: message types, requests, replies, power modes
//! - [`monitor`]: destination addressing (single, group, broadcast)
//! - [`hex`]: the hex-expanded byte encoding
//!
//! Everything here is synchronous and allocation-light; session handling,
//! sockets and timeouts live in the client crate built on top.
//!
//! # Example
//!
//! ```rust
//! use lfd_protocol::catalog;
//! use lfd_protocol::command::{MessageType, OperationType, Reply};
//! use lfd_protocol::frame;
//! use lfd_protocol::monitor::MonitorId;
//!
//! // Build a brightness query addressed to every display on the link.
//! let spec = catalog::find_by_key("picture.brightness").unwrap();
//! let request = frame::build_get(MonitorId::All, spec.page, spec.code).unwrap();
//! assert_eq!(request[0], 0x01); // SOH
//!
//! // Decode the frame a display answers with.
//! let wire_reply = frame::build_parameter_reply(
//!     MonitorId::Single(1),
//!     MessageType::GetReply,
//!     spec.page,
//!     spec.code,
//!     OperationType::Set,
//!     100,
//!     42,
//! )
//! .unwrap();
//! match frame::parse_reply(&wire_reply).unwrap() {
//!     Reply::Parameter(p) => {
//!         assert_eq!(p.key, "PICTURE.BRIGHTNESS");
//!         assert_eq!(p.value, 42);
//!     }
//!     other => panic!("unexpected reply: {other:?}"),
//! }
//! ```

pub mod assembler;
pub mod catalog;
pub mod command;
pub mod error;
pub mod frame;
pub mod hex;
pub mod monitor;

pub use assembler::{Direction, FrameAssembler};
pub use catalog::{CommandKind, CommandSpec};
pub use command::{
    MessageType, OperationType, ParameterReply, PowerMode, Reply, ReplyId, Request,
};
pub use error::{CommandError, ParseError};
pub use frame::DEFAULT_PORT;
pub use monitor::MonitorId;
