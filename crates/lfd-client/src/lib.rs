//! Async Display Control Client
//!
//! This crate provides an async TCP client for the external-control
//! protocol spoken by networked large format displays.
//!
//! # Architecture
//!
//! A background session task owns the socket. It reassembles reply frames
//! from the read side, keeps a single request in flight (the protocol has
//! no correlation ids, replies arrive strictly in request order), times out
//! requests the display never answers, and optionally redials after a lost
//! connection.
//!
//! [`DisplayClient`] is a cloneable handle to that task:
//!
//! - Catalog parameters read and write by dotted key (`get`, `set`,
//!   `set_option`)
//! - Power, identity, diagnosis, and settings-save commands have dedicated
//!   methods
//! - Lifecycle and stream-hygiene events emit through a [`SessionEvent`]
//!   stream
//!
//! # Example
//!
//! ```rust,no_run
//! use lfd_client::{DisplayClient, MonitorId, SessionConfig};
//!
//! # async fn run() -> Result<(), lfd_client::ClientError> {
//! let (client, _events) = DisplayClient::connect(
//!     "192.168.0.10:7142",
//!     MonitorId::Single(1),
//!     SessionConfig::default(),
//! );
//!
//! let brightness = client.get("picture.brightness").await?;
//! println!("brightness: {}/{}", brightness.value, brightness.max_value);
//!
//! client.set("picture.brightness", 80).await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod queue;
pub mod session;

pub use client::DisplayClient;
pub use error::ClientError;
pub use events::SessionEvent;
pub use session::{run_session, run_tcp_session, SessionCommand, SessionConfig, SessionExit};

// Protocol types callers handle directly
pub use lfd_protocol::{MonitorId, ParameterReply, PowerMode, Reply, ReplyId, DEFAULT_PORT};
