//! Virtual large format display.
//!
//! Stands in for real hardware when exercising the control protocol: the
//! same frames, the same replies, no display required. [`VirtualDisplay`]
//! is a pure in-memory device; [`run_display_task`] pumps one over any
//! async byte stream.
//!
//! # Example
//!
//! ```rust
//! use lfd_protocol::command::Reply;
//! use lfd_protocol::frame;
//! use lfd_protocol::monitor::MonitorId;
//! use lfd_sim::{VirtualDisplay, VirtualDisplayConfig};
//!
//! let mut display = VirtualDisplay::new(VirtualDisplayConfig::default());
//! display.set_parameter("PICTURE.BRIGHTNESS", 50).unwrap();
//!
//! display.handle_chunk(&frame::build_get(MonitorId::All, 0x00, 0x10).unwrap());
//! match frame::parse_reply(&display.take_output().unwrap()).unwrap() {
//!     Reply::Parameter(p) => assert_eq!(p.value, 50),
//!     other => panic!("unexpected reply: {other:?}"),
//! }
//! ```

pub mod display;
pub mod display_task;

pub use display::{VirtualDisplay, VirtualDisplayConfig};
pub use display_task::{run_display_task, DisplayTaskCommand};
