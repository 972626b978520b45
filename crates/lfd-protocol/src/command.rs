//! Message and command definitions
//!
//! The protocol splits traffic into three request flavors. Get and Set
//! address one catalog parameter by its (page, code) pair. Command carries a
//! free-form run of logical opcode bytes and covers everything else the
//! displays can do: identity strings, power control, diagnostics. Each
//! flavor has a paired reply type, and every reply decodes into [`Reply`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::monitor::MonitorId;

/// Message type byte carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MessageType {
    /// Free-form opcode command
    Command,
    /// Reply to a command
    CommandReply,
    /// Parameter read
    Get,
    /// Reply to a parameter read
    GetReply,
    /// Parameter write
    Set,
    /// Reply to a parameter write
    SetReply,
}

impl MessageType {
    /// Wire value of this message type.
    pub fn to_wire(self) -> u8 {
        match self {
            MessageType::Command => 0x41,
            MessageType::CommandReply => 0x42,
            MessageType::Get => 0x43,
            MessageType::GetReply => 0x44,
            MessageType::Set => 0x45,
            MessageType::SetReply => 0x46,
        }
    }

    /// Decode a message type byte.
    pub fn from_wire(byte: u8) -> Result<Self, ParseError> {
        match byte {
            0x41 => Ok(MessageType::Command),
            0x42 => Ok(MessageType::CommandReply),
            0x43 => Ok(MessageType::Get),
            0x44 => Ok(MessageType::GetReply),
            0x45 => Ok(MessageType::Set),
            0x46 => Ok(MessageType::SetReply),
            other => Err(ParseError::UnknownType(other)),
        }
    }
}

/// How a display classified the parameter it just answered about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperationType {
    /// The value persists until changed
    Set,
    /// The value fires an action and does not persist
    Momentary,
}

impl OperationType {
    /// Wire value of this operation type.
    pub fn to_wire(self) -> u8 {
        match self {
            OperationType::Set => 0x00,
            OperationType::Momentary => 0x01,
        }
    }

    /// Decode an operation type field.
    pub fn from_wire(byte: u8) -> Result<Self, ParseError> {
        match byte {
            0x00 => Ok(OperationType::Set),
            0x01 => Ok(OperationType::Momentary),
            other => Err(ParseError::UnknownOperationType(other)),
        }
    }
}

/// Power state of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PowerMode {
    /// Panel lit, fully operational
    On,
    /// Panel dark, controller listening
    Standby,
    /// Low-power state between standby and off
    Suspend,
    /// Powered down
    Off,
}

impl PowerMode {
    /// Numeric state as it appears in power frames.
    pub fn code(self) -> u16 {
        match self {
            PowerMode::On => 1,
            PowerMode::Standby => 2,
            PowerMode::Suspend => 3,
            PowerMode::Off => 4,
        }
    }

    /// Decode a power state field.
    pub fn from_code(code: u16) -> Result<Self, ParseError> {
        match code {
            1 => Ok(PowerMode::On),
            2 => Ok(PowerMode::Standby),
            3 => Ok(PowerMode::Suspend),
            4 => Ok(PowerMode::Off),
            other => Err(ParseError::UnknownPowerMode(other)),
        }
    }
}

impl std::fmt::Display for PowerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PowerMode::On => "on",
            PowerMode::Standby => "standby",
            PowerMode::Suspend => "suspend",
            PowerMode::Off => "off",
        };
        write!(f, "{name}")
    }
}

/// Logical opcode sequences for the command message flavor.
pub mod opcodes {
    /// Serial number query
    pub const GET_SERIAL: &[u8] = &[0xC2, 0x16];
    /// Model name query
    pub const GET_MODEL: &[u8] = &[0xC2, 0x17];
    /// Power status query
    pub const GET_POWER: &[u8] = &[0x01, 0xD6];
    /// Power state change; followed by the state as two logical bytes
    pub const SET_POWER: &[u8] = &[0xC2, 0x03, 0xD6];
    /// Commit current settings to non-volatile memory
    pub const SAVE_SETTINGS: &[u8] = &[0x0C];
    /// Self-diagnosis status query
    pub const SELF_DIAGNOSIS: &[u8] = &[0xB1];
}

/// A decoded request frame, as a display sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Parameter read
    Get {
        /// Addressed destination
        destination: MonitorId,
        /// Device page
        page: u8,
        /// Operation code within the page
        code: u8,
    },
    /// Parameter write
    Set {
        /// Addressed destination
        destination: MonitorId,
        /// Device page
        page: u8,
        /// Operation code within the page
        code: u8,
        /// Requested value
        value: u16,
    },
    /// Free-form opcode command
    Command {
        /// Addressed destination
        destination: MonitorId,
        /// Logical opcode bytes between STX and ETX
        opcodes: Vec<u8>,
    },
}

/// A decoded Get or Set reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterReply {
    /// Catalog key the (page, code) address resolved to
    pub key: &'static str,
    /// Device page
    pub page: u8,
    /// Operation code within the page
    pub code: u8,
    /// How the display classified the parameter
    pub operation: OperationType,
    /// Highest value the display accepts for it
    pub max_value: u16,
    /// Current value
    pub value: u16,
}

/// Every reply the client can decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Get or Set reply for a catalog parameter
    Parameter(ParameterReply),
    /// Answer to a power status query
    PowerStatus(PowerMode),
    /// Echo of a power state change
    PowerSet(PowerMode),
    /// Serial number string
    Serial(String),
    /// Model name string
    Model(String),
    /// Acknowledgement of a settings save
    SaveSettings,
    /// Self-diagnosis status byte; zero means no fault
    SelfDiagnosis(u8),
}

/// Reply classification used to match replies to outstanding requests.
///
/// The wire protocol has no correlation ids, so a reply is attributed to the
/// oldest in-flight request. Comparing the reply's id against the id the
/// request expects catches a device that answers out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyId {
    /// Parameter reply for this (page, code) address
    Parameter {
        /// Device page
        page: u8,
        /// Operation code within the page
        code: u8,
    },
    /// Power status answer
    PowerStatus,
    /// Power change echo
    PowerSet,
    /// Serial number string
    Serial,
    /// Model name string
    Model,
    /// Settings save acknowledgement
    SaveSettings,
    /// Self-diagnosis status
    SelfDiagnosis,
}

impl Reply {
    /// Classification of this reply for request matching.
    pub fn id(&self) -> ReplyId {
        match self {
            Reply::Parameter(p) => ReplyId::Parameter {
                page: p.page,
                code: p.code,
            },
            Reply::PowerStatus(_) => ReplyId::PowerStatus,
            Reply::PowerSet(_) => ReplyId::PowerSet,
            Reply::Serial(_) => ReplyId::Serial,
            Reply::Model(_) => ReplyId::Model,
            Reply::SaveSettings => ReplyId::SaveSettings,
            Reply::SelfDiagnosis(_) => ReplyId::SelfDiagnosis,
        }
    }
}
