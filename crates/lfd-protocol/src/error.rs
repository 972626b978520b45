//! Protocol error types

use thiserror::Error;

use crate::command::MessageType;

/// Errors that can occur while decoding received frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// More bytes are required before the input can be decoded.
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete {
        /// Number of additional bytes needed
        needed: usize,
    },

    /// The data does not form a valid frame.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The frame checksum does not match its contents.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received frame
        expected: u8,
        /// Checksum byte the frame carried
        actual: u8,
    },

    /// The message type byte is not one the protocol defines.
    #[error("unknown message type 0x{0:02X}")]
    UnknownType(u8),

    /// The message type is valid but not decodable in this direction.
    #[error("unsupported message type {0:?}")]
    UnsupportedType(MessageType),

    /// The declared body length disagrees with the bytes received.
    #[error("length mismatch: header declares {declared} body bytes, frame carries {actual}")]
    LengthMismatch {
        /// Body length from the frame header
        declared: usize,
        /// Body length actually present
        actual: usize,
    },

    /// A character outside `[0-9A-Fa-f]` appeared where a hex digit belongs.
    #[error("invalid hex digit 0x{0:02X}")]
    InvalidHexDigit(u8),

    /// The display answered with a non-zero result code.
    #[error("display rejected the operation as unsupported")]
    UnsupportedOperation,

    /// The operation type field is neither set nor momentary.
    #[error("unknown operation type 0x{0:02X}")]
    UnknownOperationType(u8),

    /// A command reply carried an opcode the client does not understand.
    #[error("unknown command reply: group 0x{group:02X}, opcode 0x{opcode:02X}")]
    UnknownCommand {
        /// First logical byte of the reply body
        group: u8,
        /// Second logical byte of the reply body
        opcode: u8,
    },

    /// A reply referenced a (page, code) address missing from the catalog.
    #[error("no catalog entry for page 0x{page:02X}, code 0x{code:02X}")]
    UnknownParameter {
        /// Device page
        page: u8,
        /// Operation code within the page
        code: u8,
    },

    /// Several catalog entries share the address and none could be singled out.
    #[error("ambiguous catalog address: page 0x{page:02X}, code 0x{code:02X}")]
    AmbiguousParameter {
        /// Device page
        page: u8,
        /// Operation code within the page
        code: u8,
    },

    /// A power state field held a value outside the four defined modes.
    #[error("unknown power mode {0}")]
    UnknownPowerMode(u16),
}

/// Errors that can occur while building requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The key does not name any catalog entry.
    #[error("unknown command key: {0}")]
    UnknownKey(String),

    /// The parameter can be read but not written.
    #[error("{0} is read-only")]
    ReadOnly(&'static str),

    /// The value falls outside the parameter's range.
    #[error("{key}: value {value} outside range {min}..={max}")]
    ValueOutOfRange {
        /// Catalog key being written
        key: &'static str,
        /// Rejected value
        value: u16,
        /// Lowest accepted value
        min: u16,
        /// Highest accepted value
        max: u16,
    },

    /// The value is not one of the parameter's defined options.
    #[error("{key}: {value} is not a defined option")]
    InvalidOption {
        /// Catalog key being written
        key: &'static str,
        /// Rejected value
        value: u16,
    },

    /// No option with the given name exists for the parameter.
    #[error("{key}: no option named {name:?}")]
    UnknownOptionName {
        /// Catalog key being written
        key: &'static str,
        /// Rejected option name
        name: String,
    },

    /// The monitor id string could not be understood.
    #[error("invalid monitor id: {0}")]
    InvalidMonitorId(String),

    /// The body would overflow the one-byte length field.
    #[error("body length {0} exceeds the maximum of 255")]
    BodyTooLong(usize),
}
