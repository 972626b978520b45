//! Frame building and parsing
//!
//! Every message travels in the same envelope:
//!
//! ```text
//! +-----+------+------+------+------+------+------+----------+-----+-----+
//! | SOH | 0x30 | dst  | 0x30 | type | len1 | len2 | body ... | chk | CR  |
//! +-----+------+------+------+------+------+------+----------+-----+-----+
//! ```
//!
//! The body runs from STX to ETX inclusive and its raw byte count is
//! declared by the two hex length characters. The checksum is the XOR of
//! every byte between SOH and the checksum position.
//!
//! Direction matters: requests carry the destination id in byte 2 with
//! `0x30` (the controller's address) in byte 3, while replies put `0x30` in
//! byte 2 and the answering display's id in byte 3. The two layouts are
//! distinguishable from the first four bytes, which is how partial reads
//! are told apart from frame boundaries.

use crate::catalog;
use crate::command::{
    opcodes, MessageType, OperationType, ParameterReply, PowerMode, Reply, Request,
};
use crate::error::{CommandError, ParseError};
use crate::hex;
use crate::monitor::MonitorId;

/// Start-of-header byte opening every frame.
pub const SOH: u8 = 0x01;
/// Start-of-text byte opening every body.
pub const STX: u8 = 0x02;
/// End-of-text byte closing every body.
pub const ETX: u8 = 0x03;
/// Carriage return terminating every frame.
pub const TERMINATOR: u8 = 0x0D;
/// The controller's own address byte.
const RESERVED: u8 = 0x30;
/// Raw bytes before the body: SOH through the two length characters.
pub const HEADER_LEN: usize = 7;
/// Raw bytes the envelope adds around a body.
pub const FRAME_OVERHEAD: usize = 9;
/// Largest raw body the one-byte length field can declare.
pub const MAX_BODY_LEN: usize = 0xFF;
/// TCP port displays listen on for external control.
pub const DEFAULT_PORT: u16 = 7142;

/// Raw byte count of a Get or Set reply body.
const PARAMETER_REPLY_BODY_LEN: usize = 18;

/// XOR of all bytes in `data`.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Frame length information read from an envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type byte
    pub message_type: MessageType,
    /// Declared raw body length, STX through ETX
    pub body_len: usize,
}

impl FrameHeader {
    /// Total raw frame length implied by the declared body length.
    pub fn total_len(&self) -> usize {
        self.body_len + FRAME_OVERHEAD
    }
}

/// Try to read a reply header from the start of `data`.
///
/// Returns [`ParseError::Incomplete`] while `data` is still a plausible
/// frame prefix, and a hard error as soon as any present byte rules one
/// out.
pub fn peek_reply_header(data: &[u8]) -> Result<FrameHeader, ParseError> {
    peek_header(data, 2)
}

/// Try to read a request header from the start of `data` (the device side).
pub fn peek_request_header(data: &[u8]) -> Result<FrameHeader, ParseError> {
    peek_header(data, 3)
}

fn peek_header(data: &[u8], reserved_at: usize) -> Result<FrameHeader, ParseError> {
    // Validate whatever is present before asking for more, so short garbage
    // is rejected instead of buffered as a frame start.
    for (idx, expected) in [(0, SOH), (1, RESERVED), (reserved_at, RESERVED)] {
        match data.get(idx) {
            Some(&b) if b == expected => {}
            Some(&b) => {
                return Err(ParseError::InvalidFrame(format!(
                    "expected 0x{expected:02X} at byte {idx}, got 0x{b:02X}"
                )));
            }
            None => {}
        }
    }
    if let Some(&ty) = data.get(4) {
        MessageType::from_wire(ty)?;
    }
    if data.len() < HEADER_LEN {
        return Err(ParseError::Incomplete {
            needed: HEADER_LEN - data.len(),
        });
    }
    let message_type = MessageType::from_wire(data[4])?;
    let body_len = hex::decode_byte(data, 5)? as usize;
    Ok(FrameHeader {
        message_type,
        body_len,
    })
}

fn wrap_inner(
    prefix: [u8; 4],
    message_type: MessageType,
    body: &[u8],
) -> Result<Vec<u8>, CommandError> {
    if body.len() > MAX_BODY_LEN {
        return Err(CommandError::BodyTooLong(body.len()));
    }
    let mut frame = Vec::with_capacity(body.len() + FRAME_OVERHEAD);
    frame.extend_from_slice(&prefix);
    frame.push(message_type.to_wire());
    frame.extend_from_slice(&hex::encode_byte(body.len() as u8));
    frame.extend_from_slice(body);
    let check = checksum(&frame[1..]);
    frame.push(check);
    frame.push(TERMINATOR);
    Ok(frame)
}

/// Wrap a body in a request envelope addressed to `destination`.
pub fn wrap(
    destination: MonitorId,
    message_type: MessageType,
    body: &[u8],
) -> Result<Vec<u8>, CommandError> {
    let dst = destination.to_wire()?;
    wrap_inner([SOH, RESERVED, dst, RESERVED], message_type, body)
}

/// Wrap a body in a reply envelope answering as `source` (the device side).
pub fn wrap_reply(
    source: MonitorId,
    message_type: MessageType,
    body: &[u8],
) -> Result<Vec<u8>, CommandError> {
    let src = source.to_wire()?;
    wrap_inner([SOH, RESERVED, RESERVED, src], message_type, body)
}

/// Build a parameter read request.
pub fn build_get(destination: MonitorId, page: u8, code: u8) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(6);
    body.push(STX);
    body.extend_from_slice(&hex::encode_byte(page));
    body.extend_from_slice(&hex::encode_byte(code));
    body.push(ETX);
    wrap(destination, MessageType::Get, &body)
}

/// Build a parameter write request.
pub fn build_set(
    destination: MonitorId,
    page: u8,
    code: u8,
    value: u16,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(10);
    body.push(STX);
    body.extend_from_slice(&hex::encode_byte(page));
    body.extend_from_slice(&hex::encode_byte(code));
    body.extend_from_slice(&hex::encode_u16(value));
    body.push(ETX);
    wrap(destination, MessageType::Set, &body)
}

/// Build a free-form command request from logical opcode bytes.
pub fn build_command(destination: MonitorId, ops: &[u8]) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(2 + ops.len() * 2);
    body.push(STX);
    for op in ops {
        body.extend_from_slice(&hex::encode_byte(*op));
    }
    body.push(ETX);
    wrap(destination, MessageType::Command, &body)
}

/// Build a serial number query.
pub fn build_get_serial(destination: MonitorId) -> Result<Vec<u8>, CommandError> {
    build_command(destination, opcodes::GET_SERIAL)
}

/// Build a model name query.
pub fn build_get_model(destination: MonitorId) -> Result<Vec<u8>, CommandError> {
    build_command(destination, opcodes::GET_MODEL)
}

/// Build a power status query.
pub fn build_get_power(destination: MonitorId) -> Result<Vec<u8>, CommandError> {
    build_command(destination, opcodes::GET_POWER)
}

/// Build a power state change.
pub fn build_set_power(
    destination: MonitorId,
    mode: PowerMode,
) -> Result<Vec<u8>, CommandError> {
    let mut ops = Vec::with_capacity(opcodes::SET_POWER.len() + 2);
    ops.extend_from_slice(opcodes::SET_POWER);
    ops.extend_from_slice(&mode.code().to_be_bytes());
    build_command(destination, &ops)
}

/// Build a request committing current settings to non-volatile memory.
pub fn build_save_settings(destination: MonitorId) -> Result<Vec<u8>, CommandError> {
    build_command(destination, opcodes::SAVE_SETTINGS)
}

/// Build a self-diagnosis status query.
pub fn build_self_diagnosis(destination: MonitorId) -> Result<Vec<u8>, CommandError> {
    build_command(destination, opcodes::SELF_DIAGNOSIS)
}

/// Validate the envelope of one complete frame and return its header.
fn check_frame(frame: &[u8], reserved_at: usize) -> Result<FrameHeader, ParseError> {
    let header = peek_header(frame, reserved_at)?;
    let total = header.total_len();
    if frame.len() < total {
        return Err(ParseError::Incomplete {
            needed: total - frame.len(),
        });
    }
    if frame.len() > total {
        return Err(ParseError::LengthMismatch {
            declared: header.body_len,
            actual: frame.len() - FRAME_OVERHEAD,
        });
    }
    let expected = checksum(&frame[1..frame.len() - 2]);
    let actual = frame[frame.len() - 2];
    if expected != actual {
        return Err(ParseError::ChecksumMismatch { expected, actual });
    }
    if frame[frame.len() - 1] != TERMINATOR {
        return Err(ParseError::InvalidFrame(format!(
            "frame ends with 0x{:02X} instead of CR",
            frame[frame.len() - 1]
        )));
    }
    Ok(header)
}

/// Parse one complete reply frame.
pub fn parse_reply(frame: &[u8]) -> Result<Reply, ParseError> {
    let header = check_frame(frame, 2)?;
    let body = &frame[HEADER_LEN..frame.len() - 2];
    match header.message_type {
        MessageType::GetReply | MessageType::SetReply => parse_parameter_reply(body),
        MessageType::CommandReply => parse_command_reply(body),
        other => Err(ParseError::UnsupportedType(other)),
    }
}

/// Source id of a complete reply frame.
pub fn reply_source(frame: &[u8]) -> Result<MonitorId, ParseError> {
    check_frame(frame, 2)?;
    MonitorId::from_wire(frame[3])
        .map_err(|_| ParseError::InvalidFrame(format!("bad source id 0x{:02X}", frame[3])))
}

/// Parse one complete request frame (the device side).
pub fn parse_request(frame: &[u8]) -> Result<Request, ParseError> {
    let header = check_frame(frame, 3)?;
    let destination = MonitorId::from_wire(frame[2])
        .map_err(|_| ParseError::InvalidFrame(format!("bad destination id 0x{:02X}", frame[2])))?;
    let body = &frame[HEADER_LEN..frame.len() - 2];
    check_body_markers(body)?;
    let chars = &body[1..body.len() - 1];
    match header.message_type {
        MessageType::Get => {
            if chars.len() != 4 {
                return Err(ParseError::InvalidFrame(format!(
                    "get body carries {} value characters, expected 4",
                    chars.len()
                )));
            }
            Ok(Request::Get {
                destination,
                page: hex::decode_byte(chars, 0)?,
                code: hex::decode_byte(chars, 2)?,
            })
        }
        MessageType::Set => {
            if chars.len() != 8 {
                return Err(ParseError::InvalidFrame(format!(
                    "set body carries {} value characters, expected 8",
                    chars.len()
                )));
            }
            Ok(Request::Set {
                destination,
                page: hex::decode_byte(chars, 0)?,
                code: hex::decode_byte(chars, 2)?,
                value: hex::decode_u16(chars, 4)?,
            })
        }
        MessageType::Command => {
            if chars.len() % 2 != 0 {
                return Err(ParseError::InvalidFrame(format!(
                    "command body carries {} value characters, expected an even count",
                    chars.len()
                )));
            }
            let mut ops = Vec::with_capacity(chars.len() / 2);
            for pair in chars.chunks_exact(2) {
                ops.push(hex::decode_pair(pair[0], pair[1])?);
            }
            Ok(Request::Command {
                destination,
                opcodes: ops,
            })
        }
        other => Err(ParseError::UnsupportedType(other)),
    }
}

fn expect_marker(body: &[u8], offset: usize, marker: u8) -> Result<(), ParseError> {
    match body.get(offset) {
        Some(&b) if b == marker => Ok(()),
        Some(&b) => Err(ParseError::InvalidFrame(format!(
            "expected 0x{marker:02X} at body byte {offset}, got 0x{b:02X}"
        ))),
        None => Err(ParseError::Incomplete {
            needed: offset + 1 - body.len(),
        }),
    }
}

fn check_body_markers(body: &[u8]) -> Result<(), ParseError> {
    expect_marker(body, 0, STX)?;
    if body.len() < 2 || body[body.len() - 1] != ETX {
        return Err(ParseError::InvalidFrame(
            "body missing its ETX terminator".into(),
        ));
    }
    Ok(())
}

fn parse_parameter_reply(body: &[u8]) -> Result<Reply, ParseError> {
    check_body_markers(body)?;
    if body.len() != PARAMETER_REPLY_BODY_LEN {
        return Err(ParseError::InvalidFrame(format!(
            "parameter reply body is {} bytes, expected {PARAMETER_REPLY_BODY_LEN}",
            body.len()
        )));
    }
    let result = hex::decode_byte(body, 1)?;
    if result != 0x00 {
        return Err(ParseError::UnsupportedOperation);
    }
    let page = hex::decode_byte(body, 3)?;
    let code = hex::decode_byte(body, 5)?;
    let operation = OperationType::from_wire(hex::decode_byte(body, 7)?)?;
    let max_value = hex::decode_u16(body, 9)?;
    let value = hex::decode_u16(body, 13)?;
    // The value doubles as the tie-breaker for addresses shared by several
    // momentary actions.
    let spec = catalog::find_by_address(page, code, Some(value))?;
    Ok(Reply::Parameter(ParameterReply {
        key: spec.key,
        page,
        code,
        operation,
        max_value,
        value,
    }))
}

fn parse_command_reply(body: &[u8]) -> Result<Reply, ParseError> {
    check_body_markers(body)?;
    let mut offset = 0;
    // Some firmware revisions open the body with an extra 0x02 pair.
    if hex::decode_byte(body, offset + 1)? == 0x02 {
        offset += 2;
    }
    let lead = hex::decode_byte(body, offset + 1)?;
    if lead == 0x01 {
        return Err(ParseError::UnsupportedOperation);
    }
    if lead == 0x00 {
        offset += 2;
    }
    let group = hex::decode_byte(body, offset + 1)?;
    match group {
        0x0C => Ok(Reply::SaveSettings),
        0xA1 => Ok(Reply::SelfDiagnosis(hex::decode_byte(body, offset + 3)?)),
        0xD6 => {
            let state = hex::decode_u16(body, offset + 9)?;
            Ok(Reply::PowerStatus(PowerMode::from_code(state)?))
        }
        0xC2 => {
            let opcode = hex::decode_byte(body, offset + 3)?;
            if opcode == 0x03 {
                let state = hex::decode_u16(body, offset + 7)?;
                Ok(Reply::PowerSet(PowerMode::from_code(state)?))
            } else {
                Err(ParseError::UnknownCommand { group, opcode })
            }
        }
        0xC3 => {
            let opcode = hex::decode_byte(body, offset + 3)?;
            match opcode {
                0x16 => Ok(Reply::Serial(decode_text(body, offset + 5)?)),
                0x17 => Ok(Reply::Model(decode_text(body, offset + 5)?)),
                _ => Err(ParseError::UnknownCommand { group, opcode }),
            }
        }
        _ => {
            let opcode = hex::decode_byte(body, offset + 3).unwrap_or_default();
            Err(ParseError::UnknownCommand { group, opcode })
        }
    }
}

/// Decode the character pairs from `start` up to the closing ETX into a
/// string, dropping NUL padding.
fn decode_text(body: &[u8], start: usize) -> Result<String, ParseError> {
    if start >= body.len() {
        return Err(ParseError::Incomplete {
            needed: start + 1 - body.len(),
        });
    }
    let chars = &body[start..body.len() - 1];
    let mut bytes = Vec::with_capacity(chars.len() / 2);
    for pair in chars.chunks_exact(2) {
        bytes.push(hex::decode_pair(pair[0], pair[1])?);
    }
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Build a Get or Set reply for a catalog parameter (the device side).
pub fn build_parameter_reply(
    source: MonitorId,
    message_type: MessageType,
    page: u8,
    code: u8,
    operation: OperationType,
    max_value: u16,
    value: u16,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(PARAMETER_REPLY_BODY_LEN);
    body.push(STX);
    body.extend_from_slice(b"00");
    body.extend_from_slice(&hex::encode_byte(page));
    body.extend_from_slice(&hex::encode_byte(code));
    body.extend_from_slice(&hex::encode_byte(operation.to_wire()));
    body.extend_from_slice(&hex::encode_u16(max_value));
    body.extend_from_slice(&hex::encode_u16(value));
    body.push(ETX);
    wrap_reply(source, message_type, &body)
}

/// Build a parameter reply whose result code marks the operation as
/// unsupported (the device side).
pub fn build_unsupported_reply(
    source: MonitorId,
    message_type: MessageType,
    page: u8,
    code: u8,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(PARAMETER_REPLY_BODY_LEN);
    body.push(STX);
    body.extend_from_slice(b"01");
    body.extend_from_slice(&hex::encode_byte(page));
    body.extend_from_slice(&hex::encode_byte(code));
    body.extend_from_slice(b"00");
    body.extend_from_slice(b"0000");
    body.extend_from_slice(b"0000");
    body.push(ETX);
    wrap_reply(source, message_type, &body)
}

/// Build a power status reply (the device side).
pub fn build_power_status_reply(
    source: MonitorId,
    mode: PowerMode,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(18);
    body.push(STX);
    body.extend_from_slice(b"0200D6000004");
    body.extend_from_slice(&hex::encode_u16(mode.code()));
    body.push(ETX);
    wrap_reply(source, MessageType::CommandReply, &body)
}

/// Build a power change echo (the device side).
pub fn build_power_set_reply(
    source: MonitorId,
    mode: PowerMode,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(14);
    body.push(STX);
    body.extend_from_slice(b"00C203D6");
    body.extend_from_slice(&hex::encode_u16(mode.code()));
    body.push(ETX);
    wrap_reply(source, MessageType::CommandReply, &body)
}

/// Build a serial or model string reply, NUL-padded to `width` characters
/// (the device side).
pub fn build_text_reply(
    source: MonitorId,
    opcode: u8,
    text: &str,
    width: usize,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(5 + width * 2 + 1);
    body.push(STX);
    body.extend_from_slice(&hex::encode_byte(0xC3));
    body.extend_from_slice(&hex::encode_byte(opcode));
    let bytes = text.as_bytes();
    for i in 0..width {
        let b = bytes.get(i).copied().unwrap_or(0);
        body.extend_from_slice(&hex::encode_byte(b));
    }
    body.push(ETX);
    wrap_reply(source, MessageType::CommandReply, &body)
}

/// Build a settings save acknowledgement (the device side).
pub fn build_save_settings_reply(source: MonitorId) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(4);
    body.push(STX);
    body.extend_from_slice(&hex::encode_byte(0x0C));
    body.push(ETX);
    wrap_reply(source, MessageType::CommandReply, &body)
}

/// Build a self-diagnosis status reply (the device side).
pub fn build_self_diagnosis_reply(
    source: MonitorId,
    status: u8,
) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::with_capacity(6);
    body.push(STX);
    body.extend_from_slice(&hex::encode_byte(0xA1));
    body.extend_from_slice(&hex::encode_byte(status));
    body.push(ETX);
    wrap_reply(source, MessageType::CommandReply, &body)
}
