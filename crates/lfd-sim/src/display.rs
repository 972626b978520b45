//! Virtual display device
//!
//! An in-memory stand-in for a real display: a parameter store seeded from
//! the command catalog, a power state, identity strings, and a request
//! parser wired to the same frame codec the client uses. Raw request bytes
//! go in through [`VirtualDisplay::handle_chunk`]; encoded reply frames
//! queue up for [`VirtualDisplay::take_output`]. Nothing here touches a
//! socket, which keeps protocol behavior testable without a runtime.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lfd_protocol::catalog::{self, CommandKind, CommandSpec};
use lfd_protocol::command::{MessageType, OperationType, PowerMode, Request};
use lfd_protocol::error::CommandError;
use lfd_protocol::frame;
use lfd_protocol::monitor::MonitorId;
use lfd_protocol::{Direction, FrameAssembler};

/// Identity and initial state for a virtual display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualDisplayConfig {
    /// Monitor number, 1 through 100
    pub id: u8,
    /// Model name reported to identity queries
    pub model: String,
    /// Serial number reported to identity queries
    pub serial: String,
    /// Initial power state
    pub power: PowerMode,
}

impl Default for VirtualDisplayConfig {
    fn default() -> Self {
        Self {
            id: 1,
            model: "P404".to_string(),
            serial: "S1X40123".to_string(),
            power: PowerMode::On,
        }
    }
}

/// A simulated display that answers control protocol requests.
#[derive(Debug)]
pub struct VirtualDisplay {
    id: MonitorId,
    model: String,
    serial: String,
    power: PowerMode,
    /// Self-diagnosis status byte; zero reports no fault
    diagnosis: u8,
    /// Current value of every addressable parameter
    parameters: HashMap<(u8, u8), u16>,
    /// Request frames reassemble here before parsing
    assembler: FrameAssembler,
    /// Encoded reply frames waiting to be read
    pending_output: VecDeque<Vec<u8>>,
}

impl VirtualDisplay {
    /// Create a display with every catalog parameter at its initial value.
    pub fn new(config: VirtualDisplayConfig) -> Self {
        let mut parameters = HashMap::new();
        for spec in catalog::all() {
            parameters.insert((spec.page, spec.code), initial_value(spec));
        }
        Self {
            id: MonitorId::Single(config.id),
            model: config.model,
            serial: config.serial,
            power: config.power,
            diagnosis: 0,
            parameters,
            assembler: FrameAssembler::new(Direction::Request),
            pending_output: VecDeque::new(),
        }
    }

    /// Identity this display answers as.
    pub fn id(&self) -> MonitorId {
        self.id
    }

    /// Current power state.
    pub fn power(&self) -> PowerMode {
        self.power
    }

    /// Force the power state without a request.
    pub fn set_power(&mut self, mode: PowerMode) {
        self.power = mode;
    }

    /// Report `status` from now on when self-diagnosis is queried.
    pub fn set_diagnosis(&mut self, status: u8) {
        self.diagnosis = status;
    }

    /// Current value of a parameter, by catalog key.
    pub fn parameter(&self, key: &str) -> Option<u16> {
        let spec = catalog::find_by_key(key).ok()?;
        self.parameters.get(&(spec.page, spec.code)).copied()
    }

    /// Seed a parameter value directly, bypassing request handling.
    pub fn set_parameter(&mut self, key: &str, value: u16) -> Result<(), CommandError> {
        let spec = catalog::find_by_key(key)?;
        self.parameters.insert((spec.page, spec.code), value);
        Ok(())
    }

    /// Feed raw bytes received from a controller.
    pub fn handle_chunk(&mut self, data: &[u8]) {
        self.assembler.push_chunk(data);
        while let Some(frame_bytes) = self.assembler.next_frame() {
            match frame::parse_request(&frame_bytes) {
                Ok(request) => self.handle_request(request),
                Err(e) => warn!(error = %e, "virtual display dropping unparseable request"),
            }
        }
    }

    /// Take the next queued reply frame, oldest first.
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.pending_output.pop_front()
    }

    /// Whether reply frames are waiting.
    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }

    /// Number of reply frames waiting.
    pub fn output_count(&self) -> usize {
        self.pending_output.len()
    }

    /// Drop all queued reply frames.
    pub fn clear_output(&mut self) {
        self.pending_output.clear();
    }

    fn addressed_to_me(&self, destination: MonitorId) -> bool {
        destination == MonitorId::All || destination == self.id
    }

    fn queue(&mut self, built: Result<Vec<u8>, CommandError>) {
        match built {
            Ok(frame_bytes) => self.pending_output.push_back(frame_bytes),
            Err(e) => warn!(error = %e, "virtual display could not build a reply"),
        }
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Get {
                destination,
                page,
                code,
            } => {
                if self.addressed_to_me(destination) {
                    self.answer_parameter(MessageType::GetReply, page, code, None);
                }
            }
            Request::Set {
                destination,
                page,
                code,
                value,
            } => {
                if self.addressed_to_me(destination) {
                    self.answer_parameter(MessageType::SetReply, page, code, Some(value));
                }
            }
            Request::Command {
                destination,
                opcodes,
            } => {
                if self.addressed_to_me(destination) {
                    self.handle_command(&opcodes);
                }
            }
        }
    }

    fn answer_parameter(
        &mut self,
        message_type: MessageType,
        page: u8,
        code: u8,
        set_value: Option<u16>,
    ) {
        let candidates = catalog::candidates(page, code);
        let spec = match pick_spec(candidates, set_value) {
            Some(spec) => spec,
            None => {
                debug!(page, code, "request for a parameter this display lacks");
                self.queue(frame::build_unsupported_reply(self.id, message_type, page, code));
                return;
            }
        };
        let operation = if spec.momentary_value().is_some() {
            OperationType::Momentary
        } else {
            OperationType::Set
        };
        let value = match set_value {
            Some(requested) => {
                if spec.readonly || !accepts(spec, requested) {
                    self.queue(frame::build_unsupported_reply(
                        self.id,
                        message_type,
                        page,
                        code,
                    ));
                    return;
                }
                match spec.momentary_value() {
                    // Actions fire without storing state; the echo carries
                    // the fixed value that identifies them.
                    Some(fixed) => fixed,
                    None => {
                        self.parameters.insert((page, code), requested);
                        requested
                    }
                }
            }
            None => self.parameters.get(&(page, code)).copied().unwrap_or(0),
        };
        self.queue(frame::build_parameter_reply(
            self.id,
            message_type,
            page,
            code,
            operation,
            reported_max(spec),
            value,
        ));
    }

    fn handle_command(&mut self, ops: &[u8]) {
        match ops {
            [0x01, 0xD6] => {
                self.queue(frame::build_power_status_reply(self.id, self.power));
            }
            [0xC2, 0x03, 0xD6, hi, lo] => {
                let code = u16::from_be_bytes([*hi, *lo]);
                match PowerMode::from_code(code) {
                    Ok(mode) => {
                        self.power = mode;
                        self.queue(frame::build_power_set_reply(self.id, mode));
                    }
                    Err(e) => warn!(error = %e, "virtual display ignoring power request"),
                }
            }
            [0xC2, 0x16] => {
                let reply = frame::build_text_reply(self.id, 0x16, &self.serial, 16);
                self.queue(reply);
            }
            [0xC2, 0x17] => {
                let reply = frame::build_text_reply(self.id, 0x17, &self.model, 8);
                self.queue(reply);
            }
            [0x0C] => {
                self.queue(frame::build_save_settings_reply(self.id));
            }
            [0xB1] => {
                self.queue(frame::build_self_diagnosis_reply(self.id, self.diagnosis));
            }
            other => {
                warn!(opcodes = ?other, "virtual display ignoring unknown command");
            }
        }
    }
}

/// Choose the catalog entry a (page, code) request refers to. A written
/// value disambiguates addresses shared by several momentary actions.
fn pick_spec(
    candidates: &'static [&'static CommandSpec],
    set_value: Option<u16>,
) -> Option<&'static CommandSpec> {
    match candidates {
        [] => None,
        [only] => Some(only),
        several => set_value
            .and_then(|v| several.iter().find(|s| s.momentary_value() == Some(v)))
            .copied()
            .or(Some(several[0])),
    }
}

fn accepts(spec: &CommandSpec, value: u16) -> bool {
    match spec.kind {
        CommandKind::Range { min, max } => (min..=max).contains(&value),
        _ => true,
    }
}

fn initial_value(spec: &CommandSpec) -> u16 {
    match spec.kind {
        CommandKind::Range { min, .. } => min,
        CommandKind::Option { options } => options.first().map(|(_, code)| *code).unwrap_or(0),
        CommandKind::Momentary { value } => value,
        CommandKind::Toggle => 0,
    }
}

fn reported_max(spec: &CommandSpec) -> u16 {
    match spec.kind {
        CommandKind::Range { max, .. } => max,
        CommandKind::Option { options } => {
            options.iter().map(|(_, code)| *code).max().unwrap_or(0)
        }
        CommandKind::Momentary { value } => value,
        CommandKind::Toggle => 1,
    }
}
