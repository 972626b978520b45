//! Monitor addressing
//!
//! Every request names a destination: one monitor, one lettered group, or
//! every display on the link. Monitors are numbered 1 through 100 and map
//! onto wire ids starting at `0x41`; groups A through J occupy `0x31`
//! through `0x3A`; the broadcast id is `0x2A` (`*`). The three ranges do
//! not overlap, so a wire id decodes unambiguously.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Wire id addressing every display on the link.
const BROADCAST_ID: u8 = 0x2A;

/// Destination or source of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MonitorId {
    /// Every display on the link
    All,
    /// One monitor, numbered 1 through 100
    Single(u8),
    /// A lettered group, A through J
    Group(char),
}

impl MonitorId {
    /// Wire id for this destination.
    pub fn to_wire(self) -> Result<u8, CommandError> {
        match self {
            MonitorId::All => Ok(BROADCAST_ID),
            MonitorId::Single(n) if (1..=100).contains(&n) => Ok(0x40 + n),
            MonitorId::Group(g) if g.is_ascii_uppercase() && g <= 'J' => Ok(g as u8 - 16),
            other => Err(CommandError::InvalidMonitorId(other.to_string())),
        }
    }

    /// Decode a wire id back into a destination.
    pub fn from_wire(id: u8) -> Result<Self, CommandError> {
        match id {
            BROADCAST_ID => Ok(MonitorId::All),
            0x41..=0xA4 => Ok(MonitorId::Single(id - 0x40)),
            0x31..=0x3A => Ok(MonitorId::Group((id + 16) as char)),
            other => Err(CommandError::InvalidMonitorId(format!("0x{other:02X}"))),
        }
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorId::All => write!(f, "ALL"),
            MonitorId::Single(n) => write!(f, "{n}"),
            MonitorId::Group(g) => write!(f, "{g}"),
        }
    }
}

impl FromStr for MonitorId {
    type Err = CommandError;

    /// Accepts `"ALL"` in any case, a monitor number 1-100, or a group
    /// letter A-J in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(MonitorId::All);
        }
        if let Ok(n) = s.parse::<u8>() {
            if (1..=100).contains(&n) {
                return Ok(MonitorId::Single(n));
            }
            return Err(CommandError::InvalidMonitorId(s.to_string()));
        }
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            let upper = c.to_ascii_uppercase();
            if upper.is_ascii_uppercase() && upper <= 'J' {
                return Ok(MonitorId::Group(upper));
            }
        }
        Err(CommandError::InvalidMonitorId(s.to_string()))
    }
}
