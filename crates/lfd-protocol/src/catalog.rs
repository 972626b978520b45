//! Command catalog
//!
//! One static table describes every parameter and action the displays
//! expose: its dotted key, the (page, code) address it lives at, and the
//! values it accepts. Keys follow the on-screen menu hierarchy, so the
//! brightness slider is `PICTURE.BRIGHTNESS` and the zoom position is
//! `ADJUST.ZOOM_MODE.H_POSITION`. Lookups go both ways: requests resolve a
//! key to an address, replies resolve an address back to a key.
//!
//! Addresses are almost unique. The four menu reset actions share
//! `(0x02, 0xCB)` and are told apart by their fixed momentary value, which
//! the display echoes in its reply.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{CommandError, ParseError};

/// Value semantics of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Continuous value within inclusive bounds
    Range {
        /// Lowest accepted value
        min: u16,
        /// Highest accepted value
        max: u16,
    },
    /// One of a fixed set of named codes
    Option {
        /// Name and wire code of each choice
        options: &'static [(&'static str, u16)],
    },
    /// Action fired by writing a fixed value
    Momentary {
        /// The value the display expects and echoes
        value: u16,
    },
    /// Binary action accepting 0 or 1
    Toggle,
}

/// One parameter or action a display exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Dotted lookup key following the menu hierarchy
    pub key: &'static str,
    /// Device page
    pub page: u8,
    /// Operation code within the page
    pub code: u8,
    /// Value semantics
    pub kind: CommandKind,
    /// Whether writes are rejected client-side
    pub readonly: bool,
}

impl CommandSpec {
    /// Fixed value for momentary entries.
    pub fn momentary_value(&self) -> Option<u16> {
        match self.kind {
            CommandKind::Momentary { value } => Some(value),
            _ => None,
        }
    }

    /// Resolve an option name to its wire code (case-insensitive).
    pub fn option_code(&self, name: &str) -> Option<u16> {
        match self.kind {
            CommandKind::Option { options } => options
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, code)| *code),
            _ => None,
        }
    }

    /// Check a value against this entry's semantics, returning the value
    /// that should actually go on the wire.
    ///
    /// Momentary entries ignore the caller's value and substitute their
    /// fixed one.
    pub fn validate_set(&self, value: u16) -> Result<u16, CommandError> {
        if self.readonly {
            return Err(CommandError::ReadOnly(self.key));
        }
        match self.kind {
            CommandKind::Range { min, max } => {
                if (min..=max).contains(&value) {
                    Ok(value)
                } else {
                    Err(CommandError::ValueOutOfRange {
                        key: self.key,
                        value,
                        min,
                        max,
                    })
                }
            }
            CommandKind::Option { options } => {
                if options.iter().any(|(_, code)| *code == value) {
                    Ok(value)
                } else {
                    Err(CommandError::InvalidOption {
                        key: self.key,
                        value,
                    })
                }
            }
            CommandKind::Momentary { value: fixed } => Ok(fixed),
            CommandKind::Toggle => {
                if value <= 1 {
                    Ok(value)
                } else {
                    Err(CommandError::ValueOutOfRange {
                        key: self.key,
                        value,
                        min: 0,
                        max: 1,
                    })
                }
            }
        }
    }
}

const fn range(key: &'static str, page: u8, code: u8, min: u16, max: u16) -> CommandSpec {
    CommandSpec {
        key,
        page,
        code,
        kind: CommandKind::Range { min, max },
        readonly: false,
    }
}

const fn range_ro(key: &'static str, page: u8, code: u8, min: u16, max: u16) -> CommandSpec {
    CommandSpec {
        key,
        page,
        code,
        kind: CommandKind::Range { min, max },
        readonly: true,
    }
}

const fn options(
    key: &'static str,
    page: u8,
    code: u8,
    options: &'static [(&'static str, u16)],
) -> CommandSpec {
    CommandSpec {
        key,
        page,
        code,
        kind: CommandKind::Option { options },
        readonly: false,
    }
}

const fn momentary(key: &'static str, page: u8, code: u8, value: u16) -> CommandSpec {
    CommandSpec {
        key,
        page,
        code,
        kind: CommandKind::Momentary { value },
        readonly: false,
    }
}

const fn toggle(key: &'static str, page: u8, code: u8) -> CommandSpec {
    CommandSpec {
        key,
        page,
        code,
        kind: CommandKind::Toggle,
        readonly: false,
    }
}

const GAMMA: &[(&str, u16)] = &[
    ("NATIVE", 1),
    ("TWO_POINT_TWO", 4),
    ("TWO_POINT_FOUR", 8),
    ("S", 7),
    ("DICOM", 5),
    ("PROGRAMMABLE", 6),
];

const ADAPTIVE_CONTRAST: &[(&str, u16)] = &[
    ("NONE", 0),
    ("OFF", 1),
    ("LOW", 2),
    ("MIDDLE", 3),
    ("HIGH", 4),
];

const FILM_MODE: &[(&str, u16)] = &[("OFF", 1), ("AUTO", 2)];

const PICTURE_MODE: &[(&str, u16)] = &[
    ("SRGB", 1),
    ("HIBRIGHT", 3),
    ("STANDARD", 4),
    ("CINEMA", 5),
    ("ISF_DAY", 6),
    ("ISF_NIGHT", 7),
    ("AMBIENT1", 11),
    ("AMBIENT2", 12),
];

const INPUT_RESOLUTION: &[(&str, u16)] = &[
    ("AUTO", 1),
    ("1024x768", 2),
    ("1280x768", 3),
    ("1360x768", 4),
    ("1366x768", 5),
    ("1400x1050", 6),
    ("1680x1050", 7),
];

const BASE_ZOOM: &[(&str, u16)] = &[
    ("16_9", 3),
    ("14_9", 4),
    ("DYNAMIC", 5),
    ("OFF", 1),
    ("CUSTOM", 2),
];

const ASPECT: &[(&str, u16)] = &[
    ("NORMAL", 1),
    ("FULL", 2),
    ("WIDE", 3),
    ("ZOOM", 4),
    ("TRIM", 5),
];

const SURROUND: &[(&str, u16)] = &[("OFF", 1), ("LOW", 2), ("HIGH", 3)];

const AUDIO_INPUT: &[(&str, u16)] = &[
    ("AUDIO1", 1),
    ("AUDIO2", 2),
    ("AUDIO3", 3),
    ("HDMI", 4),
    ("OPTION", 6),
    ("DISPLAYPORT", 7),
];

/// Every command the client knows how to address.
pub static COMMANDS: &[CommandSpec] = &[
    // Picture menu
    range("PICTURE.BRIGHTNESS", 0x00, 0x10, 0, 100),
    range("PICTURE.CONTRAST", 0x00, 0x12, 0, 100),
    range("PICTURE.SHARPNESS", 0x00, 0x8C, 0, 82),
    range("PICTURE.BLACK_LEVEL", 0x00, 0x92, 0, 63),
    range("PICTURE.TINT", 0x00, 0x90, 0, 63),
    range("PICTURE.COLOR", 0x02, 0x1F, 0, 63),
    range("PICTURE.COLOR_TEMPERATURE", 0x00, 0x54, 0, 74),
    range("PICTURE.COLOR_CONTROL.RED", 0x00, 0x9B, 0, 100),
    range("PICTURE.COLOR_CONTROL.YELLOW", 0x00, 0x9C, 0, 100),
    range("PICTURE.COLOR_CONTROL.GREEN", 0x00, 0x9D, 0, 100),
    range("PICTURE.COLOR_CONTROL.CYAN", 0x00, 0x9E, 0, 100),
    range("PICTURE.COLOR_CONTROL.BLUE", 0x00, 0x9F, 0, 100),
    range("PICTURE.COLOR_CONTROL.MAGENTA", 0x00, 0xA0, 0, 100),
    range("PICTURE.COLOR_CONTROL.SATURATION", 0x00, 0x8A, 0, 10),
    options("PICTURE.GAMMA_SELECTION", 0x02, 0x68, GAMMA),
    options("PICTURE.MOVIE_SETTINGS.ADAPTIVE_CONTRAST", 0x02, 0x8D, ADAPTIVE_CONTRAST),
    range("PICTURE.MOVIE_SETTINGS.NOISE_REDUCTION", 0x02, 0x20, 0, 16),
    options("PICTURE.MOVIE_SETTINGS.FILM_MODE", 0x02, 0x23, FILM_MODE),
    options("PICTURE.PICTURE_MODE", 0x02, 0x1A, PICTURE_MODE),
    range("PICTURE.AMBIENT.AMBIENT_BRIGHTNESS_LOW", 0x10, 0x33, 0, 100),
    range("PICTURE.AMBIENT.AMBIENT_BRIGHTNESS_HIGH", 0x10, 0x34, 0, 100),
    range_ro("PICTURE.AMBIENT.CURRENT_ILLUMINANCE", 0x02, 0xB4, 0, 255),
    range_ro("PICTURE.AMBIENT.BRIGHT_SENSOR", 0x02, 0xB5, 0, 255),
    momentary("PICTURE.PICTURE_RESET", 0x02, 0xCB, 2),
    // Adjust menu
    momentary("ADJUST.AUTO_SETUP", 0x00, 0x1E, 1),
    range("ADJUST.H_POSITION", 0x00, 0x20, 0, 255),
    range("ADJUST.V_POSITION", 0x00, 0x30, 0, 255),
    range("ADJUST.CLOCK", 0x00, 0x0E, 0, 255),
    range("ADJUST.CLOCK_PHASE", 0x00, 0x3E, 0, 255),
    range("ADJUST.H_RESOLUTION", 0x02, 0x50, 0, 255),
    range("ADJUST.V_RESOLUTION", 0x02, 0x51, 0, 255),
    options("ADJUST.INPUT_RESOLUTION", 0x02, 0xDA, INPUT_RESOLUTION),
    options("ADJUST.ZOOM_MODE.BASE_ZOOM", 0x02, 0xCE, BASE_ZOOM),
    range("ADJUST.ZOOM_MODE.ZOOM", 0x02, 0x6F, 1, 201),
    range("ADJUST.ZOOM_MODE.H_EXPANSION", 0x02, 0x6C, 1, 201),
    range("ADJUST.ZOOM_MODE.V_EXPANSION", 0x02, 0x6D, 1, 201),
    range("ADJUST.ZOOM_MODE.H_POSITION", 0x02, 0xCC, 0, 255),
    range("ADJUST.ZOOM_MODE.V_POSITION", 0x02, 0xCD, 0, 255),
    options("ADJUST.ASPECT", 0x02, 0x70, ASPECT),
    momentary("ADJUST.ADJUST_RESET", 0x02, 0xCB, 3),
    // Audio menu
    range("AUDIO.BALANCE", 0x00, 0x93, 0, 100),
    range("AUDIO.TREBLE", 0x00, 0x8F, 0, 100),
    range("AUDIO.BASS", 0x00, 0x91, 0, 100),
    options("AUDIO.SURROUND", 0x02, 0x34, SURROUND),
    options("AUDIO.AUDIO_INPUT", 0x02, 0x2E, AUDIO_INPUT),
    momentary("AUDIO.AUDIO_RESET", 0x02, 0xCB, 4),
    // Schedule menu
    toggle("SCHEDULE.OFF", 0x02, 0x2B),
    toggle("SCHEDULE.ENABLE", 0x02, 0xE5),
    toggle("SCHEDULE.DISABLE", 0x02, 0xE6),
    momentary("SCHEDULE.SCHEDULE_RESET", 0x02, 0xCB, 5),
];

fn key_index() -> &'static HashMap<&'static str, &'static CommandSpec> {
    static INDEX: OnceLock<HashMap<&'static str, &'static CommandSpec>> = OnceLock::new();
    INDEX.get_or_init(|| COMMANDS.iter().map(|spec| (spec.key, spec)).collect())
}

fn address_index() -> &'static HashMap<(u8, u8), Vec<&'static CommandSpec>> {
    static INDEX: OnceLock<HashMap<(u8, u8), Vec<&'static CommandSpec>>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index: HashMap<(u8, u8), Vec<&'static CommandSpec>> = HashMap::new();
        for spec in COMMANDS {
            index.entry((spec.page, spec.code)).or_default().push(spec);
        }
        index
    })
}

/// Iterate every catalog entry.
pub fn all() -> impl Iterator<Item = &'static CommandSpec> {
    COMMANDS.iter()
}

/// Look up an entry by its dotted key. Matching ignores case and
/// surrounding whitespace.
pub fn find_by_key(key: &str) -> Result<&'static CommandSpec, CommandError> {
    let normalized = key.trim().to_ascii_uppercase();
    key_index()
        .get(normalized.as_str())
        .copied()
        .ok_or_else(|| CommandError::UnknownKey(key.to_string()))
}

/// All entries sharing a (page, code) address.
pub fn candidates(page: u8, code: u8) -> &'static [&'static CommandSpec] {
    address_index()
        .get(&(page, code))
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Resolve the (page, code) address of a reply back to its catalog entry.
///
/// `discriminant` is the reply's value field. When several entries share the
/// address it selects the momentary entry whose fixed value matches; with no
/// match the address stays ambiguous.
pub fn find_by_address(
    page: u8,
    code: u8,
    discriminant: Option<u16>,
) -> Result<&'static CommandSpec, ParseError> {
    match candidates(page, code) {
        [] => Err(ParseError::UnknownParameter { page, code }),
        [only] => Ok(only),
        several => discriminant
            .and_then(|v| several.iter().find(|s| s.momentary_value() == Some(v)))
            .copied()
            .ok_or(ParseError::AmbiguousParameter { page, code }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_resolve_case_insensitively() {
        let spec = find_by_key("PICTURE.BRIGHTNESS").unwrap();
        assert_eq!((spec.page, spec.code), (0x00, 0x10));
        assert_eq!(spec.kind, CommandKind::Range { min: 0, max: 100 });

        let lower = find_by_key(" picture.brightness ").unwrap();
        assert_eq!(lower.key, spec.key);
    }

    #[test]
    fn unknown_and_partial_keys_are_rejected() {
        assert!(matches!(
            find_by_key("PICTURE.DOES_NOT_EXIST"),
            Err(CommandError::UnknownKey(_))
        ));
        // A menu prefix is not itself a command.
        assert!(find_by_key("PICTURE").is_err());
        assert!(find_by_key("PICTURE.COLOR_CONTROL").is_err());
    }

    #[test]
    fn nested_keys_are_distinct_entries() {
        let top = find_by_key("ADJUST.H_POSITION").unwrap();
        let zoom = find_by_key("ADJUST.ZOOM_MODE.H_POSITION").unwrap();
        assert_eq!((top.page, top.code), (0x00, 0x20));
        assert_eq!((zoom.page, zoom.code), (0x02, 0xCC));
    }

    #[test]
    fn only_the_reset_address_is_shared() {
        let mut counts: HashMap<(u8, u8), usize> = HashMap::new();
        for spec in all() {
            *counts.entry((spec.page, spec.code)).or_default() += 1;
        }
        for ((page, code), count) in counts {
            if (page, code) == (0x02, 0xCB) {
                assert_eq!(count, 4);
            } else {
                assert_eq!(count, 1, "unexpected collision at ({page:#04X}, {code:#04X})");
            }
        }
    }

    #[test]
    fn shared_address_resolves_through_the_discriminant() {
        assert!(matches!(
            find_by_address(0x02, 0xCB, None),
            Err(ParseError::AmbiguousParameter { .. })
        ));
        assert_eq!(
            find_by_address(0x02, 0xCB, Some(2)).unwrap().key,
            "PICTURE.PICTURE_RESET"
        );
        assert_eq!(
            find_by_address(0x02, 0xCB, Some(5)).unwrap().key,
            "SCHEDULE.SCHEDULE_RESET"
        );
        assert!(matches!(
            find_by_address(0x02, 0xCB, Some(7)),
            Err(ParseError::AmbiguousParameter { .. })
        ));
    }

    #[test]
    fn unique_addresses_resolve_without_a_discriminant() {
        assert_eq!(
            find_by_address(0x00, 0x10, None).unwrap().key,
            "PICTURE.BRIGHTNESS"
        );
        assert_eq!(
            find_by_address(0x02, 0xDA, Some(3)).unwrap().key,
            "ADJUST.INPUT_RESOLUTION"
        );
        assert!(matches!(
            find_by_address(0x7F, 0x7F, None),
            Err(ParseError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn range_validation_clamps_nothing() {
        let spec = find_by_key("PICTURE.SHARPNESS").unwrap();
        assert_eq!(spec.validate_set(0).unwrap(), 0);
        assert_eq!(spec.validate_set(82).unwrap(), 82);
        assert!(matches!(
            spec.validate_set(83),
            Err(CommandError::ValueOutOfRange { max: 82, .. })
        ));

        let zoom = find_by_key("ADJUST.ZOOM_MODE.ZOOM").unwrap();
        assert!(matches!(
            zoom.validate_set(0),
            Err(CommandError::ValueOutOfRange { min: 1, .. })
        ));
    }

    #[test]
    fn option_validation_accepts_only_member_codes() {
        let spec = find_by_key("PICTURE.PICTURE_MODE").unwrap();
        assert_eq!(spec.validate_set(4).unwrap(), 4);
        assert_eq!(spec.validate_set(12).unwrap(), 12);
        // 2 sits inside the numeric span but is not a defined mode.
        assert!(matches!(
            spec.validate_set(2),
            Err(CommandError::InvalidOption { value: 2, .. })
        ));
    }

    #[test]
    fn momentary_entries_substitute_their_fixed_value() {
        let spec = find_by_key("PICTURE.PICTURE_RESET").unwrap();
        assert_eq!(spec.validate_set(0).unwrap(), 2);
        assert_eq!(spec.validate_set(999).unwrap(), 2);
        assert_eq!(spec.momentary_value(), Some(2));
    }

    #[test]
    fn toggles_accept_only_binary_values() {
        let spec = find_by_key("SCHEDULE.ENABLE").unwrap();
        assert_eq!(spec.validate_set(0).unwrap(), 0);
        assert_eq!(spec.validate_set(1).unwrap(), 1);
        assert!(spec.validate_set(2).is_err());
    }

    #[test]
    fn readonly_entries_reject_writes() {
        let spec = find_by_key("PICTURE.AMBIENT.CURRENT_ILLUMINANCE").unwrap();
        assert!(spec.readonly);
        assert!(matches!(
            spec.validate_set(10),
            Err(CommandError::ReadOnly("PICTURE.AMBIENT.CURRENT_ILLUMINANCE"))
        ));
    }

    #[test]
    fn option_names_resolve_to_codes() {
        let spec = find_by_key("PICTURE.GAMMA_SELECTION").unwrap();
        assert_eq!(spec.option_code("DICOM"), Some(5));
        assert_eq!(spec.option_code("dicom"), Some(5));
        assert_eq!(spec.option_code("GAMMA_3"), None);

        let brightness = find_by_key("PICTURE.BRIGHTNESS").unwrap();
        assert_eq!(brightness.option_code("DICOM"), None);
    }
}
