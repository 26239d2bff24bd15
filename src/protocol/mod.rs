//! Wire vocabulary shared by the decoder, the mirror and the reconciler.

use serde::{Serialize, Serializer};
use std::{convert::Infallible, fmt, ops::RangeInclusive, str::FromStr};

mod codec;

pub use codec::{decode, encode};

/// One of the three lamps on the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
    Green,
}

impl Color {
    /// Flush order used by batch apply.
    pub const ALL: [Color; 3] = [Color::Red, Color::Yellow, Color::Green];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Yellow => "YELLOW",
            Color::Green => "GREEN",
        }
    }

    /// Accepted duration range in milliseconds.
    pub fn range(&self) -> RangeInclusive<u32> {
        match self {
            Color::Red | Color::Green => 500..=5_000,
            Color::Yellow => 100..=2_000,
        }
    }

    pub fn default_duration_ms(&self) -> u32 {
        match self {
            Color::Red | Color::Green => 2_000,
            Color::Yellow => 500,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(Color::Red),
            "yellow" | "y" => Ok(Color::Yellow),
            "green" | "g" => Ok(Color::Green),
            other => Err(format!("unknown color '{other}' (expected red, yellow or green)")),
        }
    }
}

/// Operating mode reported by (or requested from) the controller.
///
/// Only the four named modes drive the lamp view; any other text the device
/// sends is preserved verbatim in [`Mode::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Emergency,
    Blinking,
    Off,
    Other(String),
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Emergency => "EMERGENCY",
            Mode::Blinking => "BLINKING",
            Mode::Off => "OFF",
            Mode::Other(text) => text,
        }
    }

    /// The same mode with any CR or LF removed from its text.
    pub fn single_line(&self) -> Mode {
        match self {
            Mode::Other(text) if text.contains(['\r', '\n']) => {
                Mode::from(text.replace(['\r', '\n'], "").as_str())
            }
            other => other.clone(),
        }
    }
}

impl From<&str> for Mode {
    fn from(text: &str) -> Self {
        match text {
            "NORMAL" => Mode::Normal,
            "EMERGENCY" => Mode::Emergency,
            "BLINKING" => Mode::Blinking,
            "OFF" => Mode::Off,
            other => Mode::Other(other.to_string()),
        }
    }
}

impl FromStr for Mode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Mode::from(s))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// On/off state of each lamp. The fields are independent; nothing here
/// enforces a single lit lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LightState {
    pub red: bool,
    pub yellow: bool,
    pub green: bool,
}

impl LightState {
    pub const ALL_OFF: LightState = LightState {
        red: false,
        yellow: false,
        green: false,
    };

    pub const ALL_ON: LightState = LightState {
        red: true,
        yellow: true,
        green: true,
    };

    /// Exactly one lamp lit.
    pub const fn only(color: Color) -> Self {
        LightState {
            red: matches!(color, Color::Red),
            yellow: matches!(color, Color::Yellow),
            green: matches!(color, Color::Green),
        }
    }

    pub fn is_lit(&self, color: Color) -> bool {
        match color {
            Color::Red => self.red,
            Color::Yellow => self.yellow,
            Color::Green => self.green,
        }
    }
}

/// A decoded inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetMode(Mode),
    SetBrightness(i64),
    SetDuration(Color, u32),
    SetLights(LightState),
    Unrecognized(String),
}

/// A duration already known to sit inside its color's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDuration {
    color: Color,
    ms: u32,
}

impl ColorDuration {
    /// Validate a user edit; values outside the color's range are rejected.
    pub fn try_new(color: Color, ms: u32) -> Result<Self, OutOfRangeEdit> {
        let range = color.range();
        if range.contains(&ms) {
            Ok(Self { color, ms })
        } else {
            Err(OutOfRangeEdit {
                color,
                value: ms,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }

    /// Pull an arbitrary value into the color's range.
    pub fn clamped(color: Color, ms: u32) -> Self {
        let range = color.range();
        Self {
            color,
            ms: ms.clamp(*range.start(), *range.end()),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn ms(&self) -> u32 {
        self.ms
    }
}

/// A host-originated instruction, not yet serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetMode(Mode),
    SetDuration(ColorDuration),
}

/// A local duration edit outside the color's accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{color} duration {value} ms is out of range [{min}, {max}]")]
pub struct OutOfRangeEdit {
    pub color: Color,
    pub value: u32,
    pub min: u32,
    pub max: u32,
}
