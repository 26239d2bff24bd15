use std::collections::VecDeque;

use serde::Serialize;

use crate::protocol::{Color, Command, Intent, LightState, Mode};

pub const DEFAULT_BRIGHTNESS: i64 = 255;
pub const DEFAULT_MESSAGE_LOG_LEN: usize = 10;
pub const MAX_MESSAGE_LOG_LEN: usize = 64;

/// Per-color lamp durations in milliseconds, as last known for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Durations {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
}

impl Durations {
    pub fn get(&self, color: Color) -> u32 {
        match color {
            Color::Red => self.red,
            Color::Yellow => self.yellow,
            Color::Green => self.green,
        }
    }

    pub fn set(&mut self, color: Color, ms: u32) {
        match color {
            Color::Red => self.red = ms,
            Color::Yellow => self.yellow = ms,
            Color::Green => self.green = ms,
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            red: Color::Red.default_duration_ms(),
            yellow: Color::Yellow.default_duration_ms(),
            green: Color::Green.default_duration_ms(),
        }
    }
}

/// What the host believes the controller is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub mode: Mode,
    /// Nominally 0..=255; out-of-range values from the device are kept as sent.
    pub brightness: i64,
    pub lights: LightState,
    pub durations: Durations,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            brightness: DEFAULT_BRIGHTNESS,
            lights: LightState::ALL_OFF,
            durations: Durations::default(),
        }
    }
}

/// Sole owner of [`DeviceState`]. Every write goes through [`DeviceMirror::apply`]
/// (decoded device lines) or [`DeviceMirror::apply_intent`] (optimistic local updates).
#[derive(Debug, Default)]
pub struct DeviceMirror {
    state: DeviceState,
}

impl DeviceMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded command. Each variant touches only its own field.
    pub fn apply(&mut self, command: &Command) {
        match command {
            Command::SetMode(mode) => self.state.mode = mode.clone(),
            Command::SetBrightness(value) => self.state.brightness = *value,
            Command::SetDuration(color, ms) => self.state.durations.set(*color, *ms),
            Command::SetLights(lights) => self.state.lights = *lights,
            Command::Unrecognized(_) => {}
        }
    }

    /// Record an intent the host has just sent, without waiting for an echo.
    pub fn apply_intent(&mut self, intent: &Intent) {
        match intent {
            Intent::SetMode(mode) => self.state.mode = mode.clone(),
            Intent::SetDuration(duration) => {
                self.state.durations.set(duration.color(), duration.ms());
            }
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state.clone()
    }
}

/// Bounded history of raw inbound lines, newest first.
#[derive(Debug, Clone)]
pub struct MessageLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_MESSAGE_LOG_LEN);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: &str) {
        self.lines.push_front(line.to_string());
        self.lines.truncate(self.capacity);
    }

    /// Up to `n` lines, most recent first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        self.lines.iter().take(n).cloned().collect()
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LOG_LEN)
    }
}
