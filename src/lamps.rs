//! Lamp rendering derived from the mirrored state.
//!
//! Nothing here writes [`DeviceState`]; blinking is driven by the tick counter
//! so the animation period is independent of how fast the loop runs.

use crate::protocol::{Color, LightState, Mode};
use crate::state::DeviceState;

pub const DEFAULT_BLINK_PERIOD_TICKS: u64 = 30;
pub const UNLIT_ALPHA: u8 = 100;
const MIN_LIT_ALPHA: i64 = 50;
const MAX_LIT_ALPHA: i64 = 255;

/// Lamps as they should appear on screen at `tick`.
pub fn displayed_lights(state: &DeviceState, tick: u64, blink_period_ticks: u64) -> LightState {
    match state.mode {
        Mode::Blinking => {
            let phase = tick / blink_period_ticks.max(1);
            if phase % 2 == 1 {
                LightState::ALL_ON
            } else {
                LightState::ALL_OFF
            }
        }
        Mode::Emergency => LightState::only(Color::Red),
        Mode::Off => LightState::ALL_OFF,
        // The controller sequences NORMAL itself; unknown modes keep the last lamps.
        Mode::Normal | Mode::Other(_) => state.lights,
    }
}

/// Opacity for a lit lamp: brightness 0..=255 mapped onto 50..=255.
pub fn lamp_alpha(brightness: i64) -> u8 {
    let clamped = brightness.clamp(0, 255);
    let alpha = MIN_LIT_ALPHA + clamped * (MAX_LIT_ALPHA - MIN_LIT_ALPHA) / 255;
    u8::try_from(alpha).unwrap_or(u8::MAX)
}

/// Opacity for one lamp given whether it is lit.
pub fn alpha_for(lights: LightState, color: Color, brightness: i64) -> u8 {
    if lights.is_lit(color) {
        lamp_alpha(brightness)
    } else {
        UNLIT_ALPHA
    }
}
