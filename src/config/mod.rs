use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    lamps::DEFAULT_BLINK_PERIOD_TICKS,
    policy::ApplyPolicy,
    serial::{DtrBehavior, FlowControlMode, ParityMode, SerialOptions, StopBitsMode},
    state::{DEFAULT_MESSAGE_LOG_LEN, MAX_MESSAGE_LOG_LEN},
    Error, Result,
};

pub mod loader;

pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";
pub const DEFAULT_BAUD: u32 = 9_600;
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 10;
pub const DEFAULT_TICK_MS: u64 = 16;
pub const MAX_TICK_MS: u64 = 1_000;
pub const DEFAULT_DURATION_STEP_MS: u32 = 10;
const CONFIG_DIR_NAME: &str = ".trafficlink";
const CONFIG_FILE_NAME: &str = "config.toml";

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub device: String,
    pub baud: u32,
    pub flow_control: FlowControlMode,
    pub parity: ParityMode,
    pub stop_bits: StopBitsMode,
    pub dtr_on_open: DtrBehavior,
    pub serial_timeout_ms: u64,
    pub apply_policy: ApplyPolicy,
    pub message_log_len: usize,
    pub tick_ms: u64,
    pub blink_period_ticks: u64,
    pub duration_step_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud: DEFAULT_BAUD,
            flow_control: FlowControlMode::default(),
            parity: ParityMode::default(),
            stop_bits: StopBitsMode::default(),
            dtr_on_open: DtrBehavior::default(),
            serial_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
            apply_policy: ApplyPolicy::default(),
            message_log_len: DEFAULT_MESSAGE_LOG_LEN,
            tick_ms: DEFAULT_TICK_MS,
            blink_period_ticks: DEFAULT_BLINK_PERIOD_TICKS,
            duration_step_ms: DEFAULT_DURATION_STEP_MS,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    pub fn default_path() -> Result<PathBuf> {
        loader::config_path()
    }

    pub fn serial_options(&self) -> SerialOptions {
        SerialOptions {
            baud: self.baud,
            timeout_ms: self.serial_timeout_ms,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            dtr: self.dtr_on_open,
        }
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.baud == 0 {
        return Err(Error::InvalidArgs("baud must be greater than zero".into()));
    }
    if !(1..=MAX_MESSAGE_LOG_LEN).contains(&cfg.message_log_len) {
        return Err(Error::InvalidArgs(format!(
            "message_log_len must be between 1 and {MAX_MESSAGE_LOG_LEN} (got {})",
            cfg.message_log_len
        )));
    }
    if !(1..=MAX_TICK_MS).contains(&cfg.tick_ms) {
        return Err(Error::InvalidArgs(format!(
            "tick_ms must be between 1 and {MAX_TICK_MS} (got {})",
            cfg.tick_ms
        )));
    }
    if cfg.blink_period_ticks == 0 {
        return Err(Error::InvalidArgs(
            "blink_period_ticks must be at least 1".into(),
        ));
    }
    if cfg.duration_step_ms == 0 {
        return Err(Error::InvalidArgs(
            "duration_step_ms must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_zero_baud() {
        let cfg = Config {
            baud: 0,
            ..Config::default()
        };
        let err = validate(&cfg).unwrap_err();
        assert!(format!("{err}").contains("baud"));
    }

    #[test]
    fn rejects_message_log_len_outside_range() {
        for len in [0, MAX_MESSAGE_LOG_LEN + 1] {
            let cfg = Config {
                message_log_len: len,
                ..Config::default()
            };
            let err = validate(&cfg).unwrap_err();
            assert!(format!("{err}").contains("message_log_len"));
        }
    }

    #[test]
    fn rejects_tick_outside_range() {
        let cfg = Config {
            tick_ms: 0,
            ..Config::default()
        };
        assert!(format!("{}", validate(&cfg).unwrap_err()).contains("tick_ms"));
    }

    #[test]
    fn serial_options_follow_config() {
        let cfg = Config {
            baud: 115_200,
            parity: ParityMode::Odd,
            dtr_on_open: DtrBehavior::Off,
            ..Config::default()
        };
        let opts = cfg.serial_options();
        assert_eq!(opts.baud, 115_200);
        assert_eq!(opts.parity, ParityMode::Odd);
        assert_eq!(opts.dtr, DtrBehavior::Off);
    }
}
