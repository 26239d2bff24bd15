use std::{path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::{
    cli::RunOptions,
    config::{Config, DEFAULT_DURATION_STEP_MS, DEFAULT_TICK_MS, MAX_TICK_MS},
    lamps::DEFAULT_BLINK_PERIOD_TICKS,
    panel::Panel,
    policy::ApplyPolicy,
    serial::{SerialOptions, SerialTransport},
    state::{DEFAULT_MESSAGE_LOG_LEN, MAX_MESSAGE_LOG_LEN},
    Error, Result,
};

mod input;
mod lifecycle;
mod logger;
mod render_loop;

pub use input::{parse_console_line, ConsoleCommand, CONSOLE_HELP};
pub use logger::LogLevel;
use render_loop::run_render_loop;

/// Resolved runtime settings: config file values with CLI overrides on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub device: String,
    pub serial: SerialOptions,
    pub policy: ApplyPolicy,
    pub message_log_len: usize,
    pub tick: Duration,
    pub blink_period_ticks: u64,
    pub duration_step_ms: u32,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub no_connect: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let config = Config::default();
        Self {
            device: config.device.clone(),
            serial: config.serial_options(),
            policy: ApplyPolicy::default(),
            message_log_len: DEFAULT_MESSAGE_LOG_LEN,
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            blink_period_ticks: DEFAULT_BLINK_PERIOD_TICKS,
            duration_step_ms: DEFAULT_DURATION_STEP_MS,
            log_level: LogLevel::default(),
            log_file: None,
            no_connect: false,
        }
    }
}

impl AppConfig {
    pub fn from_sources(config: Config, opts: RunOptions) -> Result<Self> {
        let log_level = match opts.log_level.as_deref() {
            Some(raw) => LogLevel::from_str(raw)
                .map_err(|_| Error::InvalidArgs(format!("unknown log level '{raw}'")))?,
            None => LogLevel::default(),
        };

        let message_log_len = opts.log_len.unwrap_or(config.message_log_len);
        if !(1..=MAX_MESSAGE_LOG_LEN).contains(&message_log_len) {
            return Err(Error::InvalidArgs(format!(
                "--log-len must be between 1 and {MAX_MESSAGE_LOG_LEN}"
            )));
        }

        let tick = opts
            .tick
            .unwrap_or_else(|| Duration::from_millis(config.tick_ms));
        if tick.is_zero() || tick > Duration::from_millis(MAX_TICK_MS) {
            return Err(Error::InvalidArgs(format!(
                "--tick must be between 1ms and {MAX_TICK_MS}ms"
            )));
        }

        let mut serial = config.serial_options();
        if let Some(baud) = opts.baud {
            if baud == 0 {
                return Err(Error::InvalidArgs("--baud must be greater than zero".into()));
            }
            serial.baud = baud;
        }

        Ok(Self {
            device: opts.device.unwrap_or(config.device),
            serial,
            policy: opts.policy.unwrap_or(config.apply_policy),
            message_log_len,
            tick,
            blink_period_ticks: config.blink_period_ticks,
            duration_step_ms: config.duration_step_ms,
            log_level,
            log_file: opts.log_file,
            no_connect: opts.no_connect,
        })
    }
}

pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        logger::init(config.log_level, config.log_file.clone())?;
        Ok(Self { config })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let config = match opts.config.as_deref() {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load_or_default()?,
        };
        Self::new(AppConfig::from_sources(config, opts)?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the interactive panel until `quit` or ctrl-c.
    pub fn run(&self) -> Result<()> {
        let transport = SerialTransport::new(self.config.device.clone(), self.config.serial);
        let mut panel = Panel::new(transport, self.config.policy, self.config.message_log_len);

        info!(
            "trafficlink {} starting: device={} baud={} policy={}",
            env!("CARGO_PKG_VERSION"),
            self.config.device,
            self.config.serial.baud,
            self.config.policy
        );

        if self.config.no_connect {
            info!("starting disconnected");
        } else if let Err(err) = panel.connect(None) {
            warn!("initial connect failed: {err}; use `connect` to retry");
        }

        let running = lifecycle::create_shutdown_flag()?;
        let console = input::spawn_console_reader()?;
        println!("type `help` for commands");
        run_render_loop(&mut panel, &self.config, Some(&console), &running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_config() {
        let cfg = AppConfig::from_sources(Config::default(), RunOptions::default()).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn cli_overrides_config_file() {
        let config = Config {
            device: "/dev/ttyUSB3".into(),
            apply_policy: ApplyPolicy::Batch,
            ..Config::default()
        };
        let opts = RunOptions {
            baud: Some(115_200),
            policy: Some(ApplyPolicy::Immediate),
            tick: Some(Duration::from_millis(40)),
            log_len: Some(5),
            log_level: Some("debug".into()),
            no_connect: true,
            ..RunOptions::default()
        };
        let cfg = AppConfig::from_sources(config, opts).unwrap();
        assert_eq!(cfg.device, "/dev/ttyUSB3");
        assert_eq!(cfg.serial.baud, 115_200);
        assert_eq!(cfg.policy, ApplyPolicy::Immediate);
        assert_eq!(cfg.tick, Duration::from_millis(40));
        assert_eq!(cfg.message_log_len, 5);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert!(cfg.no_connect);
    }

    #[test]
    fn rejects_bad_overrides() {
        let bad_level = RunOptions {
            log_level: Some("chatty".into()),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), bad_level).is_err());

        let bad_len = RunOptions {
            log_len: Some(0),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), bad_len).is_err());

        let bad_tick = RunOptions {
            tick: Some(Duration::from_secs(5)),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), bad_tick).is_err());
    }

    #[test]
    fn from_options_reads_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "device = \"/dev/ttyS9\"\napply_policy = \"batch\"\n").unwrap();
        let app = App::from_options(RunOptions {
            config: Some(path),
            ..RunOptions::default()
        })
        .unwrap();
        assert_eq!(app.config().device, "/dev/ttyS9");
        assert_eq!(app.config().policy, ApplyPolicy::Batch);
    }
}
