use std::{
    fmt::Write as _,
    ops::ControlFlow,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crossbeam::channel::{Receiver, TryRecvError};
use tracing::{info, warn};

use super::input::{parse_console_line, ConsoleCommand, CONSOLE_HELP};
use super::AppConfig;
use crate::{
    lamps::{alpha_for, displayed_lights},
    panel::Panel,
    protocol::{Color, ColorDuration},
    serial::{available_ports, LineTransport},
    state::DeviceState,
    Result,
};

/// Drive the panel: drain console input, tick, redraw the status line when it changes.
pub(super) fn run_render_loop<T: LineTransport>(
    panel: &mut Panel<T>,
    config: &AppConfig,
    console: Option<&Receiver<String>>,
    running: &AtomicBool,
) -> Result<()> {
    let mut console = console;
    let mut last_status = String::new();
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        let tick_started = Instant::now();

        if let Some(rx) = console {
            match drain_console(panel, config, rx) {
                Ok(ControlFlow::Break(())) => break,
                Ok(ControlFlow::Continue(())) => {}
                Err(TryRecvError::Disconnected) => console = None,
                Err(TryRecvError::Empty) => {}
            }
        }

        let report = panel.tick();
        for line in &report.sent {
            info!("sent {line}");
        }

        let status = render_status(
            panel.state(),
            panel.ticks(),
            config.blink_period_ticks,
            panel.is_connected(),
            panel.last_message(),
        );
        if status != last_status {
            println!("{status}");
            last_status = status;
        }

        let elapsed = tick_started.elapsed();
        if elapsed < config.tick {
            thread::sleep(config.tick - elapsed);
        }
    }

    panel.disconnect();
    info!(
        "panel stopped after {}",
        humantime::format_duration(Duration::from_secs(started.elapsed().as_secs()))
    );
    Ok(())
}

fn drain_console<T: LineTransport>(
    panel: &mut Panel<T>,
    config: &AppConfig,
    rx: &Receiver<String>,
) -> std::result::Result<ControlFlow<()>, TryRecvError> {
    loop {
        let line = rx.try_recv()?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_console_line(&line) {
            Ok(command) => {
                if handle_console(panel, config, command).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            Err(msg) => println!("! {msg}"),
        }
    }
}

/// Execute one console command against the panel.
pub(super) fn handle_console<T: LineTransport>(
    panel: &mut Panel<T>,
    config: &AppConfig,
    command: ConsoleCommand,
) -> ControlFlow<()> {
    match command {
        ConsoleCommand::SetMode(mode) => panel.set_mode(mode),
        ConsoleCommand::SetDuration(color, ms) => request(panel, color, ms),
        ConsoleCommand::Nudge(color, direction) => {
            let current = panel.control_value(color);
            let target = if direction >= 0 {
                current.saturating_add(config.duration_step_ms)
            } else {
                current.saturating_sub(config.duration_step_ms)
            };
            request(panel, color, ColorDuration::clamped(color, target).ms());
        }
        ConsoleCommand::Apply => {
            let sent = panel.apply();
            println!("applied {} line(s)", sent.len());
        }
        ConsoleCommand::Connect(port) => match panel.connect(port.as_deref()) {
            Ok(()) => println!("connected"),
            Err(err) => println!("! {err}"),
        },
        ConsoleCommand::Disconnect => {
            panel.disconnect();
            println!("disconnected");
        }
        ConsoleCommand::Status => match serde_json::to_string_pretty(&panel.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!("cannot render status: {err}"),
        },
        ConsoleCommand::Log(n) => {
            for line in panel.recent_messages(n.unwrap_or(config.message_log_len)) {
                println!("  {line}");
            }
        }
        ConsoleCommand::Ports => match available_ports() {
            Ok(ports) if ports.is_empty() => println!("no serial ports found"),
            Ok(ports) => ports.iter().for_each(|port| println!("  {port}")),
            Err(err) => println!("! {err}"),
        },
        ConsoleCommand::Help => print!("{CONSOLE_HELP}"),
        ConsoleCommand::Quit => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

fn request<T: LineTransport>(panel: &mut Panel<T>, color: Color, ms: u32) {
    if let Err(err) = panel.request_duration_change(color, ms) {
        println!("! {err}");
    }
}

/// One-line summary of what the panel believes the fixture is showing.
pub(super) fn render_status(
    state: &DeviceState,
    tick: u64,
    blink_period_ticks: u64,
    connected: bool,
    last_message: Option<&str>,
) -> String {
    let lamps = displayed_lights(state, tick, blink_period_ticks);
    let mut out = String::new();
    let link = if connected { "online" } else { "offline" };
    let _ = write!(out, "[{link}] mode={} lamps=", state.mode);
    for color in Color::ALL {
        let glyph = if lamps.is_lit(color) { '#' } else { '.' };
        let _ = write!(
            out,
            "{}{glyph}({}) ",
            &color.wire_name()[..1],
            alpha_for(lamps, color, state.brightness)
        );
    }
    let _ = write!(
        out,
        "brightness={} red={}ms yellow={}ms green={}ms",
        state.brightness, state.durations.red, state.durations.yellow, state.durations.green
    );
    if let Some(line) = last_message {
        let _ = write!(out, " last={line:?}");
    }
    out
}
