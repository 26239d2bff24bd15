use std::io::BufRead;
use std::thread;

use crossbeam::channel::{self, Receiver};
use tracing::debug;

use crate::protocol::{Color, Mode};

/// A command typed at the panel console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SetMode(Mode),
    SetDuration(Color, u32),
    /// Step a duration control up (`+1`) or down (`-1`) by the configured step.
    Nudge(Color, i8),
    Apply,
    Connect(Option<String>),
    Disconnect,
    Status,
    Log(Option<usize>),
    Ports,
    Help,
    Quit,
}

pub const CONSOLE_HELP: &str = concat!(
    "commands:\n",
    "  mode <TEXT>                   send any mode text\n",
    "  normal | emergency | blinking | off\n",
    "  red|yellow|green <ms>         request a duration\n",
    "  red|yellow|green + | -        nudge a duration by one step\n",
    "  apply                         flush duration edits (batch policy)\n",
    "  connect [PORT] | disconnect\n",
    "  status                        print the mirrored state as JSON\n",
    "  log [N]                       show recent raw lines\n",
    "  ports | help | quit\n",
);

/// Parse one console line. Mode text after `mode` is passed through verbatim.
pub fn parse_console_line(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "mode" if !rest.is_empty() => Ok(ConsoleCommand::SetMode(Mode::from(rest))),
        "mode" => Err("mode needs a value, e.g. `mode EMERGENCY`".into()),
        "normal" => Ok(ConsoleCommand::SetMode(Mode::Normal)),
        "emergency" => Ok(ConsoleCommand::SetMode(Mode::Emergency)),
        "blinking" | "blink" => Ok(ConsoleCommand::SetMode(Mode::Blinking)),
        "off" => Ok(ConsoleCommand::SetMode(Mode::Off)),
        "red" | "yellow" | "green" => {
            let color: Color = head.parse()?;
            match rest {
                "+" => Ok(ConsoleCommand::Nudge(color, 1)),
                "-" => Ok(ConsoleCommand::Nudge(color, -1)),
                "" => Err(format!("{head} needs a duration in ms")),
                value => value
                    .parse()
                    .map(|ms| ConsoleCommand::SetDuration(color, ms))
                    .map_err(|_| format!("'{value}' is not a duration in ms")),
            }
        }
        "apply" => Ok(ConsoleCommand::Apply),
        "connect" => Ok(ConsoleCommand::Connect(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "disconnect" => Ok(ConsoleCommand::Disconnect),
        "status" => Ok(ConsoleCommand::Status),
        "log" if rest.is_empty() => Ok(ConsoleCommand::Log(None)),
        "log" => rest
            .parse()
            .map(|n| ConsoleCommand::Log(Some(n)))
            .map_err(|_| format!("'{rest}' is not a line count")),
        "ports" => Ok(ConsoleCommand::Ports),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        "" => Err("empty command".into()),
        other => Err(format!("unknown command '{other}', try help")),
    }
}

/// Read stdin on a background thread so the tick loop never blocks on input.
/// The channel closes when stdin reaches EOF.
pub fn spawn_console_reader() -> crate::Result<Receiver<String>> {
    let (tx, rx) = channel::unbounded();
    thread::Builder::new()
        .name("trafficlink-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("console input closed");
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_shortcuts_and_free_text() {
        assert_eq!(
            parse_console_line("emergency"),
            Ok(ConsoleCommand::SetMode(Mode::Emergency))
        );
        assert_eq!(
            parse_console_line("mode  NIGHT SHIFT "),
            Ok(ConsoleCommand::SetMode(Mode::Other("NIGHT SHIFT".into())))
        );
        assert!(parse_console_line("mode").is_err());
    }

    #[test]
    fn parses_durations_and_nudges() {
        assert_eq!(
            parse_console_line("green 3500"),
            Ok(ConsoleCommand::SetDuration(Color::Green, 3_500))
        );
        assert_eq!(
            parse_console_line("Red +"),
            Ok(ConsoleCommand::Nudge(Color::Red, 1))
        );
        assert_eq!(
            parse_console_line("yellow -"),
            Ok(ConsoleCommand::Nudge(Color::Yellow, -1))
        );
        assert!(parse_console_line("red fast").is_err());
        assert!(parse_console_line("red").is_err());
    }

    #[test]
    fn parses_connection_and_log_commands() {
        assert_eq!(
            parse_console_line("connect /dev/ttyUSB1"),
            Ok(ConsoleCommand::Connect(Some("/dev/ttyUSB1".into())))
        );
        assert_eq!(parse_console_line("connect"), Ok(ConsoleCommand::Connect(None)));
        assert_eq!(parse_console_line("log 3"), Ok(ConsoleCommand::Log(Some(3))));
        assert_eq!(parse_console_line("log"), Ok(ConsoleCommand::Log(None)));
        assert_eq!(parse_console_line("quit"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn rejects_unknown_commands() {
        let err = parse_console_line("launch rockets").unwrap_err();
        assert!(err.contains("unknown command"));
        assert!(parse_console_line("   ").is_err());
    }
}
