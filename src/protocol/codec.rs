use super::{Color, Command, Intent, LightState, Mode};

#[derive(Clone, Copy)]
enum Pattern {
    /// Matches `<prefix>:<payload>`.
    Prefix(&'static str),
    Exact(&'static str),
}

#[derive(Clone, Copy)]
enum Action {
    Mode,
    Brightness,
    Duration(Color),
    Lights(LightState),
}

/// Inbound grammar, first match wins.
const RULES: &[(Pattern, Action)] = &[
    (Pattern::Prefix("MODE"), Action::Mode),
    (Pattern::Prefix("Brightness"), Action::Brightness),
    (Pattern::Prefix("RED_DURATION"), Action::Duration(Color::Red)),
    (Pattern::Prefix("YELLOW_DURATION"), Action::Duration(Color::Yellow)),
    (Pattern::Prefix("GREEN_DURATION"), Action::Duration(Color::Green)),
    (Pattern::Exact("RED"), Action::Lights(LightState::only(Color::Red))),
    (Pattern::Exact("YELLOW"), Action::Lights(LightState::only(Color::Yellow))),
    (Pattern::Exact("GREEN"), Action::Lights(LightState::only(Color::Green))),
    (Pattern::Exact("GREEN_BLINK_ON"), Action::Lights(LightState::only(Color::Green))),
    (Pattern::Exact("GREEN_BLINK_OFF"), Action::Lights(LightState::ALL_OFF)),
    (Pattern::Exact("BLINKING_ALL_ON"), Action::Lights(LightState::ALL_ON)),
    (Pattern::Exact("BLINKING_ALL_OFF"), Action::Lights(LightState::ALL_OFF)),
    (Pattern::Exact("ALL_LEDs_OFF"), Action::Lights(LightState::ALL_OFF)),
    (Pattern::Exact("EMERGENCY_RED_ON"), Action::Lights(LightState::only(Color::Red))),
];

/// Decode one inbound line. Never fails: anything outside the grammar, including
/// a recognised prefix with a non-numeric payload, becomes [`Command::Unrecognized`].
pub fn decode(line: &str) -> Command {
    for (pattern, action) in RULES {
        let payload = match pattern {
            Pattern::Prefix(prefix) => match line.split_once(':') {
                Some((head, rest)) if head == *prefix => Some(rest),
                _ => None,
            },
            Pattern::Exact(text) => (line == *text).then_some(""),
        };
        if let Some(payload) = payload {
            return apply_action(*action, payload)
                .unwrap_or_else(|| Command::Unrecognized(line.to_string()));
        }
    }
    Command::Unrecognized(line.to_string())
}

fn apply_action(action: Action, payload: &str) -> Option<Command> {
    match action {
        Action::Mode => Some(Command::SetMode(Mode::from(payload))),
        Action::Brightness => payload.trim().parse().ok().map(Command::SetBrightness),
        Action::Duration(color) => payload
            .trim()
            .parse::<i64>()
            .ok()
            .map(|ms| Command::SetDuration(color, saturate_ms(ms))),
        Action::Lights(lights) => Some(Command::SetLights(lights)),
    }
}

/// Negative reports become 0, oversized ones `u32::MAX`.
fn saturate_ms(ms: i64) -> u32 {
    u32::try_from(ms.max(0)).unwrap_or(u32::MAX)
}

/// Serialize an intent to its wire text, without the line terminator.
/// Line breaks inside mode text are dropped so one intent is one wire line.
pub fn encode(intent: &Intent) -> String {
    match intent {
        Intent::SetMode(mode) => format!("MODE:{}", mode.single_line()),
        Intent::SetDuration(duration) => {
            format!("{}:{}", duration.color().wire_name(), duration.ms())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ColorDuration;

    #[test]
    fn decodes_mode_remainder_verbatim() {
        assert_eq!(decode("MODE:BLINKING"), Command::SetMode(Mode::Blinking));
        assert_eq!(
            decode("MODE:disco fever"),
            Command::SetMode(Mode::Other("disco fever".into()))
        );
        assert_eq!(
            decode("MODE:A:B"),
            Command::SetMode(Mode::Other("A:B".into()))
        );
    }

    #[test]
    fn decodes_brightness_with_or_without_space() {
        assert_eq!(decode("Brightness: 200"), Command::SetBrightness(200));
        assert_eq!(decode("Brightness:7"), Command::SetBrightness(7));
        assert_eq!(decode("Brightness: -40"), Command::SetBrightness(-40));
        assert_eq!(decode("Brightness: 9000"), Command::SetBrightness(9000));
    }

    #[test]
    fn decodes_duration_reports() {
        assert_eq!(
            decode("RED_DURATION:1234"),
            Command::SetDuration(Color::Red, 1234)
        );
        assert_eq!(
            decode("YELLOW_DURATION: 250"),
            Command::SetDuration(Color::Yellow, 250)
        );
        assert_eq!(
            decode("GREEN_DURATION:0"),
            Command::SetDuration(Color::Green, 0)
        );
    }

    #[test]
    fn out_of_range_duration_reports_saturate() {
        assert_eq!(
            decode("RED_DURATION:-5"),
            Command::SetDuration(Color::Red, 0)
        );
        assert_eq!(
            decode("GREEN_DURATION:99999999999"),
            Command::SetDuration(Color::Green, u32::MAX)
        );
    }

    #[test]
    fn non_numeric_payload_is_unrecognized() {
        for line in ["Brightness: high", "RED_DURATION:", "GREEN_DURATION:12x", "YELLOW_DURATION:5.5"] {
            assert_eq!(decode(line), Command::Unrecognized(line.into()));
        }
    }

    #[test]
    fn decodes_light_words_and_synonyms() {
        let red = Command::SetLights(LightState::only(Color::Red));
        let green = Command::SetLights(LightState::only(Color::Green));
        let off = Command::SetLights(LightState::ALL_OFF);
        assert_eq!(decode("RED"), red);
        assert_eq!(decode("EMERGENCY_RED_ON"), red);
        assert_eq!(
            decode("YELLOW"),
            Command::SetLights(LightState::only(Color::Yellow))
        );
        assert_eq!(decode("GREEN"), green);
        assert_eq!(decode("GREEN_BLINK_ON"), green);
        assert_eq!(decode("GREEN_BLINK_OFF"), off);
        assert_eq!(decode("BLINKING_ALL_OFF"), off);
        assert_eq!(decode("ALL_LEDs_OFF"), off);
        assert_eq!(decode("BLINKING_ALL_ON"), Command::SetLights(LightState::ALL_ON));
    }

    #[test]
    fn matching_is_case_sensitive_and_exact() {
        for line in [
            "red",
            "RED ",
            "REDX",
            "mode:OFF",
            "brightness: 3",
            "Traffic Light System Started",
            "",
        ] {
            assert_eq!(decode(line), Command::Unrecognized(line.into()));
        }
    }

    #[test]
    fn encodes_outbound_intents() {
        assert_eq!(encode(&Intent::SetMode(Mode::Emergency)), "MODE:EMERGENCY");
        assert_eq!(
            encode(&Intent::SetMode(Mode::Other("custom".into()))),
            "MODE:custom"
        );
        assert_eq!(
            encode(&Intent::SetMode(Mode::from("OFF\r\nRED:100"))),
            "MODE:OFFRED:100"
        );
        let green = ColorDuration::try_new(Color::Green, 3_500).unwrap();
        assert_eq!(encode(&Intent::SetDuration(green)), "GREEN:3500");
    }

    #[test]
    fn mode_intent_decodes_back_to_same_mode() {
        let line = encode(&Intent::SetMode(Mode::Emergency));
        assert_eq!(decode(&line), Command::SetMode(Mode::Emergency));
    }
}
