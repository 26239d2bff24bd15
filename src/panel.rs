//! The surface a presentation layer drives: connection control, mode and
//! duration requests, the scheduler tick, and read-only views of the mirror.

use tracing::{debug, info, warn};

use crate::policy::{ApplyPolicy, Reconciler};
use crate::protocol::{decode, encode, Color, Command, Intent, Mode, OutOfRangeEdit};
use crate::serial::{ConnectionError, LineTransport};
use crate::state::{DeviceMirror, DeviceState, MessageLog};

/// What one call to [`Panel::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Command decoded from the line consumed this tick, if a line arrived.
    pub received: Option<Command>,
    /// Lines written to the transport by the policy step.
    pub sent: Vec<String>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.received.is_none() && self.sent.is_empty()
    }
}

pub struct Panel<T: LineTransport> {
    transport: T,
    mirror: DeviceMirror,
    reconciler: Reconciler,
    log: MessageLog,
    ticks: u64,
}

impl<T: LineTransport> Panel<T> {
    pub fn new(transport: T, policy: ApplyPolicy, log_len: usize) -> Self {
        Self {
            transport,
            mirror: DeviceMirror::new(),
            reconciler: Reconciler::new(policy),
            log: MessageLog::new(log_len),
            ticks: 0,
        }
    }

    pub fn connect(&mut self, port: Option<&str>) -> Result<(), ConnectionError> {
        self.transport.open(port).inspect_err(|err| {
            warn!("connect failed: {err}");
        })
    }

    pub fn disconnect(&mut self) {
        self.transport.close();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Send the mode and show it locally straight away, without waiting for
    /// the device to echo it. Line breaks in the text are dropped. While
    /// disconnected only the local mode changes.
    pub fn set_mode(&mut self, mode: Mode) {
        let intent = Intent::SetMode(mode.single_line());
        if self.dispatch(&intent).is_none() {
            self.mirror.apply_intent(&intent);
        }
    }

    /// Route a duration edit through the configured policy. Out-of-range values
    /// are rejected here and never reach the wire.
    pub fn request_duration_change(&mut self, color: Color, ms: u32) -> Result<(), OutOfRangeEdit> {
        let immediate = self.reconciler.edit(color, ms).inspect_err(|err| {
            debug!("rejected duration edit: {err}");
        })?;
        if let Some(intent) = immediate {
            if self.dispatch(&intent).is_none() {
                debug!("edit recorded; not sent while disconnected");
            }
        }
        Ok(())
    }

    /// Explicit apply action. Returns the lines sent.
    pub fn apply(&mut self) -> Vec<String> {
        let intents = self.reconciler.apply(self.mirror.state());
        self.dispatch_all(&intents)
    }

    /// One cooperative scheduler step: consume at most one inbound line, run
    /// the policy's tick step, advance the tick counter.
    pub fn tick(&mut self) -> TickReport {
        let received = self.transport.poll_line().map(|line| self.ingest(&line));
        let intents = self.reconciler.tick(self.mirror.state());
        let sent = self.dispatch_all(&intents);
        self.ticks = self.ticks.wrapping_add(1);
        TickReport { received, sent }
    }

    pub fn snapshot(&self) -> DeviceState {
        self.mirror.snapshot()
    }

    pub fn state(&self) -> &DeviceState {
        self.mirror.state()
    }

    /// Up to `n` raw inbound lines, newest first.
    pub fn recent_messages(&self, n: usize) -> Vec<String> {
        self.log.recent(n)
    }

    pub fn last_message(&self) -> Option<&str> {
        self.log.latest()
    }

    /// Current value of the duration control for `color`.
    pub fn control_value(&self, color: Color) -> u32 {
        self.reconciler.control_value(color)
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.reconciler.policy()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn ingest(&mut self, line: &str) -> Command {
        debug!("<- {line}");
        self.log.push(line);
        let command = decode(line);
        match &command {
            Command::Unrecognized(raw) => debug!("ignoring unrecognized line {raw:?}"),
            Command::SetDuration(color, ms) => self.reconciler.sync_from_device(*color, *ms),
            Command::SetMode(mode) => info!("device mode is now {mode}"),
            Command::SetBrightness(_) | Command::SetLights(_) => {}
        }
        self.mirror.apply(&command);
        command
    }

    /// Write one intent and record it in the mirror. Returns `None` without
    /// touching the mirror when the link is closed, so pending duration edits
    /// survive until the next connect.
    fn dispatch(&mut self, intent: &Intent) -> Option<String> {
        if !self.transport.is_open() {
            debug!("not connected; holding {intent:?}");
            return None;
        }
        let line = encode(intent);
        self.transport.send_line(&line);
        self.mirror.apply_intent(intent);
        Some(line)
    }

    fn dispatch_all(&mut self, intents: &[Intent]) -> Vec<String> {
        intents
            .iter()
            .filter_map(|intent| self.dispatch(intent))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LightState;
    use crate::serial::FakeTransport;

    fn panel(policy: ApplyPolicy, script: &[&str]) -> Panel<FakeTransport> {
        Panel::new(FakeTransport::connected(script.iter().copied()), policy, 10)
    }

    #[test]
    fn tick_consumes_one_line_at_a_time() {
        let mut panel = panel(ApplyPolicy::DeltaOnly, &["RED_DURATION:1234", "RED"]);
        let first = panel.tick();
        assert_eq!(first.received, Some(Command::SetDuration(Color::Red, 1234)));
        assert_eq!(panel.state().lights, LightState::ALL_OFF);
        panel.tick();
        let state = panel.snapshot();
        assert_eq!(state.durations.red, 1234);
        assert_eq!(state.lights, LightState::only(Color::Red));
        assert!(panel.tick().is_idle());
        assert_eq!(panel.ticks(), 3);
    }

    #[test]
    fn device_duration_report_does_not_bounce_back() {
        let mut panel = panel(ApplyPolicy::DeltaOnly, &["GREEN_DURATION:4200"]);
        let report = panel.tick();
        assert!(report.sent.is_empty());
        assert_eq!(panel.control_value(Color::Green), 4_200);
        assert!(panel.transport().writes().is_empty());
    }

    #[test]
    fn set_mode_is_optimistic() {
        let mut panel = panel(ApplyPolicy::DeltaOnly, &[]);
        panel.set_mode(Mode::Blinking);
        assert_eq!(panel.state().mode, Mode::Blinking);
        assert_eq!(panel.transport().writes(), &["MODE:BLINKING".to_string()]);
    }

    #[test]
    fn set_mode_while_disconnected_updates_locally_only() {
        let mut panel = Panel::new(
            FakeTransport::new(Vec::<String>::new()),
            ApplyPolicy::Immediate,
            10,
        );
        panel.set_mode(Mode::Off);
        assert_eq!(panel.state().mode, Mode::Off);
        assert!(panel.transport().writes().is_empty());
    }

    #[test]
    fn mode_text_line_breaks_never_reach_the_wire() {
        let mut panel = panel(ApplyPolicy::DeltaOnly, &[]);
        panel.set_mode(Mode::from("OFF\nRED:100"));
        assert_eq!(panel.transport().writes(), &["MODE:OFFRED:100".to_string()]);
        assert_eq!(panel.state().mode, Mode::Other("OFFRED:100".into()));
    }

    #[test]
    fn batch_apply_while_disconnected_sends_and_records_nothing() {
        let mut panel = Panel::new(
            FakeTransport::new(Vec::<String>::new()),
            ApplyPolicy::Batch,
            10,
        );
        panel.request_duration_change(Color::Red, 3_000).unwrap();
        assert!(panel.apply().is_empty());
        assert_eq!(panel.state().durations.red, 2_000);
        panel.connect(None).unwrap();
        assert_eq!(panel.apply(), vec!["RED:3000", "YELLOW:500", "GREEN:2000"]);
    }

    #[test]
    fn immediate_policy_sends_on_request() {
        let mut panel = panel(ApplyPolicy::Immediate, &[]);
        panel.request_duration_change(Color::Yellow, 800).unwrap();
        assert_eq!(panel.transport().writes(), &["YELLOW:800".to_string()]);
        assert_eq!(panel.state().durations.yellow, 800);
        assert!(panel.tick().sent.is_empty());
    }

    #[test]
    fn batch_policy_waits_for_apply() {
        let mut panel = panel(ApplyPolicy::Batch, &[]);
        panel.request_duration_change(Color::Red, 3_000).unwrap();
        panel.tick();
        assert!(panel.transport().writes().is_empty());
        assert_eq!(panel.state().durations.red, 2_000);
        let sent = panel.apply();
        assert_eq!(sent, vec!["RED:3000", "YELLOW:500", "GREEN:2000"]);
        assert_eq!(panel.state().durations.red, 3_000);
    }

    #[test]
    fn out_of_range_request_is_rejected_before_the_wire() {
        let mut panel = panel(ApplyPolicy::Immediate, &[]);
        let err = panel.request_duration_change(Color::Red, 9_000).unwrap_err();
        assert_eq!(err.max, 5_000);
        assert!(panel.transport().writes().is_empty());
        assert_eq!(panel.control_value(Color::Red), 2_000);
    }

    #[test]
    fn connect_failure_is_reported() {
        let mut fake = FakeTransport::new(Vec::<String>::new());
        fake.fail_open_with(crate::serial::FailureKind::DeviceMissing);
        let mut panel = Panel::new(fake, ApplyPolicy::DeltaOnly, 10);
        assert!(panel.connect(Some("/dev/ttyACM9")).is_err());
        assert!(!panel.is_connected());
        assert!(panel.tick().is_idle());
    }
}
