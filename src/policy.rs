//! Reconciliation between user duration edits and the mirrored device state.
//!
//! The reconciler never touches the transport or the mirror itself; it only
//! decides which [`Intent`]s to emit. The panel sends them and records them in
//! the mirror.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::protocol::{Color, ColorDuration, Intent, OutOfRangeEdit};
use crate::state::{DeviceState, Durations};

/// When local duration edits reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyPolicy {
    /// Send every accepted edit as soon as it is made.
    Immediate,
    /// Hold edits until an explicit apply, then send all three colors.
    Batch,
    /// Every tick, send only the colors whose control value differs from the mirror.
    #[default]
    DeltaOnly,
}

impl ApplyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyPolicy::Immediate => "immediate",
            ApplyPolicy::Batch => "batch",
            ApplyPolicy::DeltaOnly => "delta-only",
        }
    }
}

impl fmt::Display for ApplyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" => Ok(ApplyPolicy::Immediate),
            "batch" | "apply" => Ok(ApplyPolicy::Batch),
            "delta-only" | "delta_only" | "delta" => Ok(ApplyPolicy::DeltaOnly),
            _ => Err("expected immediate, batch or delta-only".into()),
        }
    }
}

/// Holds the per-color control values (pending edits) and applies the policy.
#[derive(Debug, Clone)]
pub struct Reconciler {
    policy: ApplyPolicy,
    controls: Durations,
}

impl Reconciler {
    pub fn new(policy: ApplyPolicy) -> Self {
        Self {
            policy,
            controls: Durations::default(),
        }
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    pub fn control_value(&self, color: Color) -> u32 {
        self.controls.get(color)
    }

    /// Record a user edit. Out-of-range values are rejected and leave the
    /// control untouched. Returns the intent to send right away, if any.
    pub fn edit(&mut self, color: Color, ms: u32) -> Result<Option<Intent>, OutOfRangeEdit> {
        let duration = ColorDuration::try_new(color, ms)?;
        self.controls.set(color, duration.ms());
        Ok(match self.policy {
            ApplyPolicy::Immediate => Some(Intent::SetDuration(duration)),
            ApplyPolicy::Batch | ApplyPolicy::DeltaOnly => None,
        })
    }

    /// Explicit apply action.
    pub fn apply(&self, state: &DeviceState) -> Vec<Intent> {
        match self.policy {
            ApplyPolicy::Immediate => Vec::new(),
            ApplyPolicy::Batch => Color::ALL
                .iter()
                .map(|color| self.intent_for(*color))
                .collect(),
            ApplyPolicy::DeltaOnly => self.deltas(state),
        }
    }

    /// Scheduler tick step. Only delta-only does anything here.
    pub fn tick(&self, state: &DeviceState) -> Vec<Intent> {
        match self.policy {
            ApplyPolicy::DeltaOnly => self.deltas(state),
            ApplyPolicy::Immediate | ApplyPolicy::Batch => Vec::new(),
        }
    }

    /// The device reported a duration; the control follows it.
    pub fn sync_from_device(&mut self, color: Color, ms: u32) {
        self.controls.set(color, ms);
    }

    fn deltas(&self, state: &DeviceState) -> Vec<Intent> {
        Color::ALL
            .iter()
            .filter(|color| self.controls.get(**color) != state.durations.get(**color))
            .map(|color| self.intent_for(*color))
            .collect()
    }

    fn intent_for(&self, color: Color) -> Intent {
        Intent::SetDuration(ColorDuration::clamped(color, self.controls.get(color)))
    }
}
