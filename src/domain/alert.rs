//! Threshold Alert Engine
//!
//! Decides whether a heart-rate sample should wake the wearer and, when it
//! does, hands back the fixed six-pulse schedule. Decisions are throttled so
//! two triggers are always more than [`THROTTLE_WINDOW`] apart, measured
//! between decision times.

use crate::domain::models::{HeartRateSample, PulseSchedule, ThresholdConfig};
use std::time::{Duration, Instant};

pub const THROTTLE_WINDOW: Duration = Duration::from_secs(10);

/// Time of the last trigger decision. `None` is "infinitely in the past".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    last_alert_at: Option<Instant>,
}

impl ThrottleState {
    pub fn last_alert_at(&self) -> Option<Instant> {
        self.last_alert_at
    }

    /// A sample stamped before the last alert counts as zero elapsed.
    pub fn allows(&self, now: Instant) -> bool {
        match self.last_alert_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) > THROTTLE_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    None,
    Trigger(PulseSchedule),
}

impl Decision {
    pub fn is_trigger(&self) -> bool {
        matches!(self, Decision::Trigger(_))
    }
}

/// Strict inequality on both sides: a zero reading is a dropout and a
/// reading equal to the threshold is not low enough.
pub fn is_below_threshold(bpm: f64, threshold_bpm: f64) -> bool {
    bpm > 0.0 && bpm < threshold_bpm
}

/// Evaluate one sample. On trigger the throttle is stamped with the
/// sample time before the schedule is returned.
pub fn evaluate(
    sample: &HeartRateSample,
    config: &ThresholdConfig,
    throttle: &mut ThrottleState,
) -> Decision {
    let now = sample.timestamp;
    if !is_below_threshold(sample.bpm(), config.threshold_bpm()) || !throttle.allows(now) {
        return Decision::None;
    }

    throttle.last_alert_at = Some(now);
    Decision::Trigger(PulseSchedule::anchored_at(now))
}

/// Owns the throttle clock for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ThresholdAlertEngine {
    throttle: ThrottleState,
}

impl ThresholdAlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, sample: &HeartRateSample, config: &ThresholdConfig) -> Decision {
        let decision = evaluate(sample, config, &mut self.throttle);
        if decision.is_trigger() {
            tracing::info!(
                bpm = sample.bpm(),
                threshold = config.threshold_bpm(),
                "Heart rate below threshold, wake sequence triggered"
            );
        }
        decision
    }

    pub fn throttle(&self) -> ThrottleState {
        self.throttle
    }
}
