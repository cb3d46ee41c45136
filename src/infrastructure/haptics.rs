//! Haptic actuator seam and pulse scheduling.

use crate::domain::models::{HapticPattern, PulseSchedule};
use std::sync::Arc;
use tracing::info;

/// Fire-and-forget actuation primitive.
pub trait HapticActuator: Send + Sync {
    fn play(&self, pattern: HapticPattern);
}

/// Actuator for hosts without a motor: each pulse becomes a log line.
pub struct LoggingActuator;

impl HapticActuator for LoggingActuator {
    fn play(&self, pattern: HapticPattern) {
        info!("Haptic pulse: {:?}", pattern);
    }
}

/// Spawn one delayed actuation per event, each due at the schedule anchor
/// plus its offset. The tasks are detached and cannot be cancelled.
pub fn play_schedule(actuator: &Arc<dyn HapticActuator>, schedule: &PulseSchedule) {
    let anchor = tokio::time::Instant::from_std(schedule.anchor());
    for event in schedule.events().iter().copied() {
        let actuator = Arc::clone(actuator);
        tokio::spawn(async move {
            tokio::time::sleep_until(anchor + event.offset).await;
            actuator.play(event.pattern);
        });
    }
}
