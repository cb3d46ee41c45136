use crate::domain::error::{ConfigError, SessionError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const MIN_THRESHOLD_BPM: f64 = 40.0;
pub const MAX_THRESHOLD_BPM: f64 = 100.0;
/// Granularity of operator adjustments on the handheld.
pub const THRESHOLD_STEP_BPM: f64 = 5.0;

/// Lifecycle of the wearable's monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingAuthorization,
    Starting,
    Running,
    Stopping,
}

impl SessionState {
    /// Whether the edge `self -> to` is one the controller may take.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, AwaitingAuthorization)
                | (Idle, Starting)
                | (AwaitingAuthorization, Starting)
                | (AwaitingAuthorization, Idle)
                | (Starting, Running)
                | (Starting, Idle)
                | (Running, Running)
                | (Running, Stopping)
                | (Stopping, Idle)
        )
    }
}

/// Wake threshold plus the silent-mode flag carried alongside it.
///
/// `silent_mode` travels with the config but no alert decision reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    threshold_bpm: f64,
    pub silent_mode: bool,
}

impl ThresholdConfig {
    pub fn new(threshold_bpm: f64, silent_mode: bool) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold_bpm: validate_threshold(threshold_bpm)?,
            silent_mode,
        })
    }

    /// Build a config from an arbitrary value, clamped into range and
    /// rounded onto the 5-bpm grid.
    pub fn snapped(threshold_bpm: f64, silent_mode: bool) -> Self {
        Self {
            threshold_bpm: snap_threshold(threshold_bpm),
            silent_mode,
        }
    }

    pub fn threshold_bpm(&self) -> f64 {
        self.threshold_bpm
    }

    pub fn set_threshold(&mut self, threshold_bpm: f64) -> Result<(), ConfigError> {
        self.threshold_bpm = validate_threshold(threshold_bpm)?;
        Ok(())
    }

    /// Move the threshold by `steps` grid steps, saturating at the bounds.
    pub fn step(&mut self, steps: i32) {
        self.threshold_bpm =
            snap_threshold(self.threshold_bpm + f64::from(steps) * THRESHOLD_STEP_BPM);
    }
}

fn validate_threshold(threshold_bpm: f64) -> Result<f64, ConfigError> {
    if (MIN_THRESHOLD_BPM..=MAX_THRESHOLD_BPM).contains(&threshold_bpm) {
        Ok(threshold_bpm)
    } else {
        Err(ConfigError::ThresholdOutOfRange(threshold_bpm))
    }
}

fn snap_threshold(threshold_bpm: f64) -> f64 {
    if !threshold_bpm.is_finite() {
        return MIN_THRESHOLD_BPM;
    }
    let snapped = (threshold_bpm / THRESHOLD_STEP_BPM).round() * THRESHOLD_STEP_BPM;
    snapped.clamp(MIN_THRESHOLD_BPM, MAX_THRESHOLD_BPM)
}

/// One heart-rate reading from the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateSample {
    bpm: f64,
    pub timestamp: Instant,
}

impl HeartRateSample {
    /// Negative or non-finite readings are sensor garbage and are recorded
    /// as 0, the same as a dropout.
    pub fn new(bpm: f64, timestamp: Instant) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 0.0 };
        Self { bpm, timestamp }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticPattern {
    /// The strongest actuation the device offers.
    Strongest,
}

/// A single pulse of the wake sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvent {
    pub pulse_index: u8,
    /// Offset from the trigger decision.
    pub offset: Duration,
    pub pattern: HapticPattern,
}

pub const PULSE_COUNT: usize = 6;
pub const PULSE_SPACING: Duration = Duration::from_millis(600);

/// The fixed six-pulse wake sequence anchored at a trigger decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSchedule {
    anchored_at: Instant,
    events: [AlertEvent; PULSE_COUNT],
}

impl PulseSchedule {
    pub fn anchored_at(anchored_at: Instant) -> Self {
        let events = std::array::from_fn(|i| AlertEvent {
            pulse_index: i as u8,
            offset: PULSE_SPACING * i as u32,
            pattern: HapticPattern::Strongest,
        });
        Self {
            anchored_at,
            events,
        }
    }

    pub fn anchor(&self) -> Instant {
        self.anchored_at
    }

    pub fn events(&self) -> &[AlertEvent; PULSE_COUNT] {
        &self.events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    Start,
    Stop,
}

impl ControlAction {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "START" => Some(Self::Start),
            "STOP" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Handheld to wearable command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlMessage {
    pub action: ControlAction,
    pub threshold_bpm: f64,
}

/// Wearable to handheld status report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryMessage {
    pub bpm: f64,
    pub is_active: bool,
}

/// Inbound command as the wearable applies it. A stop carries nothing;
/// a start may omit its threshold, in which case the current one stays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    Start { threshold_bpm: Option<f64> },
    Stop,
}

/// Inbound status report. Fields absent on the wire are `None` and leave
/// the receiver's view untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReport {
    pub bpm: f64,
    pub is_active: Option<bool>,
}

/// Result of decoding an inbound device-link message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkMessage {
    Control(ControlCommand),
    Telemetry(TelemetryReport),
    Unrecognized,
}

/// Immutable view of the wearable session published to observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_active: bool,
    pub current_heart_rate: f64,
    pub authorized: bool,
    pub threshold_bpm: f64,
    pub silent_mode: bool,
    pub last_error: Option<SessionError>,
}
