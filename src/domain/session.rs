//! Session Controller
//!
//! Synchronous state machine for the wearable's monitoring session. It never
//! calls a collaborator itself: every handler returns the [`SessionEffect`]s
//! the owning runtime must carry out, and asynchronous completions come back
//! in as further [`SessionEvent`]s.
//!
//! ```text
//!  Idle ──start(unauthorized)──▶ AwaitingAuthorization ──granted──▶ Starting
//!   ▲  ──start(authorized)──────────────────────────────────────────▶ │
//!   │◀──denied──────────────────────┘                                   │
//!   │◀──────────────────────────────failure─────────────────────────────┤
//!   │                                                            success│
//!   │                                                                   ▼
//!   └──collection ended── Stopping ◀──stop── Running ◀─┐ sample
//!                                                └─────┘
//! ```

use crate::domain::alert::{Decision, ThresholdAlertEngine};
use crate::domain::error::SessionError;
use crate::domain::models::{
    ControlCommand, HeartRateSample, LinkMessage, PulseSchedule, SessionSnapshot, SessionState,
    TelemetryMessage, ThresholdConfig,
};
use tracing::{debug, info, warn};

/// Inputs to the controller, already marshaled onto its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    StartRequested { threshold_bpm: f64 },
    StopRequested,
    AuthorizationResolved { granted: bool },
    CollectionStarted { success: bool },
    CollectionEnded,
    Sample(HeartRateSample),
    Inbound(LinkMessage),
}

/// Work the owner must perform on the controller's behalf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEffect {
    RequestAuthorization,
    BeginCollection,
    EndCollection,
    SendTelemetry(TelemetryMessage),
    PlayPulses(PulseSchedule),
}

pub struct SessionController {
    state: SessionState,
    config: ThresholdConfig,
    engine: ThresholdAlertEngine,
    authorized: bool,
    is_active: bool,
    current_heart_rate: f64,
    last_error: Option<SessionError>,
}

impl SessionController {
    /// `authorized` is the sensor's answer to a synchronous status check
    /// made before the first start request.
    pub fn new(config: ThresholdConfig, authorized: bool) -> Self {
        Self {
            state: SessionState::Idle,
            config,
            engine: ThresholdAlertEngine::new(),
            authorized,
            is_active: false,
            current_heart_rate: 0.0,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn engine(&self) -> &ThresholdAlertEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            is_active: self.is_active,
            current_heart_rate: self.current_heart_rate,
            authorized: self.authorized,
            threshold_bpm: self.config.threshold_bpm(),
            silent_mode: self.config.silent_mode,
            last_error: self.last_error,
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::StartRequested { threshold_bpm } => self.request_start(threshold_bpm),
            SessionEvent::StopRequested => self.request_stop(),
            SessionEvent::AuthorizationResolved { granted } => self.on_authorization(granted),
            SessionEvent::CollectionStarted { success } => self.on_collection_started(success),
            SessionEvent::CollectionEnded => self.on_collection_ended(),
            SessionEvent::Sample(sample) => self.on_sample(sample),
            SessionEvent::Inbound(message) => self.on_message(message),
        }
    }

    /// The threshold is applied whatever the current state, so a running
    /// session can be retuned without a restart.
    pub fn request_start(&mut self, threshold_bpm: f64) -> Vec<SessionEffect> {
        self.start(Some(threshold_bpm))
    }

    /// `None` starts (or keeps running) with the current threshold.
    fn start(&mut self, threshold_bpm: Option<f64>) -> Vec<SessionEffect> {
        if let Some(threshold_bpm) = threshold_bpm {
            match self.config.set_threshold(threshold_bpm) {
                Ok(()) => debug!("Threshold set to {} bpm", threshold_bpm),
                Err(e) => warn!("Ignoring threshold update: {}", e),
            }
        }

        match self.state {
            SessionState::Idle => {
                self.last_error = None;
                if self.authorized {
                    self.transition(SessionState::Starting);
                    vec![SessionEffect::BeginCollection]
                } else {
                    self.transition(SessionState::AwaitingAuthorization);
                    vec![SessionEffect::RequestAuthorization]
                }
            }
            state => {
                debug!("Start requested while {:?}, no new collection", state);
                Vec::new()
            }
        }
    }

    pub fn request_stop(&mut self) -> Vec<SessionEffect> {
        if self.state != SessionState::Running {
            debug!("Stop requested while {:?}, ignored", self.state);
            return Vec::new();
        }
        self.transition(SessionState::Stopping);
        vec![SessionEffect::EndCollection]
    }

    pub fn on_authorization(&mut self, granted: bool) -> Vec<SessionEffect> {
        if granted {
            self.authorized = true;
        }
        if self.state != SessionState::AwaitingAuthorization {
            debug!("Stale authorization result ({}) while {:?}", granted, self.state);
            return Vec::new();
        }

        if granted {
            self.transition(SessionState::Starting);
            vec![SessionEffect::BeginCollection]
        } else {
            self.fail(SessionError::AuthorizationDenied)
        }
    }

    pub fn on_collection_started(&mut self, success: bool) -> Vec<SessionEffect> {
        if self.state != SessionState::Starting {
            debug!("Stale collection start ({}) while {:?}", success, self.state);
            return Vec::new();
        }

        if success {
            self.transition(SessionState::Running);
            self.is_active = true;
            info!("Session running, threshold {} bpm", self.config.threshold_bpm());
            vec![self.telemetry()]
        } else {
            self.fail(SessionError::SessionCreationFailed)
        }
    }

    pub fn on_collection_ended(&mut self) -> Vec<SessionEffect> {
        if self.state != SessionState::Stopping {
            debug!("Collection ended while {:?}, ignored", self.state);
            return Vec::new();
        }
        self.transition(SessionState::Idle);
        self.is_active = false;
        self.current_heart_rate = 0.0;
        info!("Session ended");
        vec![self.telemetry()]
    }

    /// Samples outside `Running` are dropped: sampling is gated by the session.
    pub fn on_sample(&mut self, sample: HeartRateSample) -> Vec<SessionEffect> {
        if self.state != SessionState::Running {
            debug!("Dropping {} bpm sample while {:?}", sample.bpm(), self.state);
            return Vec::new();
        }

        self.current_heart_rate = sample.bpm();
        debug!("Heart rate: {} bpm", sample.bpm());

        let mut effects = vec![self.telemetry()];
        if let Decision::Trigger(schedule) = self.engine.evaluate(&sample, &self.config) {
            effects.push(SessionEffect::PlayPulses(schedule));
        }
        effects
    }

    pub fn on_message(&mut self, message: LinkMessage) -> Vec<SessionEffect> {
        match message {
            LinkMessage::Control(ControlCommand::Start { threshold_bpm }) => {
                self.start(threshold_bpm)
            }
            LinkMessage::Control(ControlCommand::Stop) => self.request_stop(),
            LinkMessage::Telemetry(_) => {
                debug!("Ignoring telemetry addressed to the handheld");
                Vec::new()
            }
            LinkMessage::Unrecognized => Vec::new(),
        }
    }

    /// Revert to `Idle` after a failed start attempt. The inactive status is
    /// re-sent so a handheld that toggled optimistically is corrected.
    fn fail(&mut self, error: SessionError) -> Vec<SessionEffect> {
        warn!("Session start failed: {}", error);
        self.transition(SessionState::Idle);
        self.last_error = Some(error);
        self.is_active = false;
        self.current_heart_rate = 0.0;
        vec![self.telemetry()]
    }

    fn telemetry(&self) -> SessionEffect {
        SessionEffect::SendTelemetry(TelemetryMessage {
            bpm: self.current_heart_rate,
            is_active: self.is_active,
        })
    }

    fn transition(&mut self, to: SessionState) {
        debug_assert!(
            self.state.can_transition_to(to),
            "illegal transition {:?} -> {:?}",
            self.state,
            to
        );
        debug!("Session state {:?} -> {:?}", self.state, to);
        self.state = to;
    }
}
