//! Handheld Connector
//!
//! Operator side of the pairing: owns the threshold config, sends Control
//! commands and mirrors the wearable's Telemetry.

use crate::domain::error::ConfigError;
use crate::domain::models::{ControlAction, LinkMessage, ThresholdConfig};
use crate::infrastructure::link::protocol::{self, WireMessage};
use crate::infrastructure::link::transport::MessageObserver;
use crate::infrastructure::link::DeviceLink;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandheldSnapshot {
    pub current_heart_rate: f64,
    pub is_session_active: bool,
    pub config: ThresholdConfig,
}

#[derive(Clone)]
pub struct HandheldConnector {
    link: DeviceLink,
    state: Arc<watch::Sender<HandheldSnapshot>>,
}

impl HandheldConnector {
    /// Create the connector and register it for inbound telemetry.
    pub fn attach(link: DeviceLink, config: ThresholdConfig) -> Self {
        let (state, _) = watch::channel(HandheldSnapshot {
            current_heart_rate: 0.0,
            is_session_active: false,
            config,
        });
        let connector = Self {
            link,
            state: Arc::new(state),
        };
        connector.link.subscribe(Arc::new(connector.clone()));
        connector
    }

    pub fn snapshot(&self) -> HandheldSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HandheldSnapshot> {
        self.state.subscribe()
    }

    /// Flip the session locally and tell the wearable. The local flag is
    /// optimistic; the next telemetry is authoritative.
    pub fn toggle_session(&self) {
        let mut sent = None;
        self.state.send_modify(|s| {
            s.is_session_active = !s.is_session_active;
            let action = if s.is_session_active {
                ControlAction::Start
            } else {
                ControlAction::Stop
            };
            sent = Some((action, s.config.threshold_bpm()));
        });

        if let Some((action, threshold)) = sent {
            info!("Sending {} with threshold {} bpm", action.as_token(), threshold);
            self.link.send_control(action, threshold);
        }
    }

    pub fn set_threshold(&self, threshold_bpm: f64) -> Result<(), ConfigError> {
        let mut result = Ok(());
        self.state.send_if_modified(|s| {
            result = s.config.set_threshold(threshold_bpm);
            result.is_ok()
        });
        result
    }

    pub fn step_threshold(&self, steps: i32) {
        self.state.send_modify(|s| s.config.step(steps));
    }

    pub fn set_silent_mode(&self, silent_mode: bool) {
        self.state.send_modify(|s| s.config.silent_mode = silent_mode);
    }
}

impl MessageObserver for HandheldConnector {
    fn on_message(&self, message: WireMessage) {
        match protocol::decode(&message) {
            LinkMessage::Telemetry(telemetry) => {
                self.state.send_modify(|s| {
                    s.current_heart_rate = telemetry.bpm;
                    if let Some(active) = telemetry.is_active {
                        s.is_session_active = active;
                    }
                });
            }
            LinkMessage::Control(_) => debug!("Ignoring control message addressed to the wearable"),
            LinkMessage::Unrecognized => {}
        }
    }
}
