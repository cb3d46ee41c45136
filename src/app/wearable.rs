//! Wearable Runtime
//!
//! One tokio task owns the [`SessionController`]. Samples, inbound link
//! messages, authorization results and collection completions all arrive on
//! other contexts and are posted into that task's queue before anything
//! reads or writes session state.

use crate::domain::models::{HeartRateSample, SessionSnapshot, ThresholdConfig};
use crate::domain::session::{SessionController, SessionEffect, SessionEvent};
use crate::infrastructure::haptics::{self, HapticActuator};
use crate::infrastructure::link::protocol::{self, WireMessage};
use crate::infrastructure::link::transport::MessageObserver;
use crate::infrastructure::link::DeviceLink;
use crate::infrastructure::sensor::{AuthorizationObserver, SampleObserver, SensorSession};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Cloneable entry point into the wearable session.
///
/// Also the observer injected into each collaborator, so every callback
/// lands on the owner's queue.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn request_start(&self, threshold_bpm: f64) {
        self.post(SessionEvent::StartRequested { threshold_bpm });
    }

    pub fn request_stop(&self) {
        self.post(SessionEvent::StopRequested);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        *self.snapshot.borrow()
    }

    /// Change notifications for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    fn post(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session runtime gone, dropping {:?}", event);
        }
    }
}

impl SampleObserver for SessionHandle {
    fn on_sample(&self, bpm: f64) {
        let timestamp = tokio::time::Instant::now().into_std();
        self.post(SessionEvent::Sample(HeartRateSample::new(bpm, timestamp)));
    }
}

impl AuthorizationObserver for SessionHandle {
    fn on_authorization(&self, granted: bool) {
        self.post(SessionEvent::AuthorizationResolved { granted });
    }
}

impl MessageObserver for SessionHandle {
    fn on_message(&self, message: WireMessage) {
        self.post(SessionEvent::Inbound(protocol::decode(&message)));
    }
}

pub struct WearableRuntime {
    controller: SessionController,
    sensor: Arc<dyn SensorSession>,
    actuator: Arc<dyn HapticActuator>,
    link: DeviceLink,
    handle: SessionHandle,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl WearableRuntime {
    /// Wire the collaborators to a fresh controller and start the owner
    /// task. Must be called inside a tokio runtime.
    pub fn spawn(
        config: ThresholdConfig,
        sensor: Arc<dyn SensorSession>,
        actuator: Arc<dyn HapticActuator>,
        link: DeviceLink,
    ) -> (SessionHandle, JoinHandle<()>) {
        let controller = SessionController::new(config, sensor.is_authorized());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let handle = SessionHandle {
            events: events_tx,
            snapshot: snapshot_rx,
        };

        sensor.set_sample_observer(Arc::new(handle.clone()));
        link.subscribe(Arc::new(handle.clone()));

        let runtime = Self {
            controller,
            sensor,
            actuator,
            link,
            handle: handle.clone(),
            snapshot: snapshot_tx,
        };
        let task = tokio::spawn(runtime.run(events_rx));
        (handle, task)
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        info!(
            threshold = self.controller.config().threshold_bpm(),
            authorized = self.controller.snapshot().authorized,
            "Wearable session runtime started"
        );

        while let Some(event) = events.recv().await {
            for effect in self.controller.handle(event) {
                self.execute(effect);
            }
            self.publish();
        }

        info!("Wearable session runtime stopped");
    }

    fn execute(&self, effect: SessionEffect) {
        match effect {
            SessionEffect::RequestAuthorization => {
                let sensor = Arc::clone(&self.sensor);
                let observer: Arc<dyn AuthorizationObserver> = Arc::new(self.handle.clone());
                tokio::spawn(async move {
                    let granted = sensor.request_authorization().await;
                    observer.on_authorization(granted);
                });
            }
            SessionEffect::BeginCollection => {
                let sensor = Arc::clone(&self.sensor);
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let success = sensor.begin_collection().await;
                    handle.post(SessionEvent::CollectionStarted { success });
                });
            }
            SessionEffect::EndCollection => {
                let sensor = Arc::clone(&self.sensor);
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    sensor.end_collection().await;
                    handle.post(SessionEvent::CollectionEnded);
                });
            }
            SessionEffect::SendTelemetry(telemetry) => {
                self.link.send_telemetry(telemetry.bpm, telemetry.is_active);
            }
            SessionEffect::PlayPulses(schedule) => {
                haptics::play_schedule(&self.actuator, &schedule);
            }
        }
    }

    fn publish(&self) {
        let next = self.controller.snapshot();
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
