//! Device Link Service
//!
//! Best-effort sender on top of a [`Transport`]. Sends are fire-and-forget:
//! an unreachable peer drops the message with a local log line and nothing
//! is returned to the caller.

use crate::domain::error::LinkError;
use crate::domain::models::{ControlAction, ControlMessage, TelemetryMessage};
use crate::infrastructure::link::protocol::{self, WireMessage};
use crate::infrastructure::link::transport::{MessageObserver, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Clone)]
pub struct DeviceLink {
    transport: Arc<dyn Transport>,
    /// Outcome of the most recent reachability check.
    last_reachable: Arc<AtomicBool>,
}

impl DeviceLink {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            last_reachable: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn send_control(&self, action: ControlAction, threshold_bpm: f64) {
        let message = ControlMessage {
            action,
            threshold_bpm,
        };
        if let Err(e) = self.deliver(protocol::encode_control(&message)) {
            warn!("Control {} not sent: {}", action.as_token(), e);
        }
    }

    pub fn send_telemetry(&self, bpm: f64, is_active: bool) {
        let message = TelemetryMessage { bpm, is_active };
        if let Err(e) = self.deliver(protocol::encode_telemetry(&message)) {
            // telemetry goes out on every sample, keep this quiet
            trace!("Telemetry not sent: {}", e);
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn MessageObserver>) {
        self.transport.subscribe(observer);
    }

    pub fn last_reachable(&self) -> bool {
        self.last_reachable.load(Ordering::Relaxed)
    }

    fn deliver(&self, message: WireMessage) -> Result<(), LinkError> {
        let reachable = self.transport.is_reachable();
        self.last_reachable.store(reachable, Ordering::Relaxed);
        if !reachable {
            return Err(LinkError::TransportUnreachable);
        }
        self.transport.send(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ControlCommand, LinkMessage};
    use crate::infrastructure::link::transport::SimLink;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Decoded(Mutex<Vec<LinkMessage>>);

    impl MessageObserver for Decoded {
        fn on_message(&self, message: WireMessage) {
            self.0.lock().unwrap().push(protocol::decode(&message));
        }
    }

    #[test]
    fn test_send_control_reaches_peer() {
        let (handheld, wearable) = SimLink::pair("handheld", "wearable");
        let inbox = Arc::new(Decoded::default());
        wearable.subscribe(inbox.clone());

        let link = DeviceLink::new(Arc::new(handheld));
        link.send_control(ControlAction::Start, 72.0);

        assert!(link.last_reachable());
        assert_eq!(
            inbox.0.lock().unwrap().as_slice(),
            &[LinkMessage::Control(ControlCommand::Start {
                threshold_bpm: Some(72.0),
            })]
        );
    }

    #[test]
    fn test_unreachable_send_is_dropped() {
        let (wearable, handheld) = SimLink::pair("wearable", "handheld");
        let inbox = Arc::new(Decoded::default());
        handheld.subscribe(inbox.clone());
        wearable.set_in_range(false);

        let link = DeviceLink::new(Arc::new(wearable));
        link.send_telemetry(72.0, true);

        assert!(!link.last_reachable());
        assert!(inbox.0.lock().unwrap().is_empty());
    }
}
