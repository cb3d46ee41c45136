//! Transport seam between the two paired devices, plus an in-process
//! paired simulator.

use crate::infrastructure::link::protocol::WireMessage;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Callback side of the transport. Implementations must not block: they
/// are invoked on the transport's own delivery context.
pub trait MessageObserver: Send + Sync {
    fn on_message(&self, message: WireMessage);
}

/// Reachability-gated, best-effort channel to the paired peer.
pub trait Transport: Send + Sync {
    fn is_reachable(&self) -> bool;

    /// No delivery guarantee and no acknowledgement.
    fn send(&self, message: WireMessage);

    /// Register the receiver for inbound messages, replacing any previous one.
    fn subscribe(&self, observer: Arc<dyn MessageObserver>);
}

type ObserverSlot = Arc<Mutex<Option<Arc<dyn MessageObserver>>>>;

/// One end of a simulated pairing.
pub struct SimEndpoint {
    name: &'static str,
    /// Shared by both ends; models the radio being in range.
    in_range: Arc<AtomicBool>,
    inbox: ObserverSlot,
    peer_inbox: ObserverSlot,
    delivered: Arc<AtomicUsize>,
}

pub struct SimLink;

impl SimLink {
    /// Create two connected endpoints, in range from the start.
    pub fn pair(a: &'static str, b: &'static str) -> (SimEndpoint, SimEndpoint) {
        let in_range = Arc::new(AtomicBool::new(true));
        let inbox_a: ObserverSlot = Arc::new(Mutex::new(None));
        let inbox_b: ObserverSlot = Arc::new(Mutex::new(None));

        let end_a = SimEndpoint {
            name: a,
            in_range: Arc::clone(&in_range),
            inbox: Arc::clone(&inbox_a),
            peer_inbox: Arc::clone(&inbox_b),
            delivered: Arc::new(AtomicUsize::new(0)),
        };
        let end_b = SimEndpoint {
            name: b,
            in_range,
            inbox: inbox_b,
            peer_inbox: inbox_a,
            delivered: Arc::new(AtomicUsize::new(0)),
        };
        (end_a, end_b)
    }
}

impl SimEndpoint {
    pub fn set_in_range(&self, in_range: bool) {
        self.in_range.store(in_range, Ordering::SeqCst);
    }

    /// Messages this endpoint has handed to its peer.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    fn peer_observer(&self) -> Option<Arc<dyn MessageObserver>> {
        match self.peer_inbox.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Transport for SimEndpoint {
    /// Reachable only while in range and the peer is listening.
    fn is_reachable(&self) -> bool {
        self.in_range.load(Ordering::SeqCst) && self.peer_observer().is_some()
    }

    fn send(&self, message: WireMessage) {
        if !self.in_range.load(Ordering::SeqCst) {
            trace!("[{}] out of range, frame lost", self.name);
            return;
        }
        if let Some(observer) = self.peer_observer() {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            observer.on_message(message);
        }
    }

    fn subscribe(&self, observer: Arc<dyn MessageObserver>) {
        match self.inbox.lock() {
            Ok(mut slot) => *slot = Some(observer),
            Err(poisoned) => *poisoned.into_inner() = Some(observer),
        }
    }
}
