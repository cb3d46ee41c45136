//! Heart-rate sensor session seam and a scripted simulator.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Receives raw readings on the sensor's own delivery context.
pub trait SampleObserver: Send + Sync {
    fn on_sample(&self, bpm: f64);
}

/// Receives the outcome of an authorization request.
pub trait AuthorizationObserver: Send + Sync {
    fn on_authorization(&self, granted: bool);
}

#[async_trait]
pub trait SensorSession: Send + Sync {
    /// Synchronous status check, used before the first start request.
    fn is_authorized(&self) -> bool;

    async fn request_authorization(&self) -> bool;

    /// Returns whether a collection session was created.
    async fn begin_collection(&self) -> bool;

    async fn end_collection(&self);

    fn set_sample_observer(&self, observer: Arc<dyn SampleObserver>);
}

#[derive(Debug, Clone)]
pub struct SimulatedSensorConfig {
    pub pre_authorized: bool,
    pub grant_authorization: bool,
    pub collection_succeeds: bool,
    /// Latency applied to each async completion.
    pub response_delay: Duration,
}

impl Default for SimulatedSensorConfig {
    fn default() -> Self {
        Self {
            pre_authorized: false,
            grant_authorization: true,
            collection_succeeds: true,
            response_delay: Duration::from_millis(50),
        }
    }
}

/// In-process sensor. Readings pushed while collection is inactive are
/// dropped, as a real workout session would not deliver them.
pub struct SimulatedSensor {
    config: SimulatedSensorConfig,
    authorized: AtomicBool,
    collecting: AtomicBool,
    collections_started: AtomicUsize,
    observer: Mutex<Option<Arc<dyn SampleObserver>>>,
}

impl SimulatedSensor {
    pub fn new(config: SimulatedSensorConfig) -> Self {
        Self {
            authorized: AtomicBool::new(config.pre_authorized),
            config,
            collecting: AtomicBool::new(false),
            collections_started: AtomicUsize::new(0),
            observer: Mutex::new(None),
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::SeqCst)
    }

    /// Number of collection sessions successfully created so far.
    pub fn collections_started(&self) -> usize {
        self.collections_started.load(Ordering::SeqCst)
    }

    /// Deliver one reading to the observer.
    pub fn push_sample(&self, bpm: f64) {
        if !self.is_collecting() {
            trace!("Sensor idle, dropping {} bpm", bpm);
            return;
        }
        let observer = match self.observer.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(observer) = observer {
            observer.on_sample(bpm);
        }
    }

    /// Replay `trace` in a loop, one reading per `interval`, until `length`
    /// has elapsed.
    pub async fn replay(&self, trace: &[f64], interval: Duration, length: Duration) {
        if trace.is_empty() {
            return;
        }
        let deadline = tokio::time::Instant::now() + length;
        let mut ticker = tokio::time::interval(interval);
        for bpm in trace.iter().cycle() {
            ticker.tick().await;
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            self.push_sample(*bpm);
        }
    }

    async fn respond(&self) {
        if !self.config.response_delay.is_zero() {
            tokio::time::sleep(self.config.response_delay).await;
        }
    }
}

#[async_trait]
impl SensorSession for SimulatedSensor {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn request_authorization(&self) -> bool {
        self.respond().await;
        let granted = self.config.grant_authorization;
        if granted {
            self.authorized.store(true, Ordering::SeqCst);
        }
        info!("Heart-rate authorization {}", if granted { "granted" } else { "denied" });
        granted
    }

    async fn begin_collection(&self) -> bool {
        self.respond().await;
        if !self.config.collection_succeeds {
            info!("Collection start failed");
            return false;
        }
        if !self.collecting.swap(true, Ordering::SeqCst) {
            self.collections_started.fetch_add(1, Ordering::SeqCst);
        }
        info!("Collection started");
        true
    }

    async fn end_collection(&self) {
        self.respond().await;
        self.collecting.store(false, Ordering::SeqCst);
        info!("Collection ended");
    }

    fn set_sample_observer(&self, observer: Arc<dyn SampleObserver>) {
        debug!("Sample observer registered");
        match self.observer.lock() {
            Ok(mut slot) => *slot = Some(observer),
            Err(poisoned) => *poisoned.into_inner() = Some(observer),
        }
    }
}
