use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wakeme::app::{HandheldConnector, SessionHandle, WearableRuntime};
use wakeme::domain::error::SessionError;
use wakeme::domain::models::{HapticPattern, SessionState, ThresholdConfig};
use wakeme::infrastructure::haptics::HapticActuator;
use wakeme::infrastructure::link::transport::{SimEndpoint, SimLink, Transport};
use wakeme::infrastructure::link::DeviceLink;
use wakeme::infrastructure::sensor::{SimulatedSensor, SimulatedSensorConfig};

struct RecordingActuator {
    start: tokio::time::Instant,
    pulses: Mutex<Vec<Duration>>,
}

impl HapticActuator for RecordingActuator {
    fn play(&self, _pattern: HapticPattern) {
        self.pulses.lock().unwrap().push(self.start.elapsed());
    }
}

struct Pair {
    wearable: SessionHandle,
    handheld: HandheldConnector,
    sensor: Arc<SimulatedSensor>,
    actuator: Arc<RecordingActuator>,
    handheld_end: Arc<SimEndpoint>,
    wearable_end: Arc<SimEndpoint>,
}

fn pair(sensor_config: SimulatedSensorConfig, handheld_threshold: f64) -> Pair {
    let (handheld_end, wearable_end) = SimLink::pair("handheld", "wearable");
    let handheld_end = Arc::new(handheld_end);
    let wearable_end = Arc::new(wearable_end);

    let sensor = Arc::new(SimulatedSensor::new(SimulatedSensorConfig {
        response_delay: Duration::from_millis(10),
        ..sensor_config
    }));
    let actuator = Arc::new(RecordingActuator {
        start: tokio::time::Instant::now(),
        pulses: Mutex::new(Vec::new()),
    });

    let (wearable, _task) = WearableRuntime::spawn(
        ThresholdConfig::new(90.0, true).unwrap(),
        sensor.clone(),
        actuator.clone(),
        DeviceLink::new(wearable_end.clone()),
    );
    let handheld = HandheldConnector::attach(
        DeviceLink::new(handheld_end.clone()),
        ThresholdConfig::new(handheld_threshold, true).unwrap(),
    );

    Pair {
        wearable,
        handheld,
        sensor,
        actuator,
        handheld_end,
        wearable_end,
    }
}

fn authorized() -> SimulatedSensorConfig {
    SimulatedSensorConfig {
        pre_authorized: true,
        ..Default::default()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test(start_paused = true)]
async fn descending_trace_wakes_once_and_throttles() {
    let p = pair(authorized(), 90.0);
    p.handheld.toggle_session();
    settle().await;
    assert_eq!(p.wearable.snapshot().state, SessionState::Running);

    let t0 = tokio::time::Instant::now();
    p.sensor.push_sample(95.0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    p.sensor.push_sample(85.0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    p.sensor.push_sample(60.0);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let anchor = (t0 + Duration::from_secs(1)) - p.actuator.start;
    let pulses = p.actuator.pulses.lock().unwrap().clone();
    let offsets: Vec<u128> = pulses.iter().map(|d| (*d - anchor).as_millis()).collect();
    assert_eq!(offsets, vec![0, 600, 1200, 1800, 2400, 3000]);

    let view = p.handheld.snapshot();
    assert!(view.is_session_active);
    assert_eq!(view.current_heart_rate, 60.0);
}

#[tokio::test(start_paused = true)]
async fn denied_authorization_leaves_both_sides_inactive() {
    let p = pair(
        SimulatedSensorConfig {
            grant_authorization: false,
            ..Default::default()
        },
        60.0,
    );
    let mut updates = p.wearable.subscribe();

    p.handheld.toggle_session();
    assert!(p.handheld.snapshot().is_session_active);

    let mut seen_active = false;
    while tokio::time::timeout(Duration::from_secs(1), updates.changed())
        .await
        .is_ok()
    {
        seen_active |= updates.borrow_and_update().is_active;
    }

    let snapshot = p.wearable.snapshot();
    assert!(!seen_active);
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.last_error, Some(SessionError::AuthorizationDenied));
    assert!(!p.handheld.snapshot().is_session_active);
}

#[tokio::test(start_paused = true)]
async fn start_while_running_retunes_without_second_collection() {
    let p = pair(authorized(), 90.0);
    p.handheld.toggle_session();
    settle().await;
    assert_eq!(p.wearable.snapshot().threshold_bpm, 90.0);

    p.handheld.set_threshold(80.0).unwrap();
    p.handheld_end
        .send(json!({ "action": "START", "threshold": 80.0 }).as_object().cloned().unwrap());
    settle().await;

    let snapshot = p.wearable.snapshot();
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.threshold_bpm, 80.0);
    assert_eq!(p.sensor.collections_started(), 1);

    p.sensor.push_sample(85.0);
    settle().await;
    assert!(p.actuator.pulses.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_resets_wearable_and_handheld_view() {
    let p = pair(authorized(), 70.0);
    p.handheld.toggle_session();
    settle().await;
    p.sensor.push_sample(75.0);
    settle().await;
    assert_eq!(p.handheld.snapshot().current_heart_rate, 75.0);

    p.handheld.toggle_session();
    settle().await;

    let snapshot = p.wearable.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(!snapshot.is_active);
    assert_eq!(snapshot.current_heart_rate, 0.0);

    let view = p.handheld.snapshot();
    assert!(!view.is_session_active);
    assert_eq!(view.current_heart_rate, 0.0);
    assert!(!p.sensor.is_collecting());
}

#[tokio::test(start_paused = true)]
async fn unreachable_peer_drops_telemetry_quietly() {
    let p = pair(authorized(), 70.0);
    p.handheld.toggle_session();
    settle().await;
    let delivered_before = p.wearable_end.delivered();
    assert!(delivered_before > 0);

    p.handheld_end.set_in_range(false);
    p.sensor.push_sample(72.0);
    settle().await;

    let snapshot = p.wearable.snapshot();
    assert_eq!(snapshot.state, SessionState::Running);
    assert_eq!(snapshot.current_heart_rate, 72.0);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(p.handheld.snapshot().current_heart_rate, 0.0);
    assert_eq!(p.wearable_end.delivered(), delivered_before);
}

#[tokio::test(start_paused = true)]
async fn malformed_message_is_ignored() {
    let p = pair(authorized(), 70.0);
    p.handheld.toggle_session();
    settle().await;
    let before = p.wearable.snapshot();

    p.handheld_end
        .send(json!({ "foo": 1 }).as_object().cloned().unwrap());
    settle().await;

    assert_eq!(p.wearable.snapshot(), before);
}
