use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wakeme::app::{HandheldConnector, WearableRuntime};
use wakeme::domain::settings::SettingsService;
use wakeme::infrastructure::haptics::LoggingActuator;
use wakeme::infrastructure::link::transport::SimLink;
use wakeme::infrastructure::link::DeviceLink;
use wakeme::infrastructure::logging;
use wakeme::infrastructure::sensor::{SimulatedSensor, SimulatedSensorConfig};

/// Runs both devices in-process over a simulated pairing: the handheld
/// starts a session, the wearable replays the configured heart-rate trace,
/// and the handheld stops it again.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings_service = SettingsService::new().context("Failed to load settings")?;
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {:#}", e))
        .ok();

    info!(
        "Starting WakeMe simulation with settings from {}",
        settings_service.path().display()
    );

    let (handheld_end, wearable_end) = SimLink::pair("handheld", "wearable");

    let sim = &settings.simulator;
    let sensor = Arc::new(SimulatedSensor::new(SimulatedSensorConfig {
        pre_authorized: sim.pre_authorized,
        grant_authorization: sim.grant_authorization,
        collection_succeeds: sim.collection_succeeds,
        ..Default::default()
    }));

    let (wearable, runtime_task) = WearableRuntime::spawn(
        settings.wearable_config(),
        sensor.clone(),
        Arc::new(LoggingActuator),
        DeviceLink::new(Arc::new(wearable_end)),
    );
    let handheld =
        HandheldConnector::attach(DeviceLink::new(Arc::new(handheld_end)), settings.handheld_config());

    let persist_task = tokio::spawn({
        let mut changes = handheld.subscribe();
        async move {
            while changes.changed().await.is_ok() {
                let config = changes.borrow_and_update().config;
                match settings_service.store_handheld_config(&config) {
                    Ok(true) => info!("Saved handheld threshold {} bpm", config.threshold_bpm()),
                    Ok(false) => {}
                    Err(e) => warn!("Could not save handheld settings: {:#}", e),
                }
            }
        }
    });

    handheld.toggle_session();

    // wait for the wearable to either start or give up
    let mut updates = wearable.subscribe();
    let started = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if updates.changed().await.is_err() {
                return false;
            }
            let snapshot = *updates.borrow_and_update();
            if snapshot.is_active {
                return true;
            }
            if snapshot.last_error.is_some() {
                return false;
            }
        }
    })
    .await
    .unwrap_or(false);

    if started {
        sensor
            .replay(
                &sim.heart_rate_trace,
                Duration::from_millis(sim.sample_interval_ms),
                Duration::from_secs(sim.session_length_secs),
            )
            .await;
        handheld.toggle_session();
        // let the stop round-trip and any in-flight pulses finish
        tokio::time::sleep(Duration::from_secs(4)).await;
    } else {
        warn!(
            "Session did not start: {:?}",
            wearable.snapshot().last_error
        );
    }

    info!("Wearable final state: {:?}", wearable.snapshot());
    info!("Handheld final state: {:?}", handheld.snapshot());

    persist_task.abort();
    runtime_task.abort();
    Ok(())
}
