use crate::domain::models::ThresholdConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How often the log file rolls over to a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Minutely,
    Never,
}

/// Where log output goes and how it is decorated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// An `EnvFilter` directive such as `info` or `wakeme=debug,warn`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub console: bool,
    pub file: bool,
    /// Created on startup when file output is on.
    pub log_dir: String,
    pub file_name_prefix: String,
    pub rotation: LogRotation,
    pub source_location: bool,
    pub thread_ids: bool,
    pub target: bool,
    /// Console only; the file layer never writes escape codes.
    pub ansi: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            file: true,
            log_dir: "logs".to_string(),
            file_name_prefix: "wakeme".to_string(),
            rotation: LogRotation::Daily,
            source_location: true,
            thread_ids: false,
            target: true,
            ansi: true,
        }
    }
}

/// Knobs for the in-process simulation harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorSettings {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Replayed in a loop while the session collects.
    #[serde(default = "default_heart_rate_trace")]
    pub heart_rate_trace: Vec<f64>,
    #[serde(default = "default_session_length_secs")]
    pub session_length_secs: u64,
    #[serde(default = "default_false")]
    pub pre_authorized: bool,
    #[serde(default = "default_true")]
    pub grant_authorization: bool,
    #[serde(default = "default_true")]
    pub collection_succeeds: bool,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            heart_rate_trace: default_heart_rate_trace(),
            session_length_secs: default_session_length_secs(),
            pre_authorized: default_false(),
            grant_authorization: default_true(),
            collection_succeeds: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_sample_interval_ms() -> u64 {
    1000
}
fn default_heart_rate_trace() -> Vec<f64> {
    vec![72.0, 70.0, 0.0, 66.0, 61.0, 58.0, 55.0, 57.0, 54.0, 62.0]
}
fn default_session_length_secs() -> u64 {
    15
}
fn default_handheld_threshold() -> f64 {
    60.0
}
fn default_wearable_threshold() -> f64 {
    90.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Threshold the handheld sends with each Start command.
    #[serde(default = "default_handheld_threshold")]
    pub handheld_threshold_bpm: f64,
    #[serde(default = "default_true")]
    pub silent_mode: bool,
    /// Threshold the wearable uses until the first Start arrives.
    #[serde(default = "default_wearable_threshold")]
    pub wearable_threshold_bpm: f64,

    #[serde(default)]
    pub log_settings: LogSettings,

    #[serde(default)]
    pub simulator: SimulatorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            handheld_threshold_bpm: default_handheld_threshold(),
            silent_mode: default_true(),
            wearable_threshold_bpm: default_wearable_threshold(),
            log_settings: LogSettings::default(),
            simulator: SimulatorSettings::default(),
        }
    }
}

impl Settings {
    /// Hand-edited files may hold anything, so both thresholds are snapped
    /// back onto the valid grid.
    pub fn handheld_config(&self) -> ThresholdConfig {
        ThresholdConfig::snapped(self.handheld_threshold_bpm, self.silent_mode)
    }

    pub fn wearable_config(&self) -> ThresholdConfig {
        ThresholdConfig::snapped(self.wearable_threshold_bpm, self.silent_mode)
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::load_from(settings_path))
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!("Using default settings ({}): {}", settings_path.display(), e);
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("WakeMe");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Record the handheld's threshold and silent mode, writing the file
    /// only when something changed. Returns whether it was written.
    pub fn store_handheld_config(&mut self, config: &ThresholdConfig) -> anyhow::Result<bool> {
        let unchanged = self.settings.handheld_threshold_bpm == config.threshold_bpm()
            && self.settings.silent_mode == config.silent_mode;
        if unchanged {
            return Ok(false);
        }
        self.settings.handheld_threshold_bpm = config.threshold_bpm();
        self.settings.silent_mode = config.silent_mode;
        self.save()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettingsService::load_from(dir.path().join("settings.json"));
        assert_eq!(service.get().handheld_threshold_bpm, 60.0);
        assert_eq!(service.get().wearable_threshold_bpm, 90.0);
        assert!(service.get().silent_mode);
    }

    #[test]
    fn test_handheld_config_is_saved_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut service = SettingsService::load_from(path.clone());
        let mut config = service.get().handheld_config();
        assert!(!service.store_handheld_config(&config).unwrap());
        assert!(!path.exists());

        config.step(3);
        config.silent_mode = false;
        assert!(service.store_handheld_config(&config).unwrap());

        let reloaded = SettingsService::load_from(path);
        assert_eq!(reloaded.get().handheld_threshold_bpm, 75.0);
        assert!(!reloaded.get().silent_mode);
        assert_eq!(reloaded.get().wearable_threshold_bpm, 90.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "silent_mode": false, "simulator": { "pre_authorized": true } }"#)
            .unwrap();

        let service = SettingsService::load_from(path);
        let settings = service.get();
        assert!(!settings.silent_mode);
        assert!(settings.simulator.pre_authorized);
        assert_eq!(settings.simulator.sample_interval_ms, 1000);
        assert_eq!(settings.log_settings.file_name_prefix, "wakeme");
    }

    #[test]
    fn test_log_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "log_settings": { "level": "debug", "file": false, "rotation": "hourly" } }"#,
        )
        .unwrap();

        let log = SettingsService::load_from(path).get().log_settings.clone();
        assert_eq!(log.level, "debug");
        assert!(!log.file);
        assert!(log.console);
        assert_eq!(log.rotation, LogRotation::Hourly);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let service = SettingsService::load_from(path);
        assert_eq!(service.get().handheld_threshold_bpm, 60.0);
    }
}
