use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::viewer::ViewerConfig;
use crate::viewport::{
    DEFAULT_APPLY_FACTOR, DEFAULT_DECAY, DEFAULT_PINCH_DEAD_ZONE, DEFAULT_PINCH_SENSITIVITY,
    DEFAULT_SETTLE_THRESHOLD, GestureConfig, MomentumConfig,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagepinch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub version: u32,

    #[serde(default = "default_decay")]
    pub momentum_decay: f64,

    #[serde(default = "default_apply_factor")]
    pub momentum_apply_factor: f64,

    /// Velocity in pixels below which momentum stops
    #[serde(default = "default_threshold")]
    pub momentum_threshold: f64,

    #[serde(default = "default_pinch_sensitivity")]
    pub pinch_sensitivity: f64,

    #[serde(default = "default_dead_zone")]
    pub pinch_dead_zone: f64,

    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,

    #[serde(default = "default_true")]
    pub use_source_cache: bool,
}

fn default_true() -> bool {
    true
}

fn default_decay() -> f64 {
    DEFAULT_DECAY
}

fn default_apply_factor() -> f64 {
    DEFAULT_APPLY_FACTOR
}

fn default_threshold() -> f64 {
    DEFAULT_SETTLE_THRESHOLD
}

fn default_pinch_sensitivity() -> f64 {
    DEFAULT_PINCH_SENSITIVITY
}

fn default_dead_zone() -> f64 {
    DEFAULT_PINCH_DEAD_ZONE
}

fn default_frame_interval() -> u64 {
    16
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            momentum_decay: default_decay(),
            momentum_apply_factor: default_apply_factor(),
            momentum_threshold: default_threshold(),
            pinch_sensitivity: default_pinch_sensitivity(),
            pinch_dead_zone: default_dead_zone(),
            frame_interval_ms: default_frame_interval(),
            use_source_cache: true,
        }
    }
}

impl Settings {
    /// Validated viewer tuning. Invalid values fall back to defaults.
    pub fn viewer_config(&self) -> ViewerConfig {
        let gesture = GestureConfig::new(self.pinch_sensitivity, self.pinch_dead_zone)
            .unwrap_or_else(|e| {
                warn!("Ignoring pinch settings: {e}");
                GestureConfig::default()
            });
        let momentum = MomentumConfig::new(
            self.momentum_decay,
            self.momentum_apply_factor,
            self.momentum_threshold,
        )
        .unwrap_or_else(|e| {
            warn!("Ignoring momentum settings: {e}");
            MomentumConfig::default()
        });
        ViewerConfig {
            gesture,
            momentum,
            page: 0,
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    load_settings_from(&path);
}

/// Load settings from `path`, creating the file with the current settings
/// when it does not exist.
pub fn load_settings_from(path: &Path) {
    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        save_settings_to_file(&get_settings(), path);
        return;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    settings.version = CURRENT_VERSION;
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let yaml = match serde_yaml::to_string(settings) {
        Ok(yaml) => yaml,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };
    let content = format!("{SETTINGS_HEADER}{yaml}");

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# pagepinch settings
#
# momentum_decay:        fraction of the pan velocity removed each frame, (0, 1]
# momentum_apply_factor: fraction of the velocity added to the offset each frame
# momentum_threshold:    velocity (px) at which the slide stops
# pinch_sensitivity:     scale change per pixel of pinch distance change
# pinch_dead_zone:       distance change (px) ignored while pinching
"#;

// Public API for accessing/modifying settings

pub fn get_settings() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn set_settings(settings: Settings) {
    if let Ok(mut global) = SETTINGS.write() {
        *global = settings;
    }
}

pub fn viewer_config() -> ViewerConfig {
    get_settings().viewer_config()
}

pub fn get_frame_interval_ms() -> u64 {
    SETTINGS
        .read()
        .map(|s| s.frame_interval_ms)
        .unwrap_or_else(|_| default_frame_interval())
}

pub fn is_source_cache_enabled() -> bool {
    SETTINGS.read().map(|s| s.use_source_cache).unwrap_or(true)
}

pub fn set_source_cache_enabled(enabled: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.use_source_cache = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_file_is_created_with_defaults() {
        set_settings(Settings::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);

        load_settings_from(&path);

        let content = fs::read_to_string(&path).unwrap();
        let saved: Settings = serde_yaml::from_str(&content).unwrap();
        assert_eq!(saved, Settings::default());
    }

    #[test]
    #[serial]
    fn partial_file_fills_defaults() {
        set_settings(Settings::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(
            &path,
            "version: 1\nmomentum_decay: 0.2\nmomentum_apply_factor: 0.1\n",
        )
        .unwrap();

        load_settings_from(&path);

        let settings = get_settings();
        assert_eq!(settings.momentum_decay, 0.2);
        assert_eq!(settings.momentum_apply_factor, 0.1);
        assert_eq!(settings.pinch_sensitivity, DEFAULT_PINCH_SENSITIVITY);
        assert_eq!(get_frame_interval_ms(), 16);
        assert!(is_source_cache_enabled());
        set_settings(Settings::default());
    }

    #[test]
    #[serial]
    fn unversioned_file_is_migrated_and_saved() {
        set_settings(Settings::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "momentum_threshold: 0.5\n").unwrap();

        load_settings_from(&path);

        let settings = get_settings();
        assert_eq!(settings.version, CURRENT_VERSION);
        assert_eq!(settings.momentum_threshold, 0.5);
        let saved: Settings = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.version, CURRENT_VERSION);
        set_settings(Settings::default());
    }

    #[test]
    #[serial]
    fn unparsable_file_keeps_current_settings() {
        let custom = Settings {
            frame_interval_ms: 33,
            ..Settings::default()
        };
        set_settings(custom.clone());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "momentum_decay: [not, a, number]\n").unwrap();

        load_settings_from(&path);

        assert_eq!(get_settings(), custom);
        set_settings(Settings::default());
    }

    #[test]
    fn invalid_tuning_falls_back_to_defaults() {
        let settings = Settings {
            momentum_decay: 1.5,
            pinch_sensitivity: -1.0,
            ..Settings::default()
        };
        let config = settings.viewer_config();
        assert_eq!(config.momentum, MomentumConfig::default());
        assert_eq!(config.gesture, GestureConfig::default());
    }

    #[test]
    fn valid_tuning_is_kept() {
        let settings = Settings {
            momentum_decay: 0.2,
            momentum_apply_factor: 0.1,
            ..Settings::default()
        };
        let config = settings.viewer_config();
        assert_eq!(config.momentum.decay(), 0.2);
        assert_eq!(config.momentum.apply_factor(), 0.1);
    }

    #[test]
    #[serial]
    fn global_accessors_follow_current_settings() {
        set_settings(Settings {
            frame_interval_ms: 33,
            momentum_decay: 0.25,
            ..Settings::default()
        });
        assert_eq!(get_frame_interval_ms(), 33);
        assert_eq!(viewer_config().momentum.decay(), 0.25);

        set_source_cache_enabled(false);
        assert!(!is_source_cache_enabled());
        set_settings(Settings::default());
        assert!(is_source_cache_enabled());
    }
}
