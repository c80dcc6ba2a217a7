//! Configuration file support for yolabel.
//!
//! Settings are stored as versioned JSON, by default under the user's config
//! directory. Every field has a serde default so older or partial files load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_LABEL_NAME, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM,
    DEFAULT_PICK_RADIUS_PX, DEFAULT_ZOOM_STEP,
};
use crate::model::{Label, LabelColor, LabelId};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Labels the registry starts with
    #[serde(default = "default_labels")]
    pub labels: Vec<LabelConfig>,
}

/// User preferences section of the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Reset zoom to 1.0 whenever another image is opened
    #[serde(default = "default_true")]
    pub reset_zoom_on_image_change: bool,

    /// Run the detector after each image load
    #[serde(default)]
    pub auto_detect_on_load: bool,

    /// Minimum detector confidence, in `[0, 1]`
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Click tolerance in screen pixels
    #[serde(default = "default_pick_radius")]
    pub pick_radius_px: f64,

    /// Multiplier applied per zoom step
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_pick_radius() -> f64 {
    DEFAULT_PICK_RADIUS_PX
}

fn default_zoom_step() -> f64 {
    DEFAULT_ZOOM_STEP
}

fn default_min_zoom() -> f64 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    DEFAULT_MAX_ZOOM
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            reset_zoom_on_image_change: true,
            auto_detect_on_load: false,
            confidence_threshold: default_confidence_threshold(),
            pick_radius_px: default_pick_radius(),
            zoom_step: default_zoom_step(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            log_level: LogLevel::default(),
        }
    }
}

impl UserPreferences {
    /// Bring out-of-range values back to usable ones.
    fn sanitize(&mut self) {
        if !self.confidence_threshold.is_finite() {
            self.confidence_threshold = DEFAULT_CONFIDENCE_THRESHOLD;
        }
        self.confidence_threshold = self.confidence_threshold.clamp(0.0, 1.0);

        if !(self.pick_radius_px.is_finite() && self.pick_radius_px >= 0.0) {
            self.pick_radius_px = DEFAULT_PICK_RADIUS_PX;
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            self.zoom_step = DEFAULT_ZOOM_STEP;
        }
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            self.min_zoom = DEFAULT_MIN_ZOOM;
        }
        if !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom) {
            self.max_zoom = DEFAULT_MAX_ZOOM.max(self.min_zoom);
        }
    }
}

/// Label configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub id: LabelId,
    pub name: String,
    /// Palette colour; defaults to the colour for `id`
    #[serde(default)]
    pub color: Option<LabelColor>,
}

fn default_labels() -> Vec<LabelConfig> {
    vec![LabelConfig {
        id: 0,
        name: DEFAULT_LABEL_NAME.to_string(),
        color: Some(LabelColor::Red),
    }]
}

impl From<&Label> for LabelConfig {
    fn from(label: &Label) -> Self {
        Self {
            id: label.id,
            name: label.name.clone(),
            color: Some(label.color),
        }
    }
}

impl From<&LabelConfig> for Label {
    fn from(config: &LabelConfig) -> Self {
        let label = Label::new(config.id, config.name.clone());
        match config.color {
            Some(color) => label.with_color(color),
            None => label,
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            labels: default_labels(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.preferences.sanitize();
        Ok(config)
    }

    /// Initial labels as registry entries.
    pub fn initial_labels(&self) -> Vec<Label> {
        self.labels.iter().map(Label::from).collect()
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "yolabel-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("yolabel").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("yolabel")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
