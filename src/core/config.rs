//! Configuration for the map screen
//!
//! Settings are grouped by the component they tune (storage keys, marker
//! appearance, halo geometry, popup timing). A whole configuration can be
//! picked from a named profile, loaded from a JSON file, or built by hand.

use crate::{
    core::{constants, geo::DistanceMethod},
    layers::marker::MarkerId,
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigProfile {
    /// The stock look: large halo padding, one second popups
    Default,
    /// Tighter halos and quicker popups for dense marker sets
    Subtle,
    Custom(AppConfig),
}

impl ConfigProfile {
    pub fn resolve(&self) -> AppConfig {
        match self {
            Self::Default => AppConfig {
                storage: StorageConfig::default(),
                markers: MarkerConfig::default(),
                halo: HaloConfig::default(),
                popup: PopupConfig::default(),
            },
            Self::Subtle => AppConfig {
                storage: StorageConfig::default(),
                markers: MarkerConfig {
                    alpha: 0.6,
                    ..MarkerConfig::default()
                },
                halo: HaloConfig {
                    radius_offset_scale: constants::HALO_RADIUS_OFFSET_SCALE / 4.0,
                    stroke_argb: [96, 0, 200, 255],
                    ..HaloConfig::default()
                },
                popup: PopupConfig { auto_hide_ms: 600 },
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for ConfigProfile {
    fn default() -> Self {
        Self::Default
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub markers: MarkerConfig,
    pub halo: HaloConfig,
    pub popup: PopupConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let s = &self.storage;
        let keys = [
            &s.counter_key,
            &s.label_prefix,
            &s.longitude_prefix,
            &s.latitude_prefix,
        ];
        if keys.iter().any(|k| k.is_empty()) {
            return Err(MapError::Config("storage keys must not be empty".into()));
        }
        if s.label_prefix == s.longitude_prefix
            || s.label_prefix == s.latitude_prefix
            || s.longitude_prefix == s.latitude_prefix
        {
            return Err(MapError::Config(
                "storage key prefixes must be distinct".into(),
            ));
        }
        if !(self.halo.radius_offset_scale >= 0.0) {
            return Err(MapError::Config(format!(
                "halo radius_offset_scale must be non-negative, got {}",
                self.halo.radius_offset_scale
            )));
        }
        if !(self.halo.min_offset_zoom > 0.0) {
            return Err(MapError::Config(format!(
                "halo min_offset_zoom must be positive, got {}",
                self.halo.min_offset_zoom
            )));
        }
        if !(0.0..=1.0).contains(&self.markers.alpha) {
            return Err(MapError::Config(format!(
                "marker alpha must be within 0..=1, got {}",
                self.markers.alpha
            )));
        }
        Ok(())
    }
}

/// Where and under which keys marker data is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file used by the file-backed store
    pub path: PathBuf,
    pub counter_key: String,
    pub label_prefix: String,
    pub longitude_prefix: String,
    pub latitude_prefix: String,
}

impl StorageConfig {
    pub fn label_key(&self, id: MarkerId) -> String {
        format!("{}{}", self.label_prefix, id)
    }

    pub fn longitude_key(&self, id: MarkerId) -> String {
        format!("{}{}", self.longitude_prefix, id)
    }

    pub fn latitude_key(&self, id: MarkerId) -> String {
        format!("{}{}", self.latitude_prefix, id)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::PREFERENCE_FILE),
            counter_key: constants::MARKER_COUNT_KEY.to_string(),
            label_prefix: constants::MARKER_LABEL_PREFIX.to_string(),
            longitude_prefix: constants::MARKER_LONGITUDE_PREFIX.to_string(),
            latitude_prefix: constants::MARKER_LATITUDE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Label of the marker created on first launch
    pub default_label: String,
    /// Whether an empty store gets a first marker at (0, 0)
    pub seed_default_marker: bool,
    pub alpha: f32,
    pub hue: f32,
    pub draggable: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            default_label: constants::DEFAULT_MARKER_LABEL.to_string(),
            seed_default_marker: true,
            alpha: constants::MARKER_ALPHA,
            hue: constants::MARKER_HUE,
            draggable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaloConfig {
    /// Numerator of the zoom-dependent padding term, meters
    pub radius_offset_scale: f64,
    /// Zoom floor applied before squaring
    pub min_offset_zoom: f64,
    pub stroke_argb: [u8; 4],
    /// Overrides the platform's distance measure when set
    pub distance_method: Option<DistanceMethod>,
}

impl HaloConfig {
    /// Padding added to every halo radius at the given zoom
    pub fn radius_offset(&self, zoom: f64) -> f64 {
        let zoom = zoom.max(self.min_offset_zoom);
        self.radius_offset_scale / (zoom * zoom)
    }
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self {
            radius_offset_scale: constants::HALO_RADIUS_OFFSET_SCALE,
            min_offset_zoom: constants::HALO_MIN_OFFSET_ZOOM,
            stroke_argb: constants::HALO_STROKE_ARGB,
            distance_method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub auto_hide_ms: u64,
}

impl PopupConfig {
    pub fn auto_hide(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            auto_hide_ms: constants::POPUP_AUTO_HIDE_MS,
        }
    }
}
