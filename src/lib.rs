//! # halomap
//!
//! Marker map logic with off-screen halos.
//!
//! Users drop labelled markers on a map with a long press and delete them
//! by dragging. Markers that fall outside the visible region get a halo: a
//! circle centred on the marker whose radius is chosen so its arc just
//! reaches into the viewport. Tapping a marker shows its label briefly.
//!
//! Markers survive restarts through a flat [`storage::KeyValueStore`]. The
//! map widget itself stays behind the [`platform::MapPlatform`] trait.

pub mod core;
pub mod input;
pub mod layers;
pub mod platform;
pub mod prelude;
pub mod runtime;
pub mod storage;
pub mod ui;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{AppConfig, ConfigProfile, HaloConfig, MarkerConfig, PopupConfig, StorageConfig},
    geo::{DistanceMethod, LatLng, LatLngBounds, Point},
    map::MapController,
    viewport::{Camera, Viewport},
};

pub use layers::{
    halo::{halo_radius, Halo, HaloEngine, HaloUpdate},
    marker::{Marker, MarkerId, MarkerStore},
};

pub use input::{EventHandled, EventManager, MapEvent};

pub use platform::{
    CircleHandle, CircleOptions, HeadlessPlatform, MapPlatform, MarkerOptions, PlatformSource,
};

pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StoredValue, WriteBatch};

pub use ui::popup::{Popup, PopupManager};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown marker: {0}")]
    UnknownMarker(MarkerId),

    #[error("Duplicate marker: {0}")]
    DuplicateMarker(MarkerId),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Initialise `env_logger` for the library's `log` output. Safe to call more
/// than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
