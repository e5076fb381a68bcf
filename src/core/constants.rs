//! Engine-wide magic numbers and default storage key names.
//! Keeping them in a single place makes them easier to tweak.

/// Square tile size in pixels used by the Web Mercator camera.
pub const TILE_SIZE: u32 = 256;

/// Zoom range accepted by the camera.
pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 21.0;

/// Numerator of the halo padding term `scale / zoom²`, in meters.
/// Empirical visual tuning, not derived from anything.
pub const HALO_RADIUS_OFFSET_SCALE: f64 = 1_000_000.0;

/// Zoom floor used before squaring in the halo padding term.
pub const HALO_MIN_OFFSET_ZOOM: f64 = 1.0;

/// Halo stroke color as ARGB.
pub const HALO_STROKE_ARGB: [u8; 4] = [128, 0, 255, 128];

/// How long a marker label popup stays open.
pub const POPUP_AUTO_HIDE_MS: u64 = 1000;

/// Marker appearance defaults.
pub const MARKER_ALPHA: f32 = 0.75;
pub const MARKER_HUE: f32 = 140.0;

/// Label given to the marker seeded on first launch.
pub const DEFAULT_MARKER_LABEL: &str = "Marker";

/// File backing the JSON key-value store.
pub const PREFERENCE_FILE: &str = "BUW_Maps_Shared_Preferences.json";

/// Key holding the number of marker ids ever assigned.
pub const MARKER_COUNT_KEY: &str = "Marker_Counter";

/// Per-marker key prefixes; the marker id is appended.
pub const MARKER_LABEL_PREFIX: &str = "Marker_Label";
pub const MARKER_LONGITUDE_PREFIX: &str = "Marker_Longitude";
pub const MARKER_LATITUDE_PREFIX: &str = "Marker_Latitude";

/// Separator between id and label in labels written by older releases,
/// which stored `"<id>#-#<label>"` in the label key.
pub const LEGACY_ID_SEPARATOR: &str = "#-#";
