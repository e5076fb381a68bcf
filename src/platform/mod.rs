//! The map display platform as seen from the marker and halo logic
//!
//! Rendering, gesture recognition and tile loading belong to whatever map
//! widget hosts the screen. The logic only needs the operations of
//! [`MapPlatform`]; [`HeadlessPlatform`] implements them in memory.

pub mod headless;

pub use headless::{HeadlessPlatform, PlatformCall};

use crate::{
    core::{config::MarkerConfig, geo::LatLng, viewport::Viewport},
    layers::marker::{Marker, MarkerId},
    Result,
};
use serde::{Deserialize, Serialize};

/// Platform-issued reference to a drawn circle overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircleHandle(pub u64);

/// A circle overlay to draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleOptions {
    pub center: LatLng,
    /// Meters
    pub radius: f64,
    pub stroke_argb: [u8; 4],
}

/// How a marker pin is drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerOptions {
    pub alpha: f32,
    pub hue: f32,
    /// Dragging is the delete gesture, so markers are draggable by default
    pub draggable: bool,
}

impl From<&MarkerConfig> for MarkerOptions {
    fn from(config: &MarkerConfig) -> Self {
        Self {
            alpha: config.alpha,
            hue: config.hue,
            draggable: config.draggable,
        }
    }
}

/// Operations the map widget must provide
pub trait MapPlatform {
    /// The currently visible region and zoom
    fn visible_region(&self) -> Viewport;

    fn add_marker(&mut self, marker: &Marker, options: &MarkerOptions) -> Result<()>;

    fn remove_marker(&mut self, id: MarkerId) -> Result<()>;

    fn add_circle(&mut self, options: &CircleOptions) -> Result<CircleHandle>;

    fn set_circle_radius(&mut self, circle: CircleHandle, radius: f64) -> Result<()>;

    fn remove_circle(&mut self, circle: CircleHandle) -> Result<()>;

    /// Shows the info popup of a marker with the given text
    fn show_popup(&mut self, id: MarkerId, text: &str) -> Result<()>;

    fn hide_popup(&mut self, id: MarkerId) -> Result<()>;

    /// Ground distance in meters
    fn distance(&self, a: &LatLng, b: &LatLng) -> f64 {
        a.distance_to(b)
    }
}

/// Hands out the map platform once it can be obtained. Map widgets may
/// not be ready when the screen is created, so the controller asks again on
/// every resume until one is returned.
pub trait PlatformSource<P> {
    fn obtain(&mut self) -> Option<P>;
}

impl<P, F> PlatformSource<P> for F
where
    F: FnMut() -> Option<P>,
{
    fn obtain(&mut self) -> Option<P> {
        self()
    }
}
