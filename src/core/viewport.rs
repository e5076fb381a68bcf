use crate::core::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, TILE_SIZE};
use crate::core::geo::{LatLng, LatLngBounds, Point, EARTH_RADIUS};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The visible region of the map: the geographic rectangle on screen and the
/// zoom it is shown at. This is what the map platform reports after every
/// camera change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: LatLngBounds,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bounds: LatLngBounds, zoom: f64) -> Self {
        Self { bounds, zoom }
    }

    pub fn center(&self) -> LatLng {
        self.bounds.center()
    }

    pub fn contains(&self, point: &LatLng) -> bool {
        self.bounds.contains(point)
    }
}

impl From<&Camera> for Viewport {
    fn from(camera: &Camera) -> Self {
        Self::new(camera.bounds(), camera.zoom)
    }
}

/// Camera over a Web Mercator map: center, zoom and screen size in pixels.
///
/// Real map platforms keep their own camera; this one backs the headless
/// platform and lets callers derive the visible region without a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the screen in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Camera {
    /// Creates a new camera
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center,
            zoom: zoom.clamp(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
            size,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }

    /// Sets the center, clamping latitude and wrapping longitude
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(LatLng::clamp_lat(center.lat), LatLng::wrap_lng(center.lng));
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Projects a LatLng to world pixel coordinates at the current zoom
    pub fn project(&self, lat_lng: &LatLng) -> Point {
        let scale = TILE_SIZE as f64 * 2_f64.powf(self.zoom);
        let mercator = lat_lng.to_mercator();

        // Mercator meters to [0, 1] world space, y pointing down
        let world = 2.0 * PI * EARTH_RADIUS;
        let pixel_x = (mercator.x + PI * EARTH_RADIUS) / world * scale;
        let pixel_y = (-mercator.y + PI * EARTH_RADIUS) / world * scale;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng at the current zoom
    pub fn unproject(&self, pixel: &Point) -> LatLng {
        let scale = TILE_SIZE as f64 * 2_f64.powf(self.zoom);
        let world = 2.0 * PI * EARTH_RADIUS;

        let x = (pixel.x / scale) * world - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / scale) * world;

        let lat_lng = LatLng::from_mercator(Point::new(x, y));
        LatLng::new(lat_lng.lat, LatLng::wrap_lng(lat_lng.lng))
    }

    /// Converts screen pixel coordinates to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let half = self.size.multiply(0.5);
        let origin = self.project(&self.center).subtract(&half);
        self.unproject(&origin.add(pixel))
    }

    /// Converts a geographical coordinate to screen pixel coordinates
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let half = self.size.multiply(0.5);
        let origin = self.project(&self.center).subtract(&half);
        self.project(lat_lng).subtract(&origin)
    }

    /// Pans the camera by a pixel offset (positive x moves the view east,
    /// positive y moves it south)
    pub fn pan(&mut self, delta: Point) {
        let center_pixel = self.project(&self.center).add(&delta);
        let new_center = self.unproject(&center_pixel);
        self.set_center(new_center);
    }

    /// Gets the visible bounds in geographical coordinates. A screen at least
    /// as wide as the world shows every longitude.
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&self.size);

        let world_width = TILE_SIZE as f64 * 2_f64.powf(self.zoom);
        let (west, east) = if self.size.x >= world_width {
            (-180.0, 180.0)
        } else {
            (nw.lng, se.lng)
        };

        LatLngBounds::new(LatLng::new(se.lat, west), LatLng::new(nw.lat, east))
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from(self)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 2.0, Point::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(LatLng::new(40.7128, -74.0060), 10.0, Point::new(800.0, 600.0));

        assert_eq!(camera.zoom, 10.0);
        assert_eq!(camera.center.lat, 40.7128);
        assert_eq!(camera.size.x, 800.0);
    }

    #[test]
    fn test_coordinate_conversion() {
        let camera = Camera::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let center_lat_lng = camera.pixel_to_lat_lng(&Point::new(256.0, 256.0));

        assert!(center_lat_lng.lat.abs() < 0.01);
        assert!(center_lat_lng.lng.abs() < 0.01);

        let pixel = camera.lat_lng_to_pixel(&LatLng::new(0.0, 0.0));
        assert!((pixel.x - 256.0).abs() < 1e-6);
        assert!((pixel.y - 256.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_limits() {
        let mut camera = Camera::default();
        camera.set_zoom_limits(2.0, 15.0);

        camera.set_zoom(1.0);
        assert_eq!(camera.zoom, 2.0);

        camera.set_zoom(20.0);
        assert_eq!(camera.zoom, 15.0);
    }

    #[test]
    fn test_bounds_surround_center() {
        let camera = Camera::new(LatLng::new(48.8566, 2.3522), 12.0, Point::new(1024.0, 768.0));
        let viewport = camera.viewport();

        assert!(viewport.contains(&camera.center));
        assert!(viewport.bounds.south() < camera.center.lat);
        assert!(viewport.bounds.north() > camera.center.lat);
        assert!(viewport.bounds.west() < camera.center.lng);
        assert!(viewport.bounds.east() > camera.center.lng);
        assert_eq!(viewport.zoom, 12.0);
    }

    #[test]
    fn test_pan_moves_bounds_east() {
        let mut camera = Camera::new(LatLng::new(0.0, 0.0), 5.0, Point::new(512.0, 512.0));
        let before = camera.bounds();

        camera.pan(Point::new(256.0, 0.0));
        let after = camera.bounds();

        assert!(camera.center.lng > 0.0);
        assert!(after.west() > before.west());
        assert!((camera.center.lat).abs() < 1e-9);
    }

    #[test]
    fn test_low_zoom_bounds_cover_the_world() {
        // 800px is wider than the 512px world at zoom 1
        let camera = Camera::new(LatLng::new(0.0, 0.0), 1.0, Point::new(800.0, 600.0));
        let bounds = camera.bounds();

        assert!(!bounds.crosses_antimeridian());
        assert_eq!(bounds.lng_span(), 360.0);
        assert!(camera.viewport().contains(&camera.center));
        assert!(camera.viewport().contains(&LatLng::new(10.0, 179.0)));
        assert!(camera.viewport().contains(&LatLng::new(-10.0, -179.0)));

        let exact = Camera::new(LatLng::new(20.0, 100.0), 1.0, Point::new(512.0, 512.0));
        assert!(exact.viewport().contains(&exact.center));
    }
}
