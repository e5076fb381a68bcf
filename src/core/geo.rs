use geo::{GeodesicDistance, HaversineDistance};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Web Mercator projection constants
pub(crate) const EARTH_RADIUS: f64 = 6378137.0;
pub(crate) const MAX_LATITUDE: f64 = 85.0511287798;

/// How ground distances between two coordinates are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMethod {
    /// Geodesic distance on the WGS84 ellipsoid (Karney)
    #[default]
    Geodesic,
    /// Great-circle distance on a sphere of mean earth radius
    Haversine,
}

impl DistanceMethod {
    /// Distance in meters between two coordinates
    pub fn measure(&self, a: &LatLng, b: &LatLng) -> f64 {
        match self {
            Self::Geodesic => a.to_geo().geodesic_distance(&b.to_geo()),
            Self::Haversine => a.to_geo().haversine_distance(&b.to_geo()),
        }
    }
}

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Geodesic distance in meters to another coordinate
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        DistanceMethod::Geodesic.measure(self, other)
    }

    /// Great-circle distance in meters, spherical earth
    pub fn haversine_distance_to(&self, other: &LatLng) -> f64 {
        DistanceMethod::Haversine.measure(self, other)
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Clamps latitude to the Web Mercator range
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Converts to Web Mercator projection (EPSG:3857)
    pub fn to_mercator(&self) -> Point {
        let lat = Self::clamp_lat(self.lat);
        let x = self.lng.to_radians() * EARTH_RADIUS;
        let y = ((PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;
        Point::new(x, y)
    }

    /// Creates LatLng from Web Mercator coordinates
    pub fn from_mercator(point: Point) -> Self {
        let lng = (point.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Self::new(lat, lng)
    }

    // geo uses x = longitude, y = latitude
    fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a bounding box of geographical coordinates.
///
/// A box whose south-west longitude is greater than its north-east longitude
/// spans the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north(), self.west())
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south(), self.east())
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west() > self.east()
    }

    /// Whether a latitude falls within the south/north span (inclusive)
    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.south() && lat <= self.north()
    }

    /// Whether a longitude falls within the west/east span (inclusive)
    pub fn contains_lng(&self, lng: f64) -> bool {
        if self.crosses_antimeridian() {
            lng >= self.west() || lng <= self.east()
        } else {
            lng >= self.west() && lng <= self.east()
        }
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        self.contains_lat(point.lat) && self.contains_lng(point.lng)
    }

    /// Longitude width in degrees, always positive
    pub fn lng_span(&self) -> f64 {
        let span = self.east() - self.west();
        if span < 0.0 {
            span + 360.0
        } else {
            span
        }
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south() + self.north()) / 2.0,
            LatLng::wrap_lng(self.west() + self.lng_span() / 2.0),
        )
    }
}
