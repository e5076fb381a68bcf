//! Halos for off-screen markers
//!
//! A marker outside the visible region gets a circle centred on it whose
//! radius is just large enough for the edge to reach back into view, so the
//! visible arc hints at where the marker is and how far away it lies.

use crate::{
    core::{
        config::HaloConfig,
        geo::{LatLng, LatLngBounds},
        viewport::Viewport,
    },
    layers::marker::{Marker, MarkerId},
    platform::{CircleHandle, CircleOptions, MapPlatform},
    prelude::HashMap,
    Result,
};

/// Circle drawn for a marker outside the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halo {
    pub marker_id: MarkerId,
    /// Marker position when the halo was created
    pub center: LatLng,
    /// Meters
    pub radius: f64,
    pub circle: CircleHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Corner {
    pub fn of(&self, bounds: &LatLngBounds) -> LatLng {
        match self {
            Corner::NorthWest => bounds.north_west(),
            Corner::NorthEast => bounds.north_east,
            Corner::SouthWest => bounds.south_west,
            Corner::SouthEast => bounds.south_east(),
        }
    }
}

/// Which way a position sticks out of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Inside,
    /// Within the longitude span: above or below the viewport
    Vertical,
    /// Within the latitude span: left or right of the viewport
    Horizontal,
    /// Outside both spans, nearest to the given corner
    Corner(Corner),
}

impl Overflow {
    pub fn classify(position: &LatLng, bounds: &LatLngBounds) -> Self {
        let in_lng = bounds.contains_lng(position.lng);
        let in_lat = bounds.contains_lat(position.lat);

        match (in_lng, in_lat) {
            (true, true) => Overflow::Inside,
            (true, false) => Overflow::Vertical,
            (false, true) => Overflow::Horizontal,
            (false, false) => {
                let north = position.lat > bounds.north();
                let west = is_west_of(bounds, position.lng);
                Overflow::Corner(match (north, west) {
                    (true, true) => Corner::NorthWest,
                    (true, false) => Corner::NorthEast,
                    (false, true) => Corner::SouthWest,
                    (false, false) => Corner::SouthEast,
                })
            }
        }
    }
}

/// For a longitude outside the span, whether the west edge is the nearer one
fn is_west_of(bounds: &LatLngBounds, lng: f64) -> bool {
    let to_west_edge = (bounds.west() - lng).rem_euclid(360.0);
    let past_east_edge = (lng - bounds.east()).rem_euclid(360.0);
    to_west_edge <= past_east_edge
}

/// Radius in meters of the halo for a marker at `position`.
///
/// Vertical overflow measures along the center meridian and subtracts the
/// center-to-north-edge distance; horizontal overflow measures along the
/// center parallel and subtracts the center-to-east-edge distance; corner
/// overflow is the distance to the nearest corner. Each case adds the zoom
/// padding from [`HaloConfig::radius_offset`]. Never negative.
pub fn halo_radius<D>(position: &LatLng, viewport: &Viewport, config: &HaloConfig, distance: D) -> f64
where
    D: Fn(&LatLng, &LatLng) -> f64,
{
    let bounds = &viewport.bounds;
    let center = viewport.center();
    let offset = config.radius_offset(viewport.zoom);

    let reach = match Overflow::classify(position, bounds) {
        Overflow::Inside => return 0.0,
        Overflow::Vertical => {
            let projected = LatLng::new(position.lat, center.lng);
            let edge = LatLng::new(bounds.north(), center.lng);
            distance(&center, &projected) - distance(&center, &edge)
        }
        Overflow::Horizontal => {
            let projected = LatLng::new(center.lat, position.lng);
            let edge = LatLng::new(center.lat, bounds.east());
            distance(&center, &projected) - distance(&center, &edge)
        }
        Overflow::Corner(corner) => distance(position, &corner.of(bounds)),
    };

    (reach + offset).max(0.0)
}

/// What one [`HaloEngine::update`] pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HaloUpdate {
    pub created: usize,
    pub resized: usize,
    pub removed: usize,
}

/// Keeps one halo per off-screen marker, indexed by marker id
#[derive(Debug, Default)]
pub struct HaloEngine {
    config: HaloConfig,
    halos: HashMap<MarkerId, Halo>,
}

impl HaloEngine {
    pub fn new(config: HaloConfig) -> Self {
        Self {
            config,
            halos: HashMap::default(),
        }
    }

    pub fn config(&self) -> &HaloConfig {
        &self.config
    }

    /// Re-evaluates every marker against the viewport: halos of visible
    /// markers are removed, off-screen markers get a halo (created on first
    /// need) with a freshly computed radius. Halos of markers that no longer
    /// exist are dropped too.
    pub fn update<P>(
        &mut self,
        markers: &[Marker],
        viewport: &Viewport,
        platform: &mut P,
    ) -> Result<HaloUpdate>
    where
        P: MapPlatform + ?Sized,
    {
        let mut update = HaloUpdate::default();

        let orphaned: Vec<MarkerId> = self
            .halos
            .keys()
            .filter(|id| !markers.iter().any(|m| m.id() == **id))
            .copied()
            .collect();
        for id in orphaned {
            if self.remove(id, platform)? {
                update.removed += 1;
            }
        }

        for marker in markers {
            let id = marker.id();
            let position = marker.position();

            if viewport.contains(&position) {
                if self.remove(id, platform)? {
                    update.removed += 1;
                }
                continue;
            }

            if !self.halos.contains_key(&id) {
                let circle = platform.add_circle(&CircleOptions {
                    center: position,
                    radius: 0.0,
                    stroke_argb: self.config.stroke_argb,
                })?;
                self.halos.insert(
                    id,
                    Halo {
                        marker_id: id,
                        center: position,
                        radius: 0.0,
                        circle,
                    },
                );
                update.created += 1;
            }

            let radius = self.radius_for(&position, viewport, &*platform);
            if let Some(halo) = self.halos.get_mut(&id) {
                platform.set_circle_radius(halo.circle, radius)?;
                halo.radius = radius;
                update.resized += 1;
            }
        }

        if update.created > 0 || update.removed > 0 {
            log::debug!(
                "halos: {} created, {} removed, {} live",
                update.created,
                update.removed,
                self.halos.len()
            );
        }

        Ok(update)
    }

    /// Radius for a position, measured with the configured distance method
    /// or else the platform's own
    pub fn radius_for<P>(&self, position: &LatLng, viewport: &Viewport, platform: &P) -> f64
    where
        P: MapPlatform + ?Sized,
    {
        match self.config.distance_method {
            Some(method) => halo_radius(position, viewport, &self.config, |a, b| method.measure(a, b)),
            None => halo_radius(position, viewport, &self.config, |a, b| platform.distance(a, b)),
        }
    }

    /// Removes a marker's halo and its circle. Returns whether one existed.
    pub fn remove<P>(&mut self, id: MarkerId, platform: &mut P) -> Result<bool>
    where
        P: MapPlatform + ?Sized,
    {
        match self.halos.remove(&id) {
            Some(halo) => {
                platform.remove_circle(halo.circle)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every halo
    pub fn clear<P>(&mut self, platform: &mut P) -> Result<()>
    where
        P: MapPlatform + ?Sized,
    {
        for (_, halo) in self.halos.drain() {
            platform.remove_circle(halo.circle)?;
        }
        Ok(())
    }

    pub fn halo(&self, id: MarkerId) -> Option<&Halo> {
        self.halos.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Halo> {
        self.halos.values()
    }

    pub fn len(&self) -> usize {
        self.halos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.halos.is_empty()
    }
}
