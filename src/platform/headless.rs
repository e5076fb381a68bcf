use crate::{
    core::{
        geo::{DistanceMethod, LatLng, Point},
        viewport::{Camera, Viewport},
    },
    input::events::MapEvent,
    layers::marker::{Marker, MarkerId},
    platform::{CircleHandle, CircleOptions, MapPlatform, MarkerOptions},
    prelude::HashMap,
    MapError, Result,
};

/// A platform call as recorded by [`HeadlessPlatform`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    AddMarker(MarkerId),
    RemoveMarker(MarkerId),
    AddCircle(CircleHandle),
    SetCircleRadius(CircleHandle, f64),
    RemoveCircle(CircleHandle),
    ShowPopup(MarkerId, String),
    HidePopup(MarkerId),
}

/// A drawn circle and its current radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub options: CircleOptions,
    pub radius: f64,
}

/// In-memory map platform: keeps a Web Mercator camera, the drawn markers,
/// circles and popup, and a log of every call made against it.
#[derive(Debug)]
pub struct HeadlessPlatform {
    camera: Camera,
    distance_method: DistanceMethod,
    markers: HashMap<MarkerId, (Marker, MarkerOptions)>,
    circles: HashMap<CircleHandle, Circle>,
    next_circle: u64,
    popup: Option<(MarkerId, String)>,
    calls: Vec<PlatformCall>,
}

impl HeadlessPlatform {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            distance_method: DistanceMethod::Geodesic,
            markers: HashMap::default(),
            circles: HashMap::default(),
            next_circle: 0,
            popup: None,
            calls: Vec::new(),
        }
    }

    pub fn with_distance_method(mut self, method: DistanceMethod) -> Self {
        self.distance_method = method;
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Moves the camera and returns the change event the widget would emit
    pub fn move_camera(&mut self, center: LatLng, zoom: f64) -> MapEvent {
        self.camera.set_center(center);
        self.camera.set_zoom(zoom);
        self.camera_event()
    }

    /// Pans by a pixel offset and returns the change event
    pub fn pan(&mut self, delta: Point) -> MapEvent {
        self.camera.pan(delta);
        self.camera_event()
    }

    fn camera_event(&self) -> MapEvent {
        MapEvent::CameraChange {
            center: self.camera.center,
            zoom: self.camera.zoom,
        }
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id).map(|(marker, _)| marker)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn circle(&self, handle: CircleHandle) -> Option<&Circle> {
        self.circles.get(&handle)
    }

    pub fn circles(&self) -> impl Iterator<Item = (&CircleHandle, &Circle)> {
        self.circles.iter()
    }

    pub fn circle_count(&self) -> usize {
        self.circles.len()
    }

    /// Marker whose popup is open, with the text shown
    pub fn popup(&self) -> Option<(MarkerId, &str)> {
        self.popup.as_ref().map(|(id, text)| (*id, text.as_str()))
    }

    pub fn calls(&self) -> &[PlatformCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

impl MapPlatform for HeadlessPlatform {
    fn visible_region(&self) -> Viewport {
        self.camera.viewport()
    }

    fn add_marker(&mut self, marker: &Marker, options: &MarkerOptions) -> Result<()> {
        self.markers.insert(marker.id(), (marker.clone(), *options));
        self.calls.push(PlatformCall::AddMarker(marker.id()));
        Ok(())
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<()> {
        self.markers
            .remove(&id)
            .ok_or_else(|| MapError::Platform(format!("no marker {id} on the map")))?;
        if matches!(self.popup, Some((open, _)) if open == id) {
            self.popup = None;
        }
        self.calls.push(PlatformCall::RemoveMarker(id));
        Ok(())
    }

    fn add_circle(&mut self, options: &CircleOptions) -> Result<CircleHandle> {
        let handle = CircleHandle(self.next_circle);
        self.next_circle += 1;
        self.circles.insert(
            handle,
            Circle {
                options: *options,
                radius: options.radius,
            },
        );
        self.calls.push(PlatformCall::AddCircle(handle));
        Ok(handle)
    }

    fn set_circle_radius(&mut self, circle: CircleHandle, radius: f64) -> Result<()> {
        let entry = self
            .circles
            .get_mut(&circle)
            .ok_or_else(|| MapError::Platform(format!("no circle {}", circle.0)))?;
        entry.radius = radius;
        self.calls.push(PlatformCall::SetCircleRadius(circle, radius));
        Ok(())
    }

    fn remove_circle(&mut self, circle: CircleHandle) -> Result<()> {
        self.circles
            .remove(&circle)
            .ok_or_else(|| MapError::Platform(format!("no circle {}", circle.0)))?;
        self.calls.push(PlatformCall::RemoveCircle(circle));
        Ok(())
    }

    fn show_popup(&mut self, id: MarkerId, text: &str) -> Result<()> {
        if !self.markers.contains_key(&id) {
            return Err(MapError::Platform(format!("no marker {id} on the map")));
        }
        // The widget shows a single info window at a time
        self.popup = Some((id, text.to_string()));
        self.calls.push(PlatformCall::ShowPopup(id, text.to_string()));
        Ok(())
    }

    fn hide_popup(&mut self, id: MarkerId) -> Result<()> {
        if matches!(self.popup, Some((open, _)) if open == id) {
            self.popup = None;
        }
        self.calls.push(PlatformCall::HidePopup(id));
        Ok(())
    }

    fn distance(&self, a: &LatLng, b: &LatLng) -> f64 {
        self.distance_method.measure(a, b)
    }
}
