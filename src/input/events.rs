use crate::core::geo::LatLng;
use crate::layers::marker::MarkerId;
use serde::{Deserialize, Serialize};

/// Events reported by the map platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    /// Long press on the map surface
    LongPress { lat_lng: LatLng },
    /// A marker was picked up
    MarkerDragStart { marker_id: MarkerId },
    /// A marker is being dragged
    MarkerDrag { marker_id: MarkerId, lat_lng: LatLng },
    /// A dragged marker was released
    MarkerDragEnd { marker_id: MarkerId },
    /// Tap on a marker
    MarkerClick { marker_id: MarkerId },
    /// The camera moved, so the visible region changed
    CameraChange { center: LatLng, zoom: f64 },
}

impl MapEvent {
    /// Listener key for this kind of event
    pub fn kind(&self) -> &'static str {
        match self {
            MapEvent::LongPress { .. } => "longpress",
            MapEvent::MarkerDragStart { .. } => "markerdragstart",
            MapEvent::MarkerDrag { .. } => "markerdrag",
            MapEvent::MarkerDragEnd { .. } => "markerdragend",
            MapEvent::MarkerClick { .. } => "markerclick",
            MapEvent::CameraChange { .. } => "camerachange",
        }
    }

    /// The marker this event targets, if any
    pub fn marker_id(&self) -> Option<MarkerId> {
        match self {
            MapEvent::MarkerDragStart { marker_id }
            | MapEvent::MarkerDrag { marker_id, .. }
            | MapEvent::MarkerDragEnd { marker_id }
            | MapEvent::MarkerClick { marker_id } => Some(*marker_id),
            _ => None,
        }
    }
}

/// Whether an event was handled. `Handled` tells the platform to skip its
/// default behaviour for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}
