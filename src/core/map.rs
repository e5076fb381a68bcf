use crate::{
    core::{config::AppConfig, geo::LatLng},
    input::{EventHandled, EventManager, MapEvent},
    layers::{
        halo::{HaloEngine, HaloUpdate},
        marker::{Marker, MarkerId, MarkerStore},
    },
    platform::{MapPlatform, MarkerOptions, PlatformSource},
    storage::KeyValueStore,
    ui::popup::PopupManager,
    MapError, Result,
};

/// The map screen: owns the markers, their halos and the label popup, and
/// routes platform events to them.
///
/// The platform may not be available when the screen is created.
/// [`MapController::on_resume`] asks the [`PlatformSource`] again until one is
/// handed out; until then events are ignored.
pub struct MapController<S, P, Src>
where
    S: KeyValueStore,
    P: MapPlatform,
    Src: PlatformSource<P>,
{
    config: AppConfig,
    source: Src,
    platform: Option<P>,
    markers: MarkerStore<S>,
    halos: HaloEngine,
    popups: PopupManager,
    events: EventManager,
    label_input: String,
    marker_options: MarkerOptions,
}

impl<S, P, Src> MapController<S, P, Src>
where
    S: KeyValueStore,
    P: MapPlatform,
    Src: PlatformSource<P>,
{
    pub fn new(store: S, source: Src, config: AppConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            markers: MarkerStore::open(store, config.storage.clone()),
            halos: HaloEngine::new(config.halo.clone()),
            popups: PopupManager::new(&config.popup),
            events: EventManager::new(),
            label_input: String::new(),
            marker_options: MarkerOptions::from(&config.markers),
            platform: None,
            source,
            config,
        })
    }

    /// Screen created. Returns whether the map is ready.
    pub fn on_create(&mut self) -> Result<bool> {
        self.set_up_map_if_needed()
    }

    /// Screen back in the foreground. Retries obtaining the platform if the
    /// earlier attempt failed.
    pub fn on_resume(&mut self) -> Result<bool> {
        self.set_up_map_if_needed()
    }

    /// Obtains the platform if none is held yet, then loads the markers,
    /// draws them and evaluates halos once.
    pub fn set_up_map_if_needed(&mut self) -> Result<bool> {
        if self.platform.is_some() {
            return Ok(true);
        }

        let Some(mut platform) = self.source.obtain() else {
            log::warn!("map platform unavailable, retrying on next resume");
            return Ok(false);
        };

        let count = self.markers.load_all(&self.config.markers)?;
        for marker in self.markers.markers() {
            platform.add_marker(marker, &self.marker_options)?;
        }

        let viewport = platform.visible_region();
        self.halos
            .update(self.markers.markers(), &viewport, &mut platform)?;

        log::info!("map ready with {} markers", count);
        self.platform = Some(platform);
        Ok(true)
    }

    /// Label given to the next marker placed by long press
    pub fn set_label_input(&mut self, text: impl Into<String>) {
        self.label_input = text.into();
    }

    pub fn label_input(&self) -> &str {
        &self.label_input
    }

    pub fn handle_event(&mut self, event: MapEvent) -> Result<EventHandled> {
        let Some(platform) = self.platform.as_mut() else {
            log::debug!("no map platform, ignoring {} event", event.kind());
            return Ok(EventHandled::NotHandled);
        };

        match event {
            MapEvent::LongPress { lat_lng } => {
                if !lat_lng.is_valid() {
                    return Err(MapError::InvalidCoordinates(format!(
                        "({}, {})",
                        lat_lng.lat, lat_lng.lng
                    )));
                }

                let label = self.label_input.clone();
                let marker = self.markers.create_marker(lat_lng, label, None, true)?;
                platform.add_marker(marker, &self.marker_options)?;

                let viewport = platform.visible_region();
                self.halos
                    .update(self.markers.markers(), &viewport, platform)?;
                Ok(EventHandled::Handled)
            }
            MapEvent::MarkerDragStart { .. } | MapEvent::MarkerDrag { .. } => {
                Ok(EventHandled::NotHandled)
            }
            MapEvent::MarkerDragEnd { marker_id } => {
                if let Err(e) = self.markers.delete_marker(marker_id) {
                    log::error!("cannot delete marker {}: {}", marker_id, e);
                    return Err(e);
                }

                self.popups.dismiss(marker_id);
                platform.remove_marker(marker_id)?;
                self.halos.remove(marker_id, platform)?;
                Ok(EventHandled::Handled)
            }
            MapEvent::MarkerClick { marker_id } => match self.markers.get(marker_id) {
                Some(marker) => self.popups.show(marker, platform),
                None => {
                    log::warn!("tap on unknown marker {}", marker_id);
                    Ok(EventHandled::NotHandled)
                }
            },
            MapEvent::CameraChange { .. } => {
                let viewport = platform.visible_region();
                self.halos
                    .update(self.markers.markers(), &viewport, platform)?;
                Ok(EventHandled::Handled)
            }
        }
    }

    /// Queues an event for the next [`MapController::pump`]
    pub fn emit(&mut self, event: MapEvent) {
        self.events.emit(event);
    }

    pub fn events_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }

    /// Handles every queued event in order. A failing event is logged and
    /// does not stop the rest. Returns how many events were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        for event in self.events.process_events() {
            let kind = event.kind();
            match self.handle_event(event) {
                Ok(EventHandled::Handled) => handled += 1,
                Ok(EventHandled::NotHandled) => {}
                Err(e) => log::error!("{} event failed: {}", kind, e),
            }
        }
        handled
    }

    /// Applies expired popup timers. Returns true if a popup was hidden.
    pub fn tick(&mut self) -> Result<bool> {
        match self.platform.as_mut() {
            Some(platform) => self.popups.poll(platform),
            None => Ok(false),
        }
    }

    /// Screen torn down: stops timers and removes all halo circles
    pub fn on_destroy(&mut self) -> Result<()> {
        match self.platform.as_mut() {
            Some(platform) => {
                self.popups.hide_now(platform)?;
                self.halos.clear(platform)?;
            }
            None => self.popups.cancel(),
        }
        log::debug!("map screen destroyed");
        Ok(())
    }

    /// Re-evaluates halos against the current visible region
    pub fn refresh_halos(&mut self) -> Result<HaloUpdate> {
        let Some(platform) = self.platform.as_mut() else {
            return Ok(HaloUpdate::default());
        };
        let viewport = platform.visible_region();
        self.halos
            .update(self.markers.markers(), &viewport, platform)
    }

    pub fn is_ready(&self) -> bool {
        self.platform.is_some()
    }

    pub fn platform(&self) -> Option<&P> {
        self.platform.as_ref()
    }

    pub fn platform_mut(&mut self) -> Option<&mut P> {
        self.platform.as_mut()
    }

    pub fn markers(&self) -> &[Marker] {
        self.markers.markers()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn marker_store(&self) -> &MarkerStore<S> {
        &self.markers
    }

    pub fn halos(&self) -> &HaloEngine {
        &self.halos
    }

    pub fn popups(&self) -> &PopupManager {
        &self.popups
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Marker nearest to a position, if any
    pub fn nearest_marker(&self, position: &LatLng) -> Option<&Marker> {
        let platform = self.platform.as_ref()?;
        self.markers.markers().iter().min_by(|a, b| {
            let da = platform.distance(position, &a.position());
            let db = platform.distance(position, &b.position());
            da.total_cmp(&db)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{geo::Point, viewport::Camera},
        platform::HeadlessPlatform,
        storage::MemoryStore,
    };

    type Controller =
        MapController<MemoryStore, HeadlessPlatform, Box<dyn FnMut() -> Option<HeadlessPlatform>>>;

    fn camera() -> Camera {
        Camera::new(LatLng::new(0.0, 0.0), 6.0, Point::new(800.0, 600.0))
    }

    fn ready(store: MemoryStore) -> Controller {
        let source: Box<dyn FnMut() -> Option<HeadlessPlatform>> =
            Box::new(|| Some(HeadlessPlatform::new(camera())));
        let mut controller = MapController::new(store, source, AppConfig::default()).unwrap();
        assert!(controller.on_create().unwrap());
        controller
    }

    #[test]
    fn test_first_start_seeds_default_marker() {
        let controller = ready(MemoryStore::new());

        assert_eq!(controller.markers().len(), 1);
        assert_eq!(controller.markers()[0].label(), "Marker");
        assert_eq!(controller.platform().unwrap().marker_count(), 1);
    }

    #[test]
    fn test_long_press_places_labelled_marker() {
        let mut controller = ready(MemoryStore::new());
        controller.set_label_input("Home");

        let handled = controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(1.0, 2.0),
            })
            .unwrap();

        assert_eq!(handled, EventHandled::Handled);
        let marker = controller.marker(MarkerId(1)).unwrap();
        assert_eq!(marker.label(), "Home");
        assert!(controller.platform().unwrap().marker(MarkerId(1)).is_some());
    }

    #[test]
    fn test_long_press_outside_view_gets_halo() {
        let mut controller = ready(MemoryStore::new());

        controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(40.0, 0.0),
            })
            .unwrap();

        assert!(controller.halos().halo(MarkerId(1)).is_some());
        assert!(controller.halos().halo(MarkerId(0)).is_none());
    }

    #[test]
    fn test_invalid_long_press_is_rejected() {
        let mut controller = ready(MemoryStore::new());
        let result = controller.handle_event(MapEvent::LongPress {
            lat_lng: LatLng::new(95.0, 0.0),
        });
        assert!(matches!(result, Err(MapError::InvalidCoordinates(_))));
        assert_eq!(controller.markers().len(), 1);
    }

    #[test]
    fn test_drag_end_deletes_marker_and_halo() {
        let mut controller = ready(MemoryStore::new());
        controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(40.0, 0.0),
            })
            .unwrap();

        controller
            .handle_event(MapEvent::MarkerDragEnd {
                marker_id: MarkerId(1),
            })
            .unwrap();

        assert!(controller.marker(MarkerId(1)).is_none());
        assert!(controller.halos().is_empty());
        let platform = controller.platform().unwrap();
        assert!(platform.marker(MarkerId(1)).is_none());
        assert_eq!(platform.circle_count(), 0);
    }

    #[test]
    fn test_drag_end_on_unknown_marker_is_an_error() {
        let mut controller = ready(MemoryStore::new());
        let result = controller.handle_event(MapEvent::MarkerDragEnd {
            marker_id: MarkerId(42),
        });
        assert!(matches!(result, Err(MapError::UnknownMarker(MarkerId(42)))));
    }

    #[test]
    fn test_drag_progress_is_ignored() {
        let mut controller = ready(MemoryStore::new());
        let handled = controller
            .handle_event(MapEvent::MarkerDrag {
                marker_id: MarkerId(0),
                lat_lng: LatLng::new(3.0, 3.0),
            })
            .unwrap();
        assert_eq!(handled, EventHandled::NotHandled);
        assert_eq!(controller.markers()[0].position(), LatLng::new(0.0, 0.0));
    }

    #[test]
    fn test_camera_change_updates_halos() {
        let mut controller = ready(MemoryStore::new());
        controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(0.0, 2.0),
            })
            .unwrap();
        assert!(controller.halos().is_empty());

        let event = controller
            .platform_mut()
            .unwrap()
            .move_camera(LatLng::new(0.0, 60.0), 6.0);
        controller.handle_event(event).unwrap();

        assert_eq!(controller.halos().len(), 2);
    }

    #[test]
    fn test_unavailable_platform_retries_on_resume() {
        let mut attempts = 0;
        let source = move || {
            attempts += 1;
            (attempts > 1).then(|| HeadlessPlatform::new(camera()))
        };
        let mut controller: MapController<_, HeadlessPlatform, _> =
            MapController::new(MemoryStore::new(), source, AppConfig::default()).unwrap();

        assert!(!controller.on_create().unwrap());
        let ignored = controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(1.0, 1.0),
            })
            .unwrap();
        assert_eq!(ignored, EventHandled::NotHandled);
        assert!(controller.markers().is_empty());

        assert!(controller.on_resume().unwrap());
        assert!(controller.is_ready());
        assert_eq!(controller.markers().len(), 1);
    }

    #[test]
    fn test_pump_handles_queued_events() {
        let mut controller = ready(MemoryStore::new());
        controller.emit(MapEvent::LongPress {
            lat_lng: LatLng::new(1.0, 1.0),
        });
        controller.emit(MapEvent::MarkerDragEnd {
            marker_id: MarkerId(9),
        });
        controller.emit(MapEvent::LongPress {
            lat_lng: LatLng::new(2.0, 2.0),
        });

        assert_eq!(controller.pump(), 2);
        assert_eq!(controller.markers().len(), 3);
    }

    #[test]
    fn test_nearest_marker() {
        let mut controller = ready(MemoryStore::new());
        controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(10.0, 10.0),
            })
            .unwrap();

        let nearest = controller.nearest_marker(&LatLng::new(9.0, 9.0)).unwrap();
        assert_eq!(nearest.id(), MarkerId(1));
    }

    #[test]
    fn test_listeners_see_pumped_events() {
        use std::sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        };

        let mut controller = ready(MemoryStore::new());
        let presses = Arc::new(AtomicUsize::new(0));
        let counter = presses.clone();
        controller.events_mut().on("longpress", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        controller.emit(MapEvent::LongPress {
            lat_lng: LatLng::new(1.0, 1.0),
        });
        controller.pump();

        assert_eq!(presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_halos_without_event() {
        let mut controller = ready(MemoryStore::new());
        controller
            .platform_mut()
            .unwrap()
            .move_camera(LatLng::new(0.0, 60.0), 6.0);

        let update = controller.refresh_halos().unwrap();
        assert_eq!(update.created, 1);
        assert_eq!(controller.halos().len(), 1);
    }

    #[test]
    fn test_destroy_clears_halos() {
        let mut controller = ready(MemoryStore::new());
        controller
            .handle_event(MapEvent::LongPress {
                lat_lng: LatLng::new(40.0, 0.0),
            })
            .unwrap();
        assert_eq!(controller.platform().unwrap().circle_count(), 1);

        controller.on_destroy().unwrap();
        assert!(controller.halos().is_empty());
        assert_eq!(controller.platform().unwrap().circle_count(), 0);
    }
}
