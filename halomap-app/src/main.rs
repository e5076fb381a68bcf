use anyhow::Context;
use halomap::{
    core::{
        config::{AppConfig, ConfigProfile},
        geo::{LatLng, Point},
        viewport::Camera,
    },
    platform::HeadlessPlatform,
    storage::JsonFileStore,
    MapController, MapEvent,
};
use std::time::Duration;

/// Runs a scripted session against the headless platform: the map comes up
/// late, markers are placed, the camera moves away, a marker is tapped and
/// the last marker is dragged off.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    halomap::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => ConfigProfile::Default.resolve(),
    };

    let store = JsonFileStore::open(&config.storage.path)
        .with_context(|| format!("opening {}", config.storage.path.display()))?;

    // The widget is not ready on the first attempt
    let mut attempts = 0;
    let source = move || {
        attempts += 1;
        (attempts > 1).then(|| {
            HeadlessPlatform::new(Camera::new(
                LatLng::new(50.9795, 11.3235),
                12.0,
                Point::new(1080.0, 1920.0),
            ))
        })
    };

    let mut controller: MapController<_, HeadlessPlatform, _> =
        MapController::new(store, source, config)?;

    if !controller.on_create()? {
        log::info!("map not ready yet, resuming");
        controller.on_resume()?;
    }
    log::info!("{} markers restored", controller.markers().len());

    for (label, lat_lng) in [
        ("Library", LatLng::new(50.9745, 11.3290)),
        ("Station", LatLng::new(50.9870, 11.3265)),
    ] {
        controller.set_label_input(label);
        controller.emit(MapEvent::LongPress { lat_lng });
    }
    controller.pump();

    if let Some(platform) = controller.platform_mut() {
        let event = platform.pan(Point::new(2000.0, 0.0));
        controller.emit(event);
    }
    controller.pump();

    for halo in controller.halos().iter() {
        log::info!(
            "halo for marker {} with radius {:.0} m",
            halo.marker_id,
            halo.radius
        );
    }

    if let Some(marker) = controller.markers().last() {
        let marker_id = marker.id();
        controller.handle_event(MapEvent::MarkerClick { marker_id })?;
        log::info!("popup open: {:?}", controller.popups().visible_marker());

        tokio::time::sleep(Duration::from_millis(1200)).await;
        if controller.tick()? {
            log::info!("popup hidden");
        }

        controller.handle_event(MapEvent::MarkerDragEnd { marker_id })?;
        log::info!("deleted marker {}", marker_id);
    }

    log::info!(
        "{} markers stored, next id {}",
        controller.markers().len(),
        controller.marker_store().next_id()
    );

    controller.on_destroy()?;
    Ok(())
}
