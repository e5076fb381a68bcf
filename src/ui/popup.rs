use crate::{
    core::config::PopupConfig,
    input::events::EventHandled,
    layers::marker::{Marker, MarkerId},
    platform::MapPlatform,
    prelude::{Duration, Instant},
    runtime::{self, AsyncHandle},
    Result,
};
use crossbeam_channel::{Receiver, Sender};

/// Message sent by a finished auto-hide timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HideRequest {
    marker_id: MarkerId,
    generation: u64,
}

/// The popup currently open on the map
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub marker_id: MarkerId,
    pub text: String,
    pub shown_at: Instant,
    /// When the popup is due to close; `None` once the hide is cancelled
    pub hide_at: Option<Instant>,
    generation: u64,
}

/// Shows marker labels in a popup and hides them again after a delay.
///
/// Each `show` sets a new deadline and cancels the previous timer, so tapping
/// again restarts the delay. Timers run on the async runtime and report back
/// over a channel; [`PopupManager::poll`] hides the popup on the caller's
/// thread once its deadline has passed on the runtime clock. A timer that
/// fires early, or one superseded by a later tap, never hides a popup.
pub struct PopupManager {
    auto_hide: Duration,
    current: Option<Popup>,
    pending_hide: Option<Box<dyn AsyncHandle>>,
    generation: u64,
    hide_tx: Sender<HideRequest>,
    hide_rx: Receiver<HideRequest>,
}

impl PopupManager {
    pub fn new(config: &PopupConfig) -> Self {
        let (hide_tx, hide_rx) = crossbeam_channel::unbounded();
        Self {
            auto_hide: config.auto_hide(),
            current: None,
            pending_hide: None,
            generation: 0,
            hide_tx,
            hide_rx,
        }
    }

    /// Shows the marker's label and (re)starts the auto-hide delay
    pub fn show<P>(&mut self, marker: &Marker, platform: &mut P) -> Result<EventHandled>
    where
        P: MapPlatform + ?Sized,
    {
        self.cancel_pending();

        if let Some(previous) = self.current.take() {
            if previous.marker_id != marker.id() {
                platform.hide_popup(previous.marker_id)?;
            }
        }

        platform.show_popup(marker.id(), marker.label())?;

        self.generation += 1;
        let request = HideRequest {
            marker_id: marker.id(),
            generation: self.generation,
        };
        let shown_at = runtime::now();
        self.current = Some(Popup {
            marker_id: marker.id(),
            text: marker.label().to_string(),
            shown_at,
            hide_at: Some(shown_at + self.auto_hide),
            generation: self.generation,
        });

        let tx = self.hide_tx.clone();
        let timer = runtime::delay(self.auto_hide).and_then(|timer| {
            runtime::spawn(async move {
                timer.await;
                // The manager may be gone by now
                let _ = tx.send(request);
            })
        });
        match timer {
            Ok(handle) => self.pending_hide = Some(handle),
            Err(e) => log::warn!(
                "no hide timer for marker {} ({}), it closes on the first poll after the delay",
                marker.id(),
                e
            ),
        }

        log::debug!("showing popup for marker {}", marker.id());
        Ok(EventHandled::Handled)
    }

    /// Hides the popup if its deadline has passed. Returns true if a popup
    /// was hidden.
    pub fn poll<P>(&mut self, platform: &mut P) -> Result<bool>
    where
        P: MapPlatform + ?Sized,
    {
        let generation = self.current.as_ref().map(|popup| popup.generation);
        while let Ok(request) = self.hide_rx.try_recv() {
            if Some(request.generation) != generation {
                log::trace!("ignoring stale hide for marker {}", request.marker_id);
            }
        }

        let now = runtime::now();
        let due = match &self.current {
            Some(popup) => popup.hide_at.is_some_and(|at| at <= now),
            None => false,
        };
        if !due {
            return Ok(false);
        }

        if let Some(popup) = self.current.take() {
            platform.hide_popup(popup.marker_id)?;
            log::debug!("auto-hid popup for marker {}", popup.marker_id);
        }
        self.pending_hide = None;
        Ok(true)
    }

    /// Hides the open popup immediately
    pub fn hide_now<P>(&mut self, platform: &mut P) -> Result<()>
    where
        P: MapPlatform + ?Sized,
    {
        self.cancel_pending();
        if let Some(popup) = self.current.take() {
            platform.hide_popup(popup.marker_id)?;
        }
        Ok(())
    }

    /// Forgets the popup of a marker that is going away
    pub fn dismiss(&mut self, marker_id: MarkerId) {
        if self.visible_marker() == Some(marker_id) {
            self.cancel_pending();
            self.current = None;
        }
    }

    /// Cancels the pending hide, leaving the popup open
    pub fn cancel(&mut self) {
        self.cancel_pending();
        if let Some(popup) = self.current.as_mut() {
            popup.hide_at = None;
        }
    }

    pub fn current(&self) -> Option<&Popup> {
        self.current.as_ref()
    }

    pub fn visible_marker(&self) -> Option<MarkerId> {
        self.current.as_ref().map(|popup| popup.marker_id)
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    /// Whether an auto-hide timer is still running
    pub fn has_pending_hide(&self) -> bool {
        self.pending_hide
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending_hide.take() {
            handle.cancel();
        }
    }
}

impl Default for PopupManager {
    fn default() -> Self {
        Self::new(&PopupConfig::default())
    }
}

impl Drop for PopupManager {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

impl std::fmt::Debug for PopupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupManager")
            .field("auto_hide", &self.auto_hide)
            .field("current", &self.current)
            .field("generation", &self.generation)
            .finish()
    }
}


#[cfg(all(test, not(feature = "tokio-runtime")))]
mod custom_runtime_tests {
    use super::*;
    use crate::{
        core::geo::LatLng,
        platform::{HeadlessPlatform, MapPlatform as _, MarkerOptions},
        prelude::{Future, Pin},
        runtime::AsyncSpawner,
    };
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    /// Runs each task on its own thread. Its timer completes straight away.
    struct ThreadSpawner;

    struct ThreadHandle(Arc<AtomicBool>);

    impl AsyncHandle for ThreadHandle {
        fn is_finished(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn cancel(&self) {}
    }

    impl AsyncSpawner for ThreadSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Result<Box<dyn AsyncHandle>> {
            let finished = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&finished);
            std::thread::spawn(move || {
                futures::executor::block_on(future);
                flag.store(true, Ordering::SeqCst);
            });
            Ok(Box::new(ThreadHandle(finished)))
        }

        fn delay(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
            Box::pin(futures::future::ready(()))
        }
    }

    #[test]
    fn test_popup_waits_for_deadline_on_custom_runtime() {
        runtime::init_runtime(Box::new(ThreadSpawner));

        let mut platform = HeadlessPlatform::default();
        let home = Marker::new(MarkerId(0), "Home", LatLng::new(12.34, 56.78));
        let options = MarkerOptions {
            alpha: 0.75,
            hue: 140.0,
            draggable: true,
        };
        platform.add_marker(&home, &options).unwrap();
        let mut popups = PopupManager::new(&PopupConfig { auto_hide_ms: 200 });

        popups.show(&home, &mut platform).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(!popups.poll(&mut platform).unwrap());
        assert_eq!(platform.popup(), Some((MarkerId(0), "Home")));

        std::thread::sleep(Duration::from_millis(250));
        assert!(popups.poll(&mut platform).unwrap());
        assert_eq!(platform.popup(), None);
    }
}
