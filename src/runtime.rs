//! Runtime abstraction layer for async operations
//!
//! Deferred work (such as hiding a popup after a delay) is spawned through
//! [`AsyncSpawner`] so the library does not hard-wire one async runtime.

use crate::{
    prelude::{Duration, Future, Instant, Pin},
    MapError, Result,
};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Result<Box<dyn AsyncHandle>>;

    /// A future that completes once `duration` has elapsed on this runtime's
    /// clock
    fn delay(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Spawns a future on the installed runtime
pub fn spawn<F>(future: F) -> Result<Box<dyn AsyncHandle>>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime()?.spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::task::JoinHandle;

        /// Spawns onto the tokio runtime the caller is running in
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Result<Box<dyn AsyncHandle>> {
                let runtime = ::tokio::runtime::Handle::try_current()
                    .map_err(|e| MapError::Runtime(e.to_string()))?;
                let handle = runtime.spawn(future);
                Ok(Box::new(TokioHandle(handle)))
            }

            fn delay(
                &self,
                duration: Duration,
            ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
                // Built inside the task so no runtime is needed here
                Box::pin(async move { ::tokio::time::sleep(duration).await })
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }
}

/// Timer future from the installed runtime
pub fn delay(duration: Duration) -> Result<Pin<Box<dyn Future<Output = ()> + Send + 'static>>> {
    Ok(runtime()?.delay(duration))
}

/// Current time on the clock timers run against. Under tokio this follows
/// the runtime clock, so a paused test clock is honoured.
pub fn now() -> Instant {
    #[cfg(feature = "tokio-runtime")]
    {
        ::tokio::time::Instant::now().into_std()
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        Instant::now()
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Installs a spawner. Only the first call has an effect.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::debug!("runtime already initialised, keeping the existing spawner");
    }
}

/// Get the global runtime spawner, installing the default one if needed
pub fn runtime() -> Result<&'static dyn AsyncSpawner> {
    if let Some(spawner) = RUNTIME.get() {
        return Ok(spawner.as_ref());
    }

    #[cfg(feature = "tokio-runtime")]
    {
        let spawner = RUNTIME.get_or_init(|| {
            let default: Box<dyn AsyncSpawner> = Box::new(spawners::tokio_impl::TokioSpawner);
            default
        });
        Ok(spawner.as_ref())
    }

    #[cfg(not(feature = "tokio-runtime"))]
    {
        Err(MapError::Runtime(
            "no async runtime available; enable 'tokio-runtime' or call init_runtime".into(),
        ))
    }
}
