//! Prelude module for common halomap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use halomap::prelude::*;`

pub use crate::core::{
    config::{AppConfig, ConfigProfile, HaloConfig, MarkerConfig, PopupConfig, StorageConfig},
    geo::{DistanceMethod, LatLng, LatLngBounds, Point},
    map::MapController,
    viewport::{Camera, Viewport},
};

pub use crate::layers::{
    halo::{Halo, HaloEngine},
    marker::{Marker, MarkerId, MarkerStore},
};

pub use crate::input::{EventHandled, EventManager, MapEvent};

pub use crate::platform::{HeadlessPlatform, MapPlatform, PlatformSource};

pub use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore, WriteBatch};

pub use crate::ui::popup::PopupManager;

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{MapError, Result};

pub use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
