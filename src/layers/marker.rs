use crate::{
    core::{
        config::{MarkerConfig, StorageConfig},
        constants::LEGACY_ID_SEPARATOR,
        geo::LatLng,
    },
    storage::{KeyValueStore, WriteBatch},
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable marker identity, assigned from the persisted counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labelled pin on the map. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    id: MarkerId,
    label: String,
    position: LatLng,
}

impl Marker {
    pub fn new(id: MarkerId, label: impl Into<String>, position: LatLng) -> Self {
        Self {
            id,
            label: label.into(),
            position,
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> LatLng {
        self.position
    }
}

/// Active markers in creation order, mirrored into a key-value store.
///
/// Each persisted marker occupies three keys (label, longitude, latitude)
/// suffixed with its id. A counter key records how many ids have been handed
/// out; ids below it without a label key are gaps left by deletions.
pub struct MarkerStore<S: KeyValueStore> {
    store: S,
    keys: StorageConfig,
    markers: Vec<Marker>,
    next_id: u32,
}

impl<S: KeyValueStore> MarkerStore<S> {
    /// Wraps a store, reading the persisted counter. Markers are not loaded
    /// until [`MarkerStore::load_all`].
    pub fn open(store: S, keys: StorageConfig) -> Self {
        let next_id = Self::read_counter(&store, &keys);
        Self {
            store,
            keys,
            markers: Vec::new(),
            next_id,
        }
    }

    fn read_counter(store: &S, keys: &StorageConfig) -> u32 {
        store
            .get_int(&keys.counter_key)
            .map(|c| c.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0)
    }

    /// Creates a marker. Without an explicit id the next counter value is
    /// used. When `persist` is set the marker's keys and the advanced counter
    /// are committed before this returns.
    pub fn create_marker(
        &mut self,
        position: LatLng,
        label: impl Into<String>,
        explicit_id: Option<MarkerId>,
        persist: bool,
    ) -> Result<&Marker> {
        let id = explicit_id.unwrap_or(MarkerId(self.next_id));
        if self.get(id).is_some() {
            return Err(MapError::DuplicateMarker(id));
        }

        let marker = Marker::new(id, label, position);

        if persist {
            let counter = self.next_id.max(id.0.saturating_add(1));
            let mut batch = WriteBatch::new();
            batch
                .put_string(self.keys.label_key(id), marker.label())
                .put_float(self.keys.longitude_key(id), position.lng)
                .put_float(self.keys.latitude_key(id), position.lat)
                .put_int(self.keys.counter_key.clone(), counter as i64);
            self.store.commit(batch)?;
            self.next_id = counter;
        } else {
            self.next_id = self.next_id.max(id.0.saturating_add(1));
        }

        log::debug!(
            "created marker {} '{}' at ({:.6}, {:.6}){}",
            id,
            marker.label(),
            position.lat,
            position.lng,
            if persist { " [persisted]" } else { "" }
        );

        self.markers.push(marker);
        Ok(&self.markers[self.markers.len() - 1])
    }

    /// Removes a marker from memory and deletes its keys from the store.
    /// The counter is left alone so the id is not handed out again.
    pub fn delete_marker(&mut self, id: MarkerId) -> Result<Marker> {
        let index = self
            .markers
            .iter()
            .position(|m| m.id == id)
            .ok_or(MapError::UnknownMarker(id))?;

        let mut batch = WriteBatch::new();
        batch
            .remove(self.keys.label_key(id))
            .remove(self.keys.longitude_key(id))
            .remove(self.keys.latitude_key(id));
        self.store.commit(batch)?;

        let marker = self.markers.remove(index);
        log::debug!("deleted marker {} '{}'", id, marker.label());
        Ok(marker)
    }

    /// Rebuilds the in-memory markers from the store.
    ///
    /// An empty store (counter zero) is seeded with one default marker at
    /// (0, 0) when the config asks for it. Returns the number of markers
    /// now active.
    pub fn load_all(&mut self, defaults: &MarkerConfig) -> Result<usize> {
        // Unreadable stores read as empty and would get seeded
        self.store.health()?;
        self.markers.clear();
        self.next_id = Self::read_counter(&self.store, &self.keys);

        if self.next_id == 0 {
            if defaults.seed_default_marker {
                log::info!("empty marker store, seeding default marker");
                let label = defaults.default_label.clone();
                self.create_marker(LatLng::new(0.0, 0.0), label, None, true)?;
            }
            return Ok(self.markers.len());
        }

        for raw_id in 0..self.next_id {
            let id = MarkerId(raw_id);
            let label_key = self.keys.label_key(id);
            if !self.store.contains(&label_key) {
                continue;
            }

            let stored = self.store.get_string(&label_key).unwrap_or_default();
            let label = decode_label(&stored, id);

            let lng = self.store.get_float(&self.keys.longitude_key(id));
            let lat = self.store.get_float(&self.keys.latitude_key(id));
            if lng.is_none() || lat.is_none() {
                log::debug!("marker {} has no stored position, using (0, 0)", id);
            }
            let position = LatLng::new(lat.unwrap_or(0.0), lng.unwrap_or(0.0));

            self.create_marker(position, label, Some(id), false)?;
        }

        log::info!(
            "loaded {} markers (counter {})",
            self.markers.len(),
            self.next_id
        );
        Ok(self.markers.len())
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// The id the next auto-assigned marker will get
    pub fn next_id(&self) -> MarkerId {
        MarkerId(self.next_id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Strips the `<id>#-#` prefix from labels in the legacy composite form.
/// Plain labels are returned untouched, even if they contain the separator.
fn decode_label(stored: &str, id: MarkerId) -> String {
    let prefix = format!("{}{}", id, LEGACY_ID_SEPARATOR);
    match stored.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn open_store(store: MemoryStore) -> MarkerStore<MemoryStore> {
        MarkerStore::open(store, StorageConfig::default())
    }

    #[test]
    fn test_ids_are_assigned_from_counter() {
        let mut markers = open_store(MemoryStore::new());

        let a = markers
            .create_marker(LatLng::new(1.0, 2.0), "a", None, true)
            .unwrap()
            .id();
        let b = markers
            .create_marker(LatLng::new(3.0, 4.0), "b", None, true)
            .unwrap()
            .id();

        assert_eq!(a, MarkerId(0));
        assert_eq!(b, MarkerId(1));
        assert_eq!(markers.next_id(), MarkerId(2));
        assert_eq!(markers.store().get_int("Marker_Counter"), Some(2));
    }

    #[test]
    fn test_persisted_keys_are_written() {
        let mut markers = open_store(MemoryStore::new());
        markers
            .create_marker(LatLng::new(12.34, 56.78), "Home", None, true)
            .unwrap();

        let store = markers.store();
        assert_eq!(store.get_string("Marker_Label0").as_deref(), Some("Home"));
        assert_eq!(store.get_float("Marker_Latitude0"), Some(12.34));
        assert_eq!(store.get_float("Marker_Longitude0"), Some(56.78));

        let mut reopened = open_store(markers.into_store());
        assert_eq!(reopened.load_all(&MarkerConfig::default()).unwrap(), 1);
        assert_eq!(reopened.get(MarkerId(0)).unwrap().label(), "Home");
    }

    #[test]
    fn test_unpersisted_marker_leaves_store_alone() {
        let mut markers = open_store(MemoryStore::new());
        markers
            .create_marker(LatLng::new(0.0, 0.0), "temp", None, false)
            .unwrap();

        assert_eq!(markers.len(), 1);
        assert!(markers.store().is_empty());
        assert_eq!(markers.next_id(), MarkerId(1));
    }

    #[test]
    fn test_delete_removes_all_keys_but_keeps_counter() {
        let mut markers = open_store(MemoryStore::new());
        let id = markers
            .create_marker(LatLng::new(5.0, 5.0), "gone", None, true)
            .unwrap()
            .id();

        let removed = markers.delete_marker(id).unwrap();
        assert_eq!(removed.label(), "gone");
        assert!(markers.is_empty());

        let store = markers.store();
        assert!(!store.contains("Marker_Label0"));
        assert!(!store.contains("Marker_Latitude0"));
        assert!(!store.contains("Marker_Longitude0"));
        assert_eq!(store.get_int("Marker_Counter"), Some(1));

        // The id is not reused
        let next = markers
            .create_marker(LatLng::new(0.0, 0.0), "new", None, true)
            .unwrap()
            .id();
        assert_eq!(next, MarkerId(1));
    }

    #[test]
    fn test_delete_unknown_marker_is_an_error() {
        let mut markers = open_store(MemoryStore::new());
        let err = markers.delete_marker(MarkerId(9)).unwrap_err();
        assert!(matches!(err, MapError::UnknownMarker(MarkerId(9))));
    }

    #[test]
    fn test_duplicate_explicit_id_is_rejected() {
        let mut markers = open_store(MemoryStore::new());
        markers
            .create_marker(LatLng::new(0.0, 0.0), "a", Some(MarkerId(3)), false)
            .unwrap();
        let err = markers
            .create_marker(LatLng::new(0.0, 0.0), "b", Some(MarkerId(3)), false)
            .unwrap_err();
        assert!(matches!(err, MapError::DuplicateMarker(MarkerId(3))));
    }

    #[test]
    fn test_load_seeds_default_marker_on_empty_store() {
        let mut markers = open_store(MemoryStore::new());
        let count = markers.load_all(&MarkerConfig::default()).unwrap();

        assert_eq!(count, 1);
        let marker = &markers.markers()[0];
        assert_eq!(marker.id(), MarkerId(0));
        assert_eq!(marker.label(), "Marker");
        assert_eq!(marker.position(), LatLng::new(0.0, 0.0));
        assert_eq!(markers.store().get_int("Marker_Counter"), Some(1));
    }

    #[test]
    fn test_load_without_seeding() {
        let mut markers = open_store(MemoryStore::new());
        let defaults = MarkerConfig {
            seed_default_marker: false,
            ..MarkerConfig::default()
        };
        assert_eq!(markers.load_all(&defaults).unwrap(), 0);
        assert!(markers.store().is_empty());
    }

    #[test]
    fn test_load_skips_gaps() {
        let shared = MemoryStore::new();
        {
            let mut markers = open_store(shared.clone());
            for i in 0..4 {
                markers
                    .create_marker(LatLng::new(i as f64, i as f64), format!("m{i}"), None, true)
                    .unwrap();
            }
            markers.delete_marker(MarkerId(1)).unwrap();
            markers.delete_marker(MarkerId(3)).unwrap();
        }

        let mut reloaded = open_store(shared);
        reloaded.load_all(&MarkerConfig::default()).unwrap();

        let ids: Vec<_> = reloaded.markers().iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![MarkerId(0), MarkerId(2)]);
        assert_eq!(reloaded.get(MarkerId(2)).unwrap().label(), "m2");
        assert_eq!(reloaded.next_id(), MarkerId(4));
    }

    #[test]
    fn test_load_defaults_missing_coordinates() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_int("Marker_Counter", 1).put_string("Marker_Label0", "");
        store.commit(batch).unwrap();

        let mut markers = open_store(store);
        markers.load_all(&MarkerConfig::default()).unwrap();

        let marker = markers.get(MarkerId(0)).unwrap();
        assert_eq!(marker.label(), "");
        assert_eq!(marker.position(), LatLng::new(0.0, 0.0));
    }

    #[test]
    fn test_load_decodes_legacy_composite_labels() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .put_int("Marker_Counter", 2)
            .put_string("Marker_Label0", "0#-#Home")
            .put_string("Marker_Label1", "1#-#");
        store.commit(batch).unwrap();

        let mut markers = open_store(store);
        markers.load_all(&MarkerConfig::default()).unwrap();

        assert_eq!(markers.get(MarkerId(0)).unwrap().label(), "Home");
        assert_eq!(markers.get(MarkerId(1)).unwrap().label(), "");
    }

    #[test]
    fn test_labels_containing_separator_survive() {
        let shared = MemoryStore::new();
        {
            let mut markers = open_store(shared.clone());
            markers
                .create_marker(LatLng::new(0.0, 0.0), "a#-#b", None, true)
                .unwrap();
        }

        let mut reloaded = open_store(shared);
        reloaded.load_all(&MarkerConfig::default()).unwrap();
        assert_eq!(reloaded.get(MarkerId(0)).unwrap().label(), "a#-#b");
    }

    #[test]
    fn test_explicit_persisted_id_advances_counter() {
        let mut markers = open_store(MemoryStore::new());
        markers
            .create_marker(LatLng::new(0.0, 0.0), "far", Some(MarkerId(10)), true)
            .unwrap();

        assert_eq!(markers.next_id(), MarkerId(11));
        assert!(markers.store().contains("Marker_Label10"));
    }
}
