// Keyed entity storage.
// The sync pipeline only ever finds by key and upserts; the backing store is pluggable.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::error::NormalizedError;
use crate::model::{
    Accommodation, Board, Category, Chain, Country, Destination, Facility, FacilityGroup, Hotel,
    Segment, State, Terminal, Zone,
};

/// Something that can be mirrored locally under a natural or composite key.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    // Used in logs and error messages
    const KIND: &'static str;

    fn key(&self) -> Self::Key;

    // Surrogate id, for entities that have one
    fn id(&self) -> Option<u64> {
        None
    }

    fn assign_id(&mut self, _id: u64) {}
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected for {kind} {key}: {reason}")]
    WriteRejected {
        kind: &'static str,
        key: String,
        reason: String,
    },
}

impl From<StoreError> for NormalizedError {
    fn from(err: StoreError) -> Self {
        NormalizedError::persistence(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    async fn find(&self, key: &E::Key) -> StoreResult<Option<E>>;

    /// Inserts or fully replaces the row with the entity's key; returns the stored row.
    async fn upsert(&self, entity: E) -> StoreResult<E>;

    async fn count(&self) -> StoreResult<usize>;

    async fn all(&self) -> StoreResult<Vec<E>>;
}

#[derive(Debug, Default)]
pub struct StoreStats {
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub lookups: AtomicUsize,
    pub hits: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreStatsReport {
    pub inserts: usize,
    pub updates: usize,
    pub lookups: usize,
    pub hits: usize,
}

/// In-process store backed by a sharded concurrent map.
pub struct MemoryStore<E: Entity> {
    rows: DashMap<E::Key, E>,
    next_id: AtomicU64,
    stats: StoreStats,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: StoreStats::default(),
        }
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStatsReport {
        StoreStatsReport {
            inserts: self.stats.inserts.load(Ordering::Relaxed),
            updates: self.stats.updates.load(Ordering::Relaxed),
            lookups: self.stats.lookups.load(Ordering::Relaxed),
            hits: self.stats.hits.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    async fn find(&self, key: &E::Key) -> StoreResult<Option<E>> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        let found = self.rows.get(key).map(|row| row.value().clone());
        if found.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    async fn upsert(&self, mut entity: E) -> StoreResult<E> {
        match self.rows.entry(entity.key()) {
            MapEntry::Occupied(mut row) => {
                // The surrogate id survives a full replace
                if let Some(id) = row.get().id() {
                    entity.assign_id(id);
                }
                row.insert(entity.clone());
                self.stats.updates.fetch_add(1, Ordering::Relaxed);
            }
            MapEntry::Vacant(row) => {
                if entity.id().is_none() {
                    entity.assign_id(self.next_id.fetch_add(1, Ordering::Relaxed));
                }
                row.insert(entity.clone());
                self.stats.inserts.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(entity)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.rows.len())
    }

    async fn all(&self) -> StoreResult<Vec<E>> {
        Ok(self.rows.iter().map(|row| row.value().clone()).collect())
    }
}

/// One store per mirrored entity type.
#[derive(Clone)]
pub struct ReferenceStores {
    pub countries: Arc<dyn EntityStore<Country>>,
    pub states: Arc<dyn EntityStore<State>>,
    pub destinations: Arc<dyn EntityStore<Destination>>,
    pub zones: Arc<dyn EntityStore<Zone>>,
    pub accommodations: Arc<dyn EntityStore<Accommodation>>,
    pub boards: Arc<dyn EntityStore<Board>>,
    pub categories: Arc<dyn EntityStore<Category>>,
    pub chains: Arc<dyn EntityStore<Chain>>,
    pub facility_groups: Arc<dyn EntityStore<FacilityGroup>>,
    pub facilities: Arc<dyn EntityStore<Facility>>,
    pub segments: Arc<dyn EntityStore<Segment>>,
    pub terminals: Arc<dyn EntityStore<Terminal>>,
    pub hotels: Arc<dyn EntityStore<Hotel>>,
}

impl ReferenceStores {
    pub fn in_memory() -> Self {
        Self {
            countries: Arc::new(MemoryStore::new()),
            states: Arc::new(MemoryStore::new()),
            destinations: Arc::new(MemoryStore::new()),
            zones: Arc::new(MemoryStore::new()),
            accommodations: Arc::new(MemoryStore::new()),
            boards: Arc::new(MemoryStore::new()),
            categories: Arc::new(MemoryStore::new()),
            chains: Arc::new(MemoryStore::new()),
            facility_groups: Arc::new(MemoryStore::new()),
            facilities: Arc::new(MemoryStore::new()),
            segments: Arc::new(MemoryStore::new()),
            terminals: Arc::new(MemoryStore::new()),
            hotels: Arc::new(MemoryStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Utc;

    fn zone(code: i64, destination: &str, name: &str) -> Zone {
        Zone {
            id: None,
            zone_code: code,
            destination_code: destination.to_string(),
            name: name.to_string(),
            synced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let store = MemoryStore::<Zone>::new();

        let first = store.upsert(zone(10, "PMI", "Old name")).await.unwrap();
        let second = store.upsert(zone(10, "PMI", "New name")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(first.id, second.id);
        let row = store.find(&(10, "PMI".to_string())).await.unwrap().unwrap();
        assert_eq!(row.name, "New name");

        let stats = store.stats();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.updates, 1);
    }

    #[tokio::test]
    async fn test_composite_key_scopes_rows() {
        let store = MemoryStore::<Zone>::new();
        store.upsert(zone(1, "PMI", "Centro")).await.unwrap();
        store.upsert(zone(1, "BCN", "Centro")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let ids: Vec<Option<u64>> = store.all().await.unwrap().iter().map(|z| z.id).collect();
        assert!(ids.iter().all(Option::is_some));
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_find_miss_counts_lookup() {
        let store = MemoryStore::<Zone>::new();
        assert!(store.find(&(7, "NOPE".to_string())).await.unwrap().is_none());
        let stats = store.stats();
        assert_eq!(stats.lookups, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_store_error_becomes_persistence_failure() {
        let err: NormalizedError = StoreError::Unavailable("connection refused".to_string()).into();
        assert_eq!(err.kind, ErrorKind::PersistenceFailure);
        assert_eq!(err.http_status, 500);
        assert!(err.message.contains("connection refused"));
    }
}
