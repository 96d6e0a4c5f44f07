use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{StoredDislikedTrack, StoredTrack, TrackId};
use crate::storage::{load_versioned, save_versioned, KeyValueStore};

/// Entry of a capped, timestamp-ordered collection
pub trait CachedEntry: Serialize + DeserializeOwned + Clone {
    fn track_id(&self) -> &TrackId;
    fn timestamp(&self) -> u64;
}

impl CachedEntry for StoredTrack {
    fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    fn timestamp(&self) -> u64 {
        self.saved_at
    }
}

impl CachedEntry for StoredDislikedTrack {
    fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    fn timestamp(&self) -> u64 {
        self.disliked_at
    }
}

/// Persisted collection holding at most `max_entries`, newest first
pub struct TrackCollection<E: CachedEntry> {
    key: &'static str,
    max_entries: usize,
    entries: Vec<E>,
    store: Arc<dyn KeyValueStore>,
}

impl<E: CachedEntry> TrackCollection<E> {
    pub fn load(store: Arc<dyn KeyValueStore>, key: &'static str, max_entries: usize) -> Self {
        let entries: Vec<E> = load_versioned(store.as_ref(), key).unwrap_or_default();
        let mut collection = Self {
            key,
            max_entries,
            entries,
            store,
        };
        let before = collection.entries.len();
        collection.trim();
        if collection.entries.len() != before {
            log::info!(
                "[Library] '{}' trimmed from {} to {} entries on load",
                key,
                before,
                collection.entries.len()
            );
            if let Err(e) = collection.persist() {
                log::warn!("[Library] Failed to persist trimmed '{}': {}", key, e);
            }
        }
        log::debug!("[Library] Loaded {} entries from '{}'", collection.entries.len(), key);
        collection
    }

    /// Insert or replace the entry with the same track id
    pub fn upsert(&mut self, entry: E) -> Result<()> {
        let id = entry.track_id().clone();
        self.entries.retain(|e| e.track_id() != &id);
        self.entries.insert(0, entry);
        self.trim();
        self.persist()
    }

    pub fn remove(&mut self, id: &TrackId) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.track_id() != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Keep only entries matching `keep`; returns how many were removed
    pub fn retain<F>(&mut self, keep: F) -> Result<usize>
    where
        F: FnMut(&E) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(keep);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.entries.iter().any(|e| e.track_id() == id)
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    fn trim(&mut self) {
        // Stable sort: for equal timestamps the most recently inserted stays ahead
        self.entries
            .sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        self.entries.truncate(self.max_entries);
    }

    fn persist(&self) -> Result<()> {
        save_versioned(self.store.as_ref(), self.key, &self.entries)
    }
}
