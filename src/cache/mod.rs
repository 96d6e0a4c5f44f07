//! On-device liked/disliked library.
//!
//! Local state is the source of truth for deck filtering and for keeping the
//! UI responsive; the server copy of evaluations is written best-effort.

pub mod collection;
pub mod validation;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::constants::{DISLIKED_TRACKS_KEY, LIKED_TRACKS_KEY};
use crate::error::{ClientError, Result};
use crate::models::{StoredDislikedTrack, StoredTrack, Track, TrackId};
use crate::storage::KeyValueStore;

pub use collection::{CachedEntry, TrackCollection};
pub use validation::normalize_track;

pub struct LocalLibrary {
    liked: TrackCollection<StoredTrack>,
    disliked: TrackCollection<StoredDislikedTrack>,
    dislike_ttl_secs: u64,
}

impl LocalLibrary {
    pub fn load(store: Arc<dyn KeyValueStore>, max_entries: usize, dislike_ttl_secs: u64) -> Self {
        let liked = TrackCollection::load(Arc::clone(&store), LIKED_TRACKS_KEY, max_entries);
        let disliked = TrackCollection::load(store, DISLIKED_TRACKS_KEY, max_entries);
        log::info!(
            "[Library] Loaded {} liked and {} disliked tracks",
            liked.len(),
            disliked.len()
        );
        Self {
            liked,
            disliked,
            dislike_ttl_secs,
        }
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &ClientConfig) -> Self {
        Self::load(store, config.max_cached_tracks, config.dislike_ttl_secs)
    }

    /// Validate and store a liked track; a previous dislike of it is dropped
    pub fn save_liked(&mut self, track: &Track, now: u64) -> Result<StoredTrack> {
        let normalized = reject_instruction(track).and_then(|_| normalize_track(track))?;
        let entry = StoredTrack::from_track(&normalized, now);
        self.liked.upsert(entry.clone())?;
        self.disliked.remove(&entry.track_id)?;
        log::debug!("[Library] Liked {} ({})", entry.track_name, entry.track_id);
        Ok(entry)
    }

    /// Validate and store a disliked track with the default TTL
    pub fn save_disliked(&mut self, track: &Track, now: u64) -> Result<StoredDislikedTrack> {
        let normalized = reject_instruction(track).and_then(|_| normalize_track(track))?;
        let entry = StoredDislikedTrack::from_track(&normalized, now, Some(self.dislike_ttl_secs));
        self.disliked.upsert(entry.clone())?;
        self.liked.remove(&entry.track_id)?;
        log::debug!("[Library] Disliked {} ({})", entry.track_name, entry.track_id);
        Ok(entry)
    }

    pub fn remove_liked(&mut self, id: &TrackId) -> Result<bool> {
        self.liked.remove(id)
    }

    pub fn remove_disliked(&mut self, id: &TrackId) -> Result<bool> {
        self.disliked.remove(id)
    }

    /// Drop dislikes whose TTL has elapsed; returns how many were removed
    pub fn purge_expired(&mut self, now: u64) -> Result<usize> {
        let ttl = self.dislike_ttl_secs;
        let removed = self.disliked.retain(|e| !e.is_expired(now, ttl))?;
        if removed > 0 {
            log::info!("[Library] Purged {} expired dislikes", removed);
        }
        Ok(removed)
    }

    /// Ids currently excluded from suggestions. Purges expired dislikes first.
    pub fn excluded_ids(&mut self, now: u64) -> HashSet<TrackId> {
        if let Err(e) = self.purge_expired(now) {
            log::warn!("[Library] Failed to persist dislike purge: {}", e);
        }
        let ttl = self.dislike_ttl_secs;
        self.disliked
            .entries()
            .iter()
            .filter(|e| !e.is_expired(now, ttl))
            .map(|e| e.track_id.clone())
            .collect()
    }

    pub fn is_liked(&self, id: &TrackId) -> bool {
        self.liked.contains(id)
    }

    pub fn liked(&self) -> &[StoredTrack] {
        self.liked.entries()
    }

    pub fn disliked(&self) -> &[StoredDislikedTrack] {
        self.disliked.entries()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.liked.clear()?;
        self.disliked.clear()
    }
}

fn reject_instruction(track: &Track) -> Result<()> {
    if track.is_instruction() {
        return Err(ClientError::Validation(
            "instruction card cannot be stored".to_string(),
        ));
    }
    Ok(())
}
