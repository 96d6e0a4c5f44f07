use serde::{Deserialize, Serialize};

use super::{Track, TrackId};

/// On-device projection of a liked track
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredTrack {
    pub track_id: TrackId,
    pub track_name: String,
    pub artist_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    /// Unix seconds
    pub saved_at: u64,
}

impl StoredTrack {
    /// Project an already-validated track
    pub fn from_track(track: &Track, saved_at: u64) -> Self {
        Self {
            track_id: track.id.clone(),
            track_name: track.title.clone(),
            artist_name: track.artist.clone(),
            album_name: track.album.clone(),
            genre: track.genre.clone(),
            duration_ms: track.duration_ms,
            artwork_url: track.artwork_url.clone(),
            preview_url: track.preview_url.clone(),
            saved_at,
        }
    }

    pub fn to_track(&self) -> Track {
        Track {
            id: self.track_id.clone(),
            title: self.track_name.clone(),
            artist: self.artist_name.clone(),
            album: self.album_name.clone(),
            genre: self.genre.clone(),
            duration_ms: self.duration_ms,
            artwork_url: self.artwork_url.clone(),
            preview_url: self.preview_url.clone(),
        }
    }
}

/// On-device projection of a disliked track with its exclusion lifetime
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredDislikedTrack {
    pub track_id: TrackId,
    pub track_name: String,
    pub artist_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    /// Unix seconds
    pub disliked_at: u64,
    /// Falls back to the library default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl StoredDislikedTrack {
    pub fn from_track(track: &Track, disliked_at: u64, ttl_secs: Option<u64>) -> Self {
        Self {
            track_id: track.id.clone(),
            track_name: track.title.clone(),
            artist_name: track.artist.clone(),
            artwork_url: track.artwork_url.clone(),
            disliked_at,
            ttl_secs,
        }
    }

    pub fn is_expired(&self, now: u64, default_ttl: u64) -> bool {
        let ttl = self.ttl_secs.unwrap_or(default_ttl);
        now.saturating_sub(self.disliked_at) >= ttl
    }
}
