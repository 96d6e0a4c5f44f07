use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::INSTRUCTION_TRACK_ID;

/// Canonical track identifier.
///
/// The API hands out both numeric and string ids. Everything is normalized
/// to one string form at the boundary: numbers (and numeric strings) become
/// their decimal form without leading zeros, other strings are trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        match trimmed.parse::<u64>() {
            Ok(n) => TrackId(n.to_string()),
            Err(_) => TrackId(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric value when the id is purely numeric
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for TrackId {
    fn from(n: u64) -> Self {
        TrackId(n.to_string())
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        TrackId::new(s)
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        TrackId::new(s)
    }
}

impl Serialize for TrackId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TrackIdVisitor;

        impl<'de> Visitor<'de> for TrackIdVisitor {
            type Value = TrackId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a track id as string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TrackId, E> {
                Ok(TrackId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TrackId, E> {
                u64::try_from(v)
                    .map(TrackId::from)
                    .map_err(|_| E::custom(format!("negative track id {}", v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<TrackId, E> {
                if v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 {
                    Ok(TrackId::from(v as u64))
                } else {
                    Err(E::custom(format!("non-integral track id {}", v)))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TrackId, E> {
                Ok(TrackId::new(v))
            }
        }

        deserializer.deserialize_any(TrackIdVisitor)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    #[serde(alias = "name", alias = "trackName")]
    pub title: String,
    #[serde(alias = "artistName")]
    pub artist: String,
    #[serde(default, alias = "albumName", skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, alias = "durationMs", alias = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, alias = "artworkUrl", skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(default, alias = "previewUrl", skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            genre: None,
            duration_ms: None,
            artwork_url: None,
            preview_url: None,
        }
    }

    pub fn with_preview_url(mut self, url: impl Into<String>) -> Self {
        self.preview_url = Some(url.into());
        self
    }

    /// The how-to-swipe card shown at the top of a fresh deck
    pub fn instructions() -> Self {
        Track::new(
            INSTRUCTION_TRACK_ID,
            "Swipe right to like, left to pass",
            crate::constants::APP_NAME,
        )
    }

    /// Instruction cards are never persisted, posted or excluded
    pub fn is_instruction(&self) -> bool {
        self.id.as_str() == INSTRUCTION_TRACK_ID
    }
}
