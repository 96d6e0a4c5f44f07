use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Track, TrackId};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Like,
    Dislike,
    Skip,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Like => "like",
            EvaluationStatus::Dislike => "dislike",
            EvaluationStatus::Skip => "skip",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EvaluationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(EvaluationStatus::Like),
            "dislike" => Ok(EvaluationStatus::Dislike),
            "skip" => Ok(EvaluationStatus::Skip),
            other => Err(format!("unknown evaluation status '{}'", other)),
        }
    }
}

/// Server-side judgment of a track by a user
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Evaluation {
    #[serde(deserialize_with = "crate::models::responses::string_or_number")]
    pub id: String,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(alias = "trackId")]
    pub track_id: TrackId,
    pub status: EvaluationStatus,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<Track>,
}

/// Body of `POST /api/v1/evaluations`
#[derive(Debug, Serialize, Clone)]
pub struct NewEvaluation {
    pub track_id: TrackId,
    pub status: EvaluationStatus,
}

/// Body of `POST /api/v1/history/played`
#[derive(Debug, Serialize, Clone)]
pub struct PlayedTrack {
    pub track_id: TrackId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_ms: Option<u64>,
}
