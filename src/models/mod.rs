// Data models for SwipeTune API entities and on-device records

pub mod auth;
pub mod evaluation;
pub mod responses;
pub mod stored;
pub mod track;

// Re-export commonly used types
pub use auth::{AuthTokens, TokenBundle, UserProfile};
pub use evaluation::{Evaluation, EvaluationStatus, NewEvaluation, PlayedTrack};
pub use responses::{ErrorBody, Page, PageMeta, ServiceStatus};
pub use stored::{StoredDislikedTrack, StoredTrack};
pub use track::{Track, TrackId};
