// SwipeTune REST API client modules

pub mod auth;
pub mod client;
pub mod evaluations;
pub mod health;
pub mod history;
pub mod tracks;

// Re-export commonly used types
pub use auth::AuthService;
pub use client::ApiClient;
pub use evaluations::EvaluationSink;
pub use tracks::SuggestionSource;
