//! SwipeTune client core
//!
//! Platform-agnostic logic shared by every SwipeTune front-end: the auth
//! session store, the swipe deck, the preview player and the on-device
//! library cache. Rendering and navigation live in the platform shells.

pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod player;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
