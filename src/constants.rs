//! Application constants and configuration defaults

// === App ===
pub const APP_NAME: &str = "SwipeTune";
pub const DATA_DIR_NAME: &str = "swipetune";
pub const DATABASE_FILE_NAME: &str = "swipetune.db";

// === API & Network ===
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const USER_AGENT: &str = concat!("swipetune/", env!("CARGO_PKG_VERSION"));

// === Swipe Deck ===
pub const DEFAULT_BATCH_SIZE: usize = 15;
pub const DEFAULT_LOW_WATERMARK: usize = 4;
pub const EXCLUDE_IDS_LIMIT: usize = 200;
pub const INSTRUCTION_TRACK_ID: &str = "__instructions__";

// === Local Library Cache ===
pub const STORAGE_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_MAX_CACHED_TRACKS: usize = 500;
pub const DEFAULT_DISLIKE_TTL_SECS: u64 = 30 * 24 * 60 * 60; // 30 days

// === Storage Keys ===
pub const AUTH_SESSION_KEY: &str = "swipetune:auth_session";
pub const LIKED_TRACKS_KEY: &str = "swipetune:liked_tracks";
pub const DISLIKED_TRACKS_KEY: &str = "swipetune:disliked_tracks";
pub const BACKUP_KEY_SEGMENT: &str = "backup";
pub const MAX_BACKUPS_PER_KEY: usize = 3;

// === Auth ===
pub const TOKEN_EXPIRY_LEEWAY_SECS: u64 = 30;
pub const MIN_PASSWORD_LENGTH: usize = 1;

// === Audio Playback ===
pub const DEFAULT_VOLUME: f32 = 1.0;
pub const DEFAULT_VOLUME_BEFORE_MUTE: f32 = 0.7;
pub const PLAYER_POLL_INTERVAL_MILLIS: u64 = 50;
pub const PREVIEW_LOAD_TIMEOUT_SECS: u64 = 20;
