pub mod async_helper;
pub mod crypto;
pub mod error_handling;
pub mod single_flight;
pub mod time;

// Re-export commonly used helpers
pub use error_handling::safe_lock;
pub use single_flight::SingleFlight;
pub use time::{now_millis, now_secs};
