pub mod deck;
pub mod session;

pub use deck::{DeckConfig, SwipeDeck, SwipeDirection, SwipeOutcome};
pub use session::{AuthStatus, SessionStore};
