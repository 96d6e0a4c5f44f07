/// Services module - background side effects shared by the deck, the player and the CLI
///
/// Everything here is fire-and-forget: the caller has already updated local
/// state and never waits on the server.

pub mod evaluations;
pub mod history;

pub use evaluations::{submit_in_background, SessionEvaluationSink};
pub use history::report_played_in_background;
