//! Swipe deck
//!
//! Rolling queue of candidate tracks fed by the suggestion endpoint. Swiping
//! updates the local library first and tells the server afterwards; when the
//! queue drops to the low watermark a background refill starts. Fetches are
//! single-flight: a refill triggered while one is running joins it.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api::{EvaluationSink, SuggestionSource};
use crate::cache::LocalLibrary;
use crate::config::ClientConfig;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_LOW_WATERMARK, EXCLUDE_IDS_LIMIT};
use crate::error::Result;
use crate::models::{EvaluationStatus, Track, TrackId};
use crate::services::evaluations::submit_in_background;
use crate::utils::single_flight::Flight;
use crate::utils::{now_secs, safe_lock, SingleFlight};

const FETCH_FLIGHT: &str = "suggestions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Like
    Right,
    /// Dislike
    Left,
    /// Skip without judging
    Up,
}

impl SwipeDirection {
    pub fn status(&self) -> EvaluationStatus {
        match self {
            SwipeDirection::Right => EvaluationStatus::Like,
            SwipeDirection::Left => EvaluationStatus::Dislike,
            SwipeDirection::Up => EvaluationStatus::Skip,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeckConfig {
    pub batch_size: usize,
    pub low_watermark: usize,
    pub show_instructions: bool,
    /// Queued only when a fetch fails and nothing else is left to show
    pub fallback_tracks: Vec<Track>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            low_watermark: DEFAULT_LOW_WATERMARK,
            show_instructions: false,
            fallback_tracks: Vec::new(),
        }
    }
}

impl From<&ClientConfig> for DeckConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            low_watermark: config.low_watermark,
            show_instructions: config.show_instructions,
            fallback_tracks: Vec::new(),
        }
    }
}

/// What a swipe did, for UI feedback
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeOutcome {
    pub track_id: TrackId,
    pub direction: SwipeDirection,
    pub stored_locally: bool,
    pub sent_to_server: bool,
    pub refill_started: bool,
}

#[derive(Default)]
struct DeckState {
    queue: VecDeque<Track>,
    /// Every id queued during this session
    seen: HashSet<TrackId>,
    /// Ids disliked during this session
    excluded: HashSet<TrackId>,
    error: Option<String>,
    /// Bumped by `reset`; responses from older generations are dropped
    generation: u64,
    instructions_shown: bool,
}

struct DeckInner {
    source: Arc<dyn SuggestionSource>,
    sink: Option<Arc<dyn EvaluationSink>>,
    library: Arc<Mutex<LocalLibrary>>,
    config: DeckConfig,
    state: Mutex<DeckState>,
    fetch_flight: SingleFlight<Result<usize>>,
}

#[derive(Clone)]
pub struct SwipeDeck {
    inner: Arc<DeckInner>,
}

impl SwipeDeck {
    pub fn new(
        source: Arc<dyn SuggestionSource>,
        sink: Option<Arc<dyn EvaluationSink>>,
        library: Arc<Mutex<LocalLibrary>>,
        config: DeckConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DeckInner {
                source,
                sink,
                library,
                config,
                state: Mutex::new(DeckState::default()),
                fetch_flight: SingleFlight::new(),
            }),
        }
    }

    /// First load: instruction card (once per session) plus a batch
    pub async fn fetch_initial(&self) -> Result<usize> {
        {
            let mut state = self.lock();
            state.error = None;
            if self.inner.config.show_instructions && !state.instructions_shown {
                state.instructions_shown = true;
                state.queue.push_front(Track::instructions());
            }
        }
        self.fetch_more().await
    }

    /// Fetch another batch, or join the one already in flight.
    ///
    /// The exclusion list and generation are captured when this is called,
    /// so a `reset` before the returned future resolves discards its result.
    pub fn fetch_more(&self) -> Flight<Result<usize>> {
        let inner = Arc::clone(&self.inner);
        self.inner.fetch_flight.run(FETCH_FLIGHT, move || {
            let (generation, exclude) = inner.exclusion_snapshot();
            async move { inner.fetch_batch(generation, exclude).await }
        })
    }

    /// Retry after an error banner; same as `fetch_more` with the banner cleared
    pub fn retry(&self) -> Flight<Result<usize>> {
        self.dismiss_error();
        self.fetch_more()
    }

    /// Remove `track` from the deck and record the judgment.
    ///
    /// Local library writes happen before this returns. The server write and
    /// any refill run in the background and never block the deck.
    pub fn record_swipe(&self, direction: SwipeDirection, track: &Track) -> SwipeOutcome {
        let remaining = {
            let mut state = self.lock();
            match state.queue.iter().position(|t| t.id == track.id) {
                Some(0) => {
                    state.queue.pop_front();
                }
                Some(index) => {
                    log::debug!("[Deck] Swiped track {} was not at the head (index {})", track.id, index);
                    state.queue.remove(index);
                }
                None => log::debug!("[Deck] Swiped track {} is not queued", track.id),
            }
            if direction == SwipeDirection::Left && !track.is_instruction() {
                state.excluded.insert(track.id.clone());
            }
            state.queue.len()
        };

        let mut outcome = SwipeOutcome {
            track_id: track.id.clone(),
            direction,
            stored_locally: false,
            sent_to_server: false,
            refill_started: false,
        };

        if !track.is_instruction() {
            outcome.stored_locally = self.store_locally(direction, track);
            outcome.sent_to_server = self.send_to_server(direction, track);
        }

        log::info!(
            "[Deck] {:?} on '{}' ({}), {} left",
            direction,
            track.title,
            track.id,
            remaining
        );

        if remaining <= self.inner.config.low_watermark {
            outcome.refill_started = self.spawn_refill();
        }
        outcome
    }

    /// Forget the session: queue, seen set, error. In-flight responses are discarded.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.generation += 1;
            state.queue.clear();
            state.seen.clear();
            state.excluded.clear();
            state.error = None;
            state.instructions_shown = false;
            log::info!("[Deck] Reset (generation {})", state.generation);
        }
        // The old flight now resolves to Ok(0); the next fetch must not join it
        self.inner.fetch_flight.forget(FETCH_FLIGHT);
    }

    pub fn current(&self) -> Option<Track> {
        self.lock().queue.front().cloned()
    }

    pub fn queue(&self) -> Vec<Track> {
        self.lock().queue.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Banner text from the last failed fetch
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.lock().error = None;
    }

    pub fn library(&self) -> Arc<Mutex<LocalLibrary>> {
        Arc::clone(&self.inner.library)
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.fetch_flight.is_pending(FETCH_FLIGHT)
    }

    fn spawn_refill(&self) -> bool {
        if self.is_fetching() {
            log::debug!("[Deck] Refill already in flight");
            return false;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::debug!("[Deck] Low watermark reached - refilling in background");
                let flight = self.fetch_more();
                handle.spawn(async move {
                    let _ = flight.await;
                });
                true
            }
            Err(_) => {
                log::warn!("[Deck] No async runtime - refill skipped");
                false
            }
        }
    }

    fn store_locally(&self, direction: SwipeDirection, track: &Track) -> bool {
        let now = now_secs();
        let mut library = safe_lock(&self.inner.library, "Deck");
        let result = match direction {
            SwipeDirection::Right => library.save_liked(track, now).map(|_| ()),
            SwipeDirection::Left => library.save_disliked(track, now).map(|_| ()),
            SwipeDirection::Up => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[Deck] Could not store {} locally: {}", track.id, e);
                false
            }
        }
    }

    fn send_to_server(&self, direction: SwipeDirection, track: &Track) -> bool {
        match &self.inner.sink {
            Some(sink) if sink.is_authenticated() => {
                submit_in_background(Arc::clone(sink), track.id.clone(), direction.status());
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeckState> {
        safe_lock(&self.inner.state, "Deck")
    }
}

impl DeckInner {
    async fn fetch_batch(&self, generation: u64, exclude: Vec<TrackId>) -> Result<usize> {
        let limit = self.config.batch_size;

        log::info!("[Deck] Fetching {} suggestions ({} excluded)", limit, exclude.len());
        let result = self.source.fetch_suggestions(limit, exclude).await;

        let filter_out = safe_lock(&self.library, "Deck").excluded_ids(now_secs());
        let mut state = safe_lock(&self.state, "Deck");
        if state.generation != generation {
            log::debug!("[Deck] Dropping stale suggestions from generation {}", generation);
            return Ok(0);
        }

        match result {
            Ok(tracks) => {
                let received = tracks.len();
                let mut added = 0;
                for track in tracks {
                    if track.is_instruction()
                        || state.seen.contains(&track.id)
                        || state.excluded.contains(&track.id)
                        || filter_out.contains(&track.id)
                    {
                        continue;
                    }
                    state.seen.insert(track.id.clone());
                    state.queue.push_back(track);
                    added += 1;
                }
                state.error = None;
                log::info!(
                    "[Deck] Queued {} of {} suggestions ({} in deck)",
                    added,
                    received,
                    state.queue.len()
                );
                Ok(added)
            }
            Err(e) => {
                log::warn!("[Deck] Suggestion fetch failed: {}", e);
                state.error = Some(e.user_message());
                if state.queue.iter().all(Track::is_instruction) {
                    for track in &self.config.fallback_tracks {
                        if !state.seen.contains(&track.id) && !filter_out.contains(&track.id) {
                            state.seen.insert(track.id.clone());
                            state.queue.push_back(track.clone());
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Generation plus the ids to send as `excludeIds`: dislikes first, then
    /// likes, then everything queued this session.
    fn exclusion_snapshot(&self) -> (u64, Vec<TrackId>) {
        let (disliked, liked) = {
            let mut library = safe_lock(&self.library, "Deck");
            let disliked = library.excluded_ids(now_secs());
            let liked: Vec<TrackId> = library.liked().iter().map(|e| e.track_id.clone()).collect();
            (disliked, liked)
        };

        let state = safe_lock(&self.state, "Deck");
        let mut ids: Vec<TrackId> = Vec::new();
        let mut included: HashSet<TrackId> = HashSet::new();
        let candidates = disliked
            .into_iter()
            .chain(state.excluded.iter().cloned())
            .chain(liked)
            .chain(state.seen.iter().cloned());
        for id in candidates {
            if ids.len() >= EXCLUDE_IDS_LIMIT {
                break;
            }
            if included.insert(id.clone()) {
                ids.push(id);
            }
        }
        (state.generation, ids)
    }
}
