/// Evaluation service for posting swipe judgments to the server
///
/// Posts are at-most-once. The local library is authoritative, so a failed
/// post is logged and dropped rather than retried.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::api::EvaluationSink;
use crate::error::Result;
use crate::models::{EvaluationStatus, TrackId};
use crate::state::SessionStore;
use crate::utils::async_helper::spawn_fire_and_forget;

/// Sink that follows the session's auth state and tops up the access token
/// before each post, so a long-lived deck keeps posting after expiry.
pub struct SessionEvaluationSink {
    session: SessionStore,
    inner: Arc<dyn EvaluationSink>,
}

impl SessionEvaluationSink {
    pub fn new(session: SessionStore, inner: Arc<dyn EvaluationSink>) -> Self {
        Self { session, inner }
    }
}

impl EvaluationSink for SessionEvaluationSink {
    fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    fn submit_evaluation(&self, track_id: TrackId, status: EvaluationStatus) -> BoxFuture<'static, Result<()>> {
        let session = self.session.clone();
        let inner = Arc::clone(&self.inner);
        async move {
            session.ensure_fresh_token().await?;
            inner.submit_evaluation(track_id, status).await
        }
        .boxed()
    }
}

/// Post an evaluation without blocking the caller
///
/// The request is created immediately; only the network round-trip runs in
/// the background.
pub fn submit_in_background(sink: Arc<dyn EvaluationSink>, track_id: TrackId, status: EvaluationStatus) {
    if !sink.is_authenticated() {
        log::debug!("[Evaluation] Not authenticated - {} for {} kept local", status, track_id);
        return;
    }

    let request = sink.submit_evaluation(track_id.clone(), status);
    spawn_fire_and_forget("Evaluation", async move {
        match request.await {
            Ok(()) => log::info!("[Evaluation] Posted {} for track {}", status, track_id),
            Err(e) => log::warn!("[Evaluation] Failed to post {} for track {}: {}", status, track_id, e),
        }
    });
}
