// Evaluation endpoints (like / dislike / skip)
use futures_util::future::{BoxFuture, FutureExt};

use super::ApiClient;
use crate::error::Result;
use crate::models::{Evaluation, EvaluationStatus, NewEvaluation, Page, TrackId};

/// Remote record of swipe judgments.
///
/// Writes are at-most-once and client-authoritative: the deck has already
/// moved on by the time the request completes, failures are only logged.
pub trait EvaluationSink: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn submit_evaluation(
        &self,
        track_id: TrackId,
        status: EvaluationStatus,
    ) -> BoxFuture<'static, Result<()>>;
}

impl ApiClient {
    /// `GET /api/v1/evaluations?status=&limit=&offset=`
    pub async fn list_evaluations(
        &self,
        status: Option<EvaluationStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Page<Evaluation>> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        self.get_page("/api/v1/evaluations", &query).await
    }

    /// `POST /api/v1/evaluations`. Returns the created record when the
    /// server echoes one back.
    pub async fn create_evaluation(
        &self,
        track_id: &TrackId,
        status: EvaluationStatus,
    ) -> Result<Option<Evaluation>> {
        let body = NewEvaluation {
            track_id: track_id.clone(),
            status,
        };
        let bytes = self.post_raw("/api/v1/evaluations", &body).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match crate::models::responses::decode_body::<Evaluation>(&bytes) {
            Ok(evaluation) => Ok(Some(evaluation)),
            Err(e) => {
                log::debug!("[Evaluations] Created, but response was not an evaluation: {}", e);
                Ok(None)
            }
        }
    }

    /// `DELETE /api/v1/evaluations/{id}`
    pub async fn delete_evaluation(&self, evaluation_id: &str) -> Result<()> {
        let path = format!(
            "/api/v1/evaluations/{}",
            urlencoding::encode(evaluation_id)
        );
        self.delete(&path).await
    }
}

impl EvaluationSink for ApiClient {
    fn is_authenticated(&self) -> bool {
        self.has_bearer_token()
    }

    fn submit_evaluation(
        &self,
        track_id: TrackId,
        status: EvaluationStatus,
    ) -> BoxFuture<'static, Result<()>> {
        let client = self.clone();
        async move { client.create_evaluation(&track_id, status).await.map(|_| ()) }.boxed()
    }
}
