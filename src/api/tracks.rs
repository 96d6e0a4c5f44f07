// Track suggestion endpoints
use futures_util::future::{BoxFuture, FutureExt};

use super::ApiClient;
use crate::error::Result;
use crate::models::{Page, Track, TrackId};

/// Where the swipe deck gets its candidates from
pub trait SuggestionSource: Send + Sync {
    fn fetch_suggestions(
        &self,
        limit: usize,
        exclude_ids: Vec<TrackId>,
    ) -> BoxFuture<'static, Result<Vec<Track>>>;
}

impl ApiClient {
    /// `GET /api/v1/tracks/suggestions?limit=&excludeIds=`
    pub async fn suggestions(&self, limit: usize, exclude_ids: &[TrackId]) -> Result<Page<Track>> {
        let mut query = vec![("limit", limit.to_string())];
        if !exclude_ids.is_empty() {
            let joined = exclude_ids
                .iter()
                .map(TrackId::as_str)
                .collect::<Vec<_>>()
                .join(",");
            query.push(("excludeIds", joined));
        }

        let page: Page<Track> = self.get_page("/api/v1/tracks/suggestions", &query).await?;
        log::info!(
            "[Suggestions] Received {} tracks (limit {}, excluded {})",
            page.items.len(),
            limit,
            exclude_ids.len()
        );
        Ok(page)
    }
}

impl SuggestionSource for ApiClient {
    fn fetch_suggestions(
        &self,
        limit: usize,
        exclude_ids: Vec<TrackId>,
    ) -> BoxFuture<'static, Result<Vec<Track>>> {
        let client = self.clone();
        async move { client.suggestions(limit, &exclude_ids).await.map(|page| page.items) }.boxed()
    }
}
