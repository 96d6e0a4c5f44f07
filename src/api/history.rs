// Play history endpoint
use super::ApiClient;
use crate::error::Result;
use crate::models::{PlayedTrack, TrackId};

impl ApiClient {
    /// `POST /api/v1/history/played`
    pub async fn record_played(&self, track_id: &TrackId, played_ms: Option<u64>) -> Result<()> {
        let body = PlayedTrack {
            track_id: track_id.clone(),
            played_ms,
        };
        self.post_raw("/api/v1/history/played", &body).await?;
        log::debug!("[History] Recorded play of {}", track_id);
        Ok(())
    }
}
