/// Play history reporting
use crate::api::ApiClient;
use crate::models::TrackId;
use crate::utils::async_helper::spawn_fire_and_forget;

/// Report a finished or skipped preview; failures are only logged
pub fn report_played_in_background(client: &ApiClient, track_id: TrackId, played_ms: Option<u64>) {
    if !client.has_bearer_token() {
        return;
    }
    let client = client.clone();
    spawn_fire_and_forget("History", async move {
        if let Err(e) = client.record_played(&track_id, played_ms).await {
            log::warn!("[History] Failed to record play of {}: {}", track_id, e);
        }
    });
}
