// Operational / diagnostic endpoints
use serde_json::Value;

use super::ApiClient;
use crate::error::Result;
use crate::models::ServiceStatus;

impl ApiClient {
    /// `GET /health`
    pub async fn health(&self) -> Result<ServiceStatus> {
        self.get_json("/health", &[]).await
    }

    /// `GET /queue/health`
    pub async fn queue_health(&self) -> Result<ServiceStatus> {
        self.get_json("/queue/health", &[]).await
    }

    /// `GET /queue/stats`
    pub async fn queue_stats(&self) -> Result<ServiceStatus> {
        self.get_json("/queue/stats", &[]).await
    }

    /// `GET /worker/stats`
    pub async fn worker_stats(&self) -> Result<ServiceStatus> {
        self.get_json("/worker/stats", &[]).await
    }

    /// `POST /worker/trigger-refill`, the only diagnostic call with a side effect
    pub async fn trigger_refill(&self) -> Result<ServiceStatus> {
        log::info!("[Worker] Triggering suggestion pool refill");
        self.post_json("/worker/trigger-refill", &Value::Object(Default::default()))
            .await
    }

    /// Every read-only diagnostic endpoint, in display order
    pub async fn diagnostics(&self) -> Vec<(&'static str, Result<ServiceStatus>)> {
        vec![
            ("health", self.health().await),
            ("queue/health", self.queue_health().await),
            ("queue/stats", self.queue_stats().await),
            ("worker/stats", self.worker_stats().await),
        ]
    }
}
