//! Shared axum application state.

use std::sync::Arc;
use std::time::Instant;

use crate::application::upload_service::UploadService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UploadService>,
    pub started_at: Instant,
    /// Flips to `true` during graceful shutdown; `/health` reports 503
    /// while draining so a load balancer stops routing new traffic.
    pub draining: Arc<std::sync::atomic::AtomicBool>,
}

impl AppState {
    pub fn new(service: Arc<UploadService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
            draining: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }
}
