//! devsign-assembly library
//!
//! Periodic submission and compliance tracking for assembly meetings:
//! window registry, submission records, artifact storage, period state
//! resolution, batch export and project titles, served over HTTP.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use devsign_common::config::UploadPolicy;
use devsign_common::Clock;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use services::ArtifactStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Blob storage for uploaded artifacts
    pub artifacts: ArtifactStore,
    /// Source of "today" for window gating
    pub clock: Arc<dyn Clock>,
    /// Accepted file extensions per slot
    pub uploads: Arc<UploadPolicy>,
    /// Upper bound on a submit request body
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        artifacts: ArtifactStore,
        clock: Arc<dyn Clock>,
        uploads: UploadPolicy,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            artifacts,
            clock,
            uploads: Arc::new(uploads),
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::period_routes())
        .merge(api::submission_routes(state.max_upload_bytes))
        .merge(api::artifact_routes())
        .merge(api::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
