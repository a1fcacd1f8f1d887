//! HTTP API handlers for devsign-assembly

pub mod admin;
pub mod artifacts;
pub mod health;
pub mod periods;
pub mod submissions;

pub use admin::admin_routes;
pub use artifacts::artifact_routes;
pub use health::health_routes;
pub use periods::period_routes;
pub use submissions::submission_routes;
