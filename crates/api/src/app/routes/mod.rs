use axum::{routing::get, Router};

pub mod common;
pub mod me;
pub mod riders;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stats", get(riders::dashboard_stats))
        .nest("/riders", riders::router())
        .nest("/me", me::router())
}
