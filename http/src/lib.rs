use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

pub mod error;
pub mod extract;
pub mod handlers;
pub mod photon;

pub use error::{error_mapper, HttpError};
pub use extract::{JsonBody, QueryParams, ValidatedJson};
pub use handlers::*;
pub use photon::Photon;

/// `/health` plus every photon nested under `/<name>`.
pub fn create_router(photons: &[Arc<dyn Photon>], body_limit_bytes: usize) -> Router {
    let mut router = Router::new().route("/health", get(health_check));
    for photon in photons {
        tracing::info!(photon = photon.name(), "mounting photon");
        router = router.nest(&format!("/{}", photon.name()), photon.router());
    }
    // replaces axum's 2 MB default
    router.layer(DefaultBodyLimit::max(body_limit_bytes))
}
