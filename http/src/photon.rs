use axum::Router;

/// A named model service. Its router is mounted under `/<name>`.
pub trait Photon: Send + Sync {
    fn name(&self) -> &'static str;
    fn router(&self) -> Router;
}
