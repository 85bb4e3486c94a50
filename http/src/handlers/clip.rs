use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use photon_application::{
    EmbedImageBytesRequest, EmbedImageRequest, EmbedQueryRequest, VisionUseCase,
};
use photon_domain::Embedding;

use crate::error::{error_mapper, HttpError};
use crate::extract::JsonBody;
use crate::photon::Photon;

type VisionState = Arc<dyn VisionUseCase>;

/// Joint text and image embeddings.
pub struct ClipPhoton {
    use_case: VisionState,
}

impl ClipPhoton {
    pub fn new(use_case: VisionState) -> Self {
        Self { use_case }
    }
}

impl Photon for ClipPhoton {
    fn name(&self) -> &'static str {
        "clip"
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/embed", post(embed))
            .route("/embed_text", post(embed_text))
            .route("/embed_image", post(embed_image))
            .route("/embed_image_bytes", post(embed_image_bytes))
            .with_state(Arc::clone(&self.use_case))
    }
}

async fn embed(
    State(use_case): State<VisionState>,
    JsonBody(request): JsonBody<EmbedQueryRequest>,
) -> Result<Json<Embedding>, HttpError> {
    use_case.embed(request).await.map(Json).map_err(error_mapper)
}

async fn embed_text(
    State(use_case): State<VisionState>,
    JsonBody(request): JsonBody<EmbedQueryRequest>,
) -> Result<Json<Embedding>, HttpError> {
    use_case.embed_text(request).await.map(Json).map_err(error_mapper)
}

async fn embed_image(
    State(use_case): State<VisionState>,
    JsonBody(request): JsonBody<EmbedImageRequest>,
) -> Result<Json<Embedding>, HttpError> {
    use_case
        .embed_image(request)
        .await
        .map(Json)
        .map_err(error_mapper)
}

async fn embed_image_bytes(
    State(use_case): State<VisionState>,
    JsonBody(request): JsonBody<EmbedImageBytesRequest>,
) -> Result<Json<Embedding>, HttpError> {
    use_case
        .embed_image_bytes(request)
        .await
        .map(Json)
        .map_err(error_mapper)
}
