use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;

use photon_application::{
    CompletionRequest, CompletionResponse, GenerationUseCase, StreamGenerationRequest,
};

use crate::error::{error_mapper, HttpError};
use crate::extract::JsonBody;
use crate::photon::Photon;

type GenerationState = Arc<dyn GenerationUseCase>;

pub struct GenerationPhoton {
    use_case: GenerationState,
}

impl GenerationPhoton {
    pub fn new(use_case: GenerationState) -> Self {
        Self { use_case }
    }
}

impl Photon for GenerationPhoton {
    fn name(&self) -> &'static str {
        "generation"
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/run", post(run))
            .route("/complete", post(complete))
            .with_state(Arc::clone(&self.use_case))
    }
}

async fn run(
    State(use_case): State<GenerationState>,
    JsonBody(request): JsonBody<StreamGenerationRequest>,
) -> Result<Response, HttpError> {
    let tokens = use_case.stream(request).await.map_err(|error| {
        tracing::error!(error = %error, "failed to queue generation");
        error_mapper(error)
    })?;
    let body = Body::from_stream(tokens.map(|token| token.map(Bytes::from)));
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

async fn complete(
    State(use_case): State<GenerationState>,
    JsonBody(request): JsonBody<CompletionRequest>,
) -> Result<Json<CompletionResponse>, HttpError> {
    use_case.complete(request).await.map(Json).map_err(|error| {
        tracing::error!(error = %error, "completion failed");
        error_mapper(error)
    })
}
