use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use photon_application::{
    EmbeddingUseCase, EncodeQueriesRequest, EncodeRequest, EncodeResponse, RankRequest,
    RankResponse,
};

use crate::error::{error_mapper, HttpError};
use crate::extract::JsonBody;
use crate::photon::Photon;

type EmbeddingState = Arc<dyn EmbeddingUseCase>;

pub struct EmbeddingPhoton {
    use_case: EmbeddingState,
}

impl EmbeddingPhoton {
    pub fn new(use_case: EmbeddingState) -> Self {
        Self { use_case }
    }
}

impl Photon for EmbeddingPhoton {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/encode", post(encode))
            .route("/encode_queries", post(encode_queries))
            .route("/rank", post(rank))
            .with_state(Arc::clone(&self.use_case))
    }
}

async fn encode(
    State(use_case): State<EmbeddingState>,
    JsonBody(request): JsonBody<EncodeRequest>,
) -> Result<Json<EncodeResponse>, HttpError> {
    use_case.encode(request).await.map(Json).map_err(error_mapper)
}

async fn encode_queries(
    State(use_case): State<EmbeddingState>,
    JsonBody(request): JsonBody<EncodeQueriesRequest>,
) -> Result<Json<EncodeResponse>, HttpError> {
    use_case
        .encode_queries(request)
        .await
        .map(Json)
        .map_err(error_mapper)
}

async fn rank(
    State(use_case): State<EmbeddingState>,
    JsonBody(request): JsonBody<RankRequest>,
) -> Result<Json<RankResponse>, HttpError> {
    let candidates = request.sentences.len();
    match use_case.rank(request).await {
        Ok(ranked) => {
            tracing::debug!(candidates, "ranked sentences");
            Ok(Json(ranked))
        }
        Err(error) => {
            tracing::error!(error = %error, "rank failed");
            Err(error_mapper(error))
        }
    }
}
