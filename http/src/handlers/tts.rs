use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use photon_application::{ModelQuery, SpeechUseCase, SynthesizeSpeechRequest};

use crate::error::{error_mapper, HttpError};
use crate::extract::{JsonBody, QueryParams};
use crate::photon::Photon;

type TtsState = Arc<dyn SpeechUseCase>;

pub struct TtsPhoton {
    use_case: TtsState,
}

impl TtsPhoton {
    pub fn new(use_case: TtsState) -> Self {
        Self { use_case }
    }
}

impl Photon for TtsPhoton {
    fn name(&self) -> &'static str {
        "tts"
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/models", get(models))
            .route("/languages", get(languages))
            .route("/speakers", get(speakers))
            .route("/tts", post(synthesize))
            .with_state(Arc::clone(&self.use_case))
    }
}

async fn models(State(use_case): State<TtsState>) -> Json<Vec<String>> {
    Json(use_case.models())
}

async fn languages(
    State(use_case): State<TtsState>,
    QueryParams(query): QueryParams<ModelQuery>,
) -> Result<Json<Vec<String>>, HttpError> {
    use_case
        .languages(query.model.as_deref())
        .map(Json)
        .map_err(error_mapper)
}

async fn speakers(
    State(use_case): State<TtsState>,
    QueryParams(query): QueryParams<ModelQuery>,
) -> Result<Json<Vec<String>>, HttpError> {
    use_case
        .speakers(query.model.as_deref())
        .map(Json)
        .map_err(error_mapper)
}

// the use case validates fields after resolving the model
async fn synthesize(
    State(use_case): State<TtsState>,
    JsonBody(request): JsonBody<SynthesizeSpeechRequest>,
) -> Result<Response, HttpError> {
    let model = request.model.clone();
    match use_case.synthesize(request).await {
        Ok(speech) => {
            tracing::info!(
                model = model.as_deref().unwrap_or("default"),
                sample_rate_hz = speech.sample_rate_hz,
                duration_secs = speech.duration_secs,
                "synthesized speech"
            );
            Ok(([(header::CONTENT_TYPE, "audio/wav")], speech.wav).into_response())
        }
        Err(error) => {
            tracing::error!(error = %error, "speech synthesis failed");
            Err(error_mapper(error))
        }
    }
}
