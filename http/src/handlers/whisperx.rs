use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;

use photon_application::{
    JobStatusResponse, TaskHandle, TaskQuery, TranscribeRequest, TranscribeResponse,
    TranscriptionUseCase, UploadParams,
};
use photon_domain::JobOutcome;

use crate::error::{error_mapper, HttpError};
use crate::extract::{QueryParams, ValidatedJson};
use crate::photon::Photon;

type WhisperxState = Arc<dyn TranscriptionUseCase>;

pub struct WhisperxPhoton {
    use_case: WhisperxState,
}

impl WhisperxPhoton {
    pub fn new(use_case: WhisperxState) -> Self {
        Self { use_case }
    }
}

impl Photon for WhisperxPhoton {
    fn name(&self) -> &'static str {
        "whisperx"
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/run", post(run))
            .route("/run_upload", post(run_upload))
            .route("/status", get(status))
            .route("/get_result", get(get_result))
            .route("/queue_length", get(queue_length))
            .with_state(Arc::clone(&self.use_case))
    }
}

async fn run(
    State(use_case): State<WhisperxState>,
    ValidatedJson(request): ValidatedJson<TranscribeRequest>,
) -> Result<Json<TranscribeResponse>, HttpError> {
    tracing::info!(
        language = request.language.as_deref().unwrap_or("auto"),
        min_speakers = request.min_speakers,
        max_speakers = request.max_speakers,
        transcribe_only = request.transcribe_only,
        "received transcription request"
    );
    match use_case.run(request).await {
        Ok(response) => {
            match &response {
                TranscribeResponse::Segments(segments) => {
                    tracing::info!(segment_count = segments.len(), "transcribed inline")
                }
                TranscribeResponse::Task(handle) => {
                    tracing::info!(task_id = %handle.task_id, "queued transcription job")
                }
            }
            Ok(Json(response))
        }
        Err(error) => {
            tracing::error!(error = %error, "transcription request failed");
            Err(error_mapper(error))
        }
    }
}

async fn run_upload(
    State(use_case): State<WhisperxState>,
    QueryParams(params): QueryParams<UploadParams>,
    body: Bytes,
) -> Result<Json<TaskHandle>, HttpError> {
    tracing::info!(upload_bytes = body.len(), "received transcription upload");
    use_case
        .run_upload(body.to_vec(), params)
        .await
        .map(Json)
        .map_err(|error| {
            tracing::error!(error = %error, "transcription upload failed");
            error_mapper(error)
        })
}

async fn status(
    State(use_case): State<WhisperxState>,
    QueryParams(query): QueryParams<TaskQuery>,
) -> Result<Json<JobStatusResponse>, HttpError> {
    use_case
        .status(&query.task_id)
        .await
        .map(Json)
        .map_err(error_mapper)
}

async fn get_result(
    State(use_case): State<WhisperxState>,
    QueryParams(query): QueryParams<TaskQuery>,
) -> Result<Json<JobOutcome>, HttpError> {
    use_case
        .result(&query.task_id)
        .await
        .map(Json)
        .map_err(error_mapper)
}

async fn queue_length(State(use_case): State<WhisperxState>) -> Result<Json<usize>, HttpError> {
    use_case.queue_length().await.map(Json).map_err(error_mapper)
}
