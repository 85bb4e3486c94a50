use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use validator::Validate;

use photon_domain::{
    AudioBuffer, AudioCodecPort, BackgroundTaskPort, ContentSourcePort, JobId, JobOutcome,
    JobStatus, JobStorePort, TranscriptionOptions, TRANSCRIPTION_SAMPLE_RATE_HZ,
};

use crate::{
    ApplicationError, JobStatusResponse, TaskHandle, TranscribeRequest, TranscribeResponse,
    TranscriptionPipeline, UploadParams,
};

const INVALID_INPUT_MESSAGE: &str =
    "Invalid input. Please check your input, it should be an uploaded file, a url, or a base64 encoded string.";

#[async_trait]
pub trait TranscriptionUseCase: Send + Sync {
    async fn run(&self, request: TranscribeRequest)
        -> Result<TranscribeResponse, ApplicationError>;
    async fn run_upload(
        &self,
        content: Vec<u8>,
        params: UploadParams,
    ) -> Result<TaskHandle, ApplicationError>;
    async fn status(&self, task_id: &str) -> Result<JobStatusResponse, ApplicationError>;
    async fn result(&self, task_id: &str) -> Result<JobOutcome, ApplicationError>;
    async fn queue_length(&self) -> Result<usize, ApplicationError>;
}

#[derive(Debug, Clone)]
pub struct TranscriptionPolicy {
    pub supported_languages: Vec<String>,
    /// Audio shorter than this is transcribed inline.
    pub sync_threshold: Duration,
    /// Audio longer than this is rejected.
    pub max_duration: Duration,
}

impl TranscriptionPolicy {
    fn check_options(&self, options: &TranscriptionOptions) -> Result<(), ApplicationError> {
        if let Some(language) = options.language.as_deref() {
            if !self.supported_languages.iter().any(|lang| lang == language) {
                return Err(ApplicationError::Validation(format!(
                    "Unsupported language: {language}. Supported languages: {}",
                    self.supported_languages.join(", ")
                )));
            }
        }
        options.speakers.validate()?;
        Ok(())
    }
}

pub struct TranscriptionUseCaseImpl {
    pipeline: Arc<TranscriptionPipeline>,
    source: Arc<dyn ContentSourcePort>,
    codec: Arc<dyn AudioCodecPort>,
    jobs: Arc<dyn JobStorePort>,
    background: Arc<dyn BackgroundTaskPort>,
    policy: TranscriptionPolicy,
}

impl TranscriptionUseCaseImpl {
    pub fn new(
        pipeline: Arc<TranscriptionPipeline>,
        source: Arc<dyn ContentSourcePort>,
        codec: Arc<dyn AudioCodecPort>,
        jobs: Arc<dyn JobStorePort>,
        background: Arc<dyn BackgroundTaskPort>,
        policy: TranscriptionPolicy,
    ) -> Self {
        Self {
            pipeline,
            source,
            codec,
            jobs,
            background,
            policy,
        }
    }

    fn decode(&self, content: &[u8]) -> Result<AudioBuffer, ApplicationError> {
        self.codec
            .decode(content, TRANSCRIPTION_SAMPLE_RATE_HZ)
            .map_err(|err| {
                tracing::debug!(error = %err, "audio decode failed");
                ApplicationError::validation(INVALID_INPUT_MESSAGE)
            })
    }

    async fn enqueue(
        &self,
        audio: AudioBuffer,
        options: TranscriptionOptions,
    ) -> Result<TaskHandle, ApplicationError> {
        let id = JobId::generate();
        self.jobs.stage_input(id, &audio).await?;

        let pipeline = self.pipeline.clone();
        let jobs = self.jobs.clone();
        let task = run_background_job(pipeline, jobs, id, options).boxed();
        if let Err(err) = self.background.submit("transcription", task) {
            let _ = self.jobs.remove_input(id).await;
            return Err(err.into());
        }

        tracing::info!(
            task_id = %id,
            duration_secs = audio.duration_secs(),
            "queued background transcription"
        );
        sweep_quietly(self.jobs.as_ref()).await;
        Ok(TaskHandle {
            task_id: id.to_string(),
        })
    }
}

#[async_trait]
impl TranscriptionUseCase for TranscriptionUseCaseImpl {
    async fn run(
        &self,
        request: TranscribeRequest,
    ) -> Result<TranscribeResponse, ApplicationError> {
        request.validate()?;
        let options = request.options();
        self.policy.check_options(&options)?;

        let content = self.source.fetch(&request.input).await.map_err(|err| {
            tracing::debug!(error = %err, "audio input could not be resolved");
            ApplicationError::validation(INVALID_INPUT_MESSAGE)
        })?;
        let audio = self.decode(&content)?;
        let duration = Duration::from_secs_f64(audio.duration_secs());

        if duration < self.policy.sync_threshold {
            let started = Instant::now();
            let segments = self.pipeline.run(&audio, &options).await?;
            tracing::debug!(
                duration_secs = duration.as_secs_f64(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                segment_count = segments.len(),
                "finished inline transcription"
            );
            return Ok(TranscribeResponse::Segments(segments));
        }
        if duration > self.policy.max_duration {
            return Err(ApplicationError::Validation(format!(
                "Audio longer than {} minutes is not supported.",
                self.policy.max_duration.as_secs() / 60
            )));
        }

        self.enqueue(audio, options)
            .await
            .map(TranscribeResponse::Task)
    }

    async fn run_upload(
        &self,
        content: Vec<u8>,
        params: UploadParams,
    ) -> Result<TaskHandle, ApplicationError> {
        params.validate()?;
        let options = params.options();
        self.policy.check_options(&options)?;
        if content.is_empty() {
            return Err(ApplicationError::validation("uploaded file is empty"));
        }

        let audio = self.decode(&content)?;
        if Duration::from_secs_f64(audio.duration_secs()) > self.policy.max_duration {
            return Err(ApplicationError::Validation(format!(
                "Audio longer than {} minutes is not supported.",
                self.policy.max_duration.as_secs() / 60
            )));
        }
        self.enqueue(audio, options).await
    }

    async fn status(&self, task_id: &str) -> Result<JobStatusResponse, ApplicationError> {
        let Some(id) = JobId::parse(task_id) else {
            return Ok(JobStatusResponse {
                status: JobStatus::InvalidId,
            });
        };
        let status = self.jobs.status(id).await?;
        Ok(JobStatusResponse { status })
    }

    async fn result(&self, task_id: &str) -> Result<JobOutcome, ApplicationError> {
        let id = JobId::parse(task_id)
            .ok_or_else(|| ApplicationError::not_found("result not found"))?;
        if self.jobs.status(id).await? != JobStatus::Done {
            return Err(ApplicationError::not_found("result not found"));
        }
        self.jobs
            .read_result(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("result not found"))
    }

    async fn queue_length(&self) -> Result<usize, ApplicationError> {
        Ok(self.jobs.pending_count().await?)
    }
}

async fn run_background_job(
    pipeline: Arc<TranscriptionPipeline>,
    jobs: Arc<dyn JobStorePort>,
    id: JobId,
    options: TranscriptionOptions,
) {
    let started = Instant::now();
    let outcome = match jobs.load_input(id).await {
        Ok(audio) => {
            tracing::debug!(task_id = %id, sample_count = audio.samples.len(), "processing task");
            match pipeline.run(&audio, &options).await {
                Ok(segments) => {
                    let elapsed = started.elapsed().as_secs_f64();
                    tracing::debug!(
                        task_id = %id,
                        elapsed_secs = elapsed,
                        realtime_factor = audio.duration_secs() / elapsed.max(f64::EPSILON),
                        "finished processing task"
                    );
                    JobOutcome::Completed(segments)
                }
                Err(err) => {
                    tracing::error!(task_id = %id, error = %err, "background transcription failed");
                    JobOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            }
        }
        Err(err) => {
            tracing::error!(task_id = %id, error = %err, "cannot load staged audio");
            JobOutcome::Failed {
                error: format!("Cannot load staged audio. Detailed error message: {err}"),
            }
        }
    };

    if let Err(err) = jobs.write_result(id, &outcome).await {
        tracing::error!(task_id = %id, error = %err, "failed to store task result");
        return;
    }
    if let Err(err) = jobs.remove_input(id).await {
        tracing::warn!(task_id = %id, error = %err, "failed to remove staged input");
    }
    sweep_quietly(jobs.as_ref()).await;
}

async fn sweep_quietly(jobs: &dyn JobStorePort) {
    match jobs.sweep_if_due().await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "cleaned up expired results"),
        Err(err) => tracing::warn!(error = %err, "result cleanup failed"),
    }
}
