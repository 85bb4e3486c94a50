use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::{
    AudioBuffer, DecodedImage, DomainError, Embedding, EmbeddingModelSpec, GenerationRequest,
    GenerationStats, JobId, JobOutcome, JobStatus, SpeakerTurn, SpeechModelInfo, SpeechRequest,
    Transcript, TranscriptionRequest,
};

pub type TokenStream = BoxStream<'static, Result<String, DomainError>>;

#[async_trait]
pub trait TranscriptionPort: Send + Sync {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcript, DomainError>;
}

#[async_trait]
pub trait AlignmentPort: Send + Sync {
    async fn align(
        &self,
        transcript: Transcript,
        audio: &AudioBuffer,
    ) -> Result<Transcript, DomainError>;
}

#[async_trait]
pub trait DiarizationPort: Send + Sync {
    async fn diarize(
        &self,
        audio: &AudioBuffer,
        speakers: Option<(u32, u32)>,
    ) -> Result<Vec<SpeakerTurn>, DomainError>;
}

/// Resolves a client supplied reference (URL or base64 payload) to raw bytes.
#[async_trait]
pub trait ContentSourcePort: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, DomainError>;
}

pub trait AudioCodecPort: Send + Sync {
    /// Decodes a container into mono samples at `target_sample_rate_hz`.
    fn decode(&self, bytes: &[u8], target_sample_rate_hz: u32) -> Result<AudioBuffer, DomainError>;
    fn encode_wav(&self, audio: &AudioBuffer) -> Result<Vec<u8>, DomainError>;
}

#[async_trait]
pub trait JobStorePort: Send + Sync {
    async fn stage_input(&self, id: JobId, audio: &AudioBuffer) -> Result<(), DomainError>;
    async fn load_input(&self, id: JobId) -> Result<AudioBuffer, DomainError>;
    async fn remove_input(&self, id: JobId) -> Result<(), DomainError>;
    async fn write_result(&self, id: JobId, outcome: &JobOutcome) -> Result<(), DomainError>;
    async fn read_result(&self, id: JobId) -> Result<Option<JobOutcome>, DomainError>;
    async fn status(&self, id: JobId) -> Result<JobStatus, DomainError>;
    async fn pending_count(&self) -> Result<usize, DomainError>;
    /// Deletes results older than `max_age` as of `now`; returns how many were removed.
    async fn sweep(&self, now: SystemTime, max_age: Duration) -> Result<usize, DomainError>;
    /// Runs `sweep` when the cleanup interval has elapsed since the last run.
    async fn sweep_if_due(&self) -> Result<usize, DomainError>;
}

pub trait BackgroundTaskPort: Send + Sync {
    fn submit(&self, label: &'static str, task: BoxFuture<'static, ()>) -> Result<(), DomainError>;
}

#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    fn info(&self) -> &SpeechModelInfo;
    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioBuffer, DomainError>;
}

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    fn spec(&self) -> &EmbeddingModelSpec;
    fn normalizes_embeddings(&self) -> bool;
    async fn encode(&self, sentences: Vec<String>) -> Result<Vec<Embedding>, DomainError>;
}

pub trait ImageCodecPort: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DomainError>;
}

/// Embeds text and images into one space; embeddings are unit length.
#[async_trait]
pub trait VisionEmbeddingPort: Send + Sync {
    fn model_name(&self) -> &str;
    async fn embed_text(&self, text: &str) -> Result<Embedding, DomainError>;
    async fn embed_image(&self, image: &DecodedImage) -> Result<Embedding, DomainError>;
}

/// A generation model. Calls block for the whole decode and are driven from worker threads.
pub trait TextGenerationPort: Send + Sync {
    /// Feeds each decoded piece to `emit`; generation stops early when `emit` returns false.
    fn generate(
        &self,
        request: &GenerationRequest,
        emit: &mut dyn FnMut(&str) -> bool,
    ) -> Result<GenerationStats, DomainError>;
}

pub trait GenerationQueuePort: Send + Sync {
    fn submit(&self, request: GenerationRequest) -> Result<TokenStream, DomainError>;
}

#[async_trait]
pub trait DocumentReaderPort: Send + Sync {
    async fn page_count(&self, content: &[u8]) -> Result<u32, DomainError>;
    /// Renders the zero-based `pages` to markdown, in order.
    async fn render_pages(&self, content: &[u8], pages: &[usize])
        -> Result<Vec<String>, DomainError>;
}
