use serde::{Deserialize, Serialize};
use validator::Validate;

use photon_domain::{JobStatus, SpeakerHints, TranscriptSegment, TranscriptionOptions};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TranscribeRequest {
    /// An http(s) URL or a base64 encoded audio file.
    #[validate(length(min = 1))]
    pub input: String,
    #[validate(length(min = 1, max = 16))]
    pub language: Option<String>,
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
    #[serde(default)]
    pub transcribe_only: bool,
}

impl TranscribeRequest {
    pub fn options(&self) -> TranscriptionOptions {
        TranscriptionOptions {
            language: self.language.clone(),
            speakers: SpeakerHints::new(self.min_speakers, self.max_speakers),
            transcribe_only: self.transcribe_only,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UploadParams {
    #[validate(length(min = 1, max = 16))]
    pub language: Option<String>,
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
    #[serde(default)]
    pub transcribe_only: bool,
}

impl UploadParams {
    pub fn options(&self) -> TranscriptionOptions {
        TranscriptionOptions {
            language: self.language.clone(),
            speakers: SpeakerHints::new(self.min_speakers, self.max_speakers),
            transcribe_only: self.transcribe_only,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TranscribeResponse {
    Segments(Vec<TranscriptSegment>),
    Task(TaskHandle),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskQuery {
    pub task_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
}
