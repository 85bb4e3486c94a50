use std::sync::Arc;

use photon_domain::{
    assign_word_speakers, AlignmentPort, AudioBuffer, DiarizationPort, DomainError,
    TranscriptSegment, TranscriptionOptions, TranscriptionPort, TranscriptionRequest,
};

/// Transcribe, then align and diarize unless the caller asked for a plain transcript.
pub struct TranscriptionPipeline {
    transcription: Arc<dyn TranscriptionPort>,
    alignment: Arc<dyn AlignmentPort>,
    diarization: Arc<dyn DiarizationPort>,
}

impl TranscriptionPipeline {
    pub fn new(
        transcription: Arc<dyn TranscriptionPort>,
        alignment: Arc<dyn AlignmentPort>,
        diarization: Arc<dyn DiarizationPort>,
    ) -> Self {
        Self {
            transcription,
            alignment,
            diarization,
        }
    }

    pub async fn run(
        &self,
        audio: &AudioBuffer,
        options: &TranscriptionOptions,
    ) -> Result<Vec<TranscriptSegment>, DomainError> {
        tracing::debug!(
            sample_count = audio.samples.len(),
            language = options.language.as_deref().unwrap_or("auto"),
            transcribe_only = options.transcribe_only,
            "started processing audio"
        );

        let transcript = self
            .transcription
            .transcribe(TranscriptionRequest {
                language: options.language.clone(),
                audio: audio.clone(),
            })
            .await?;
        if transcript.segments.is_empty() {
            tracing::debug!("empty transcript, skipping alignment and diarization");
            return Ok(Vec::new());
        }
        if options.transcribe_only {
            return Ok(transcript.segments);
        }

        let aligned = self.alignment.align(transcript, audio).await?;
        let speakers = options.speakers.effective();
        match self.diarization.diarize(audio, speakers).await {
            Ok(turns) => Ok(assign_word_speakers(&turns, aligned).segments),
            Err(error) => {
                tracing::error!(error = %error, "diarization failed, skipping");
                Ok(aligned.segments)
            }
        }
    }
}
