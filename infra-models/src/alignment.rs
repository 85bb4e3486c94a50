use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use photon_domain::{
    AlignmentPort, AudioBuffer, DomainError, Transcript, TranscriptSegment, TranscriptWord,
};

const ESTIMATED_WORD_SCORE: f32 = 0.5;

struct LanguageAligner {
    language: String,
}

impl LanguageAligner {
    fn align_segment(&self, mut segment: TranscriptSegment, audio_end_ms: u64) -> TranscriptSegment {
        if !segment.words.is_empty() {
            return segment;
        }
        let end_ms = segment.end_ms.min(audio_end_ms).max(segment.start_ms);
        let words: Vec<&str> = segment.text.split_whitespace().collect();
        let total_chars: usize = words.iter().map(|word| word.chars().count()).sum();
        if total_chars == 0 {
            return segment;
        }

        let span = end_ms - segment.start_ms;
        let mut consumed = 0usize;
        let mut aligned = Vec::with_capacity(words.len());
        for word in words {
            let start = segment.start_ms + span * consumed as u64 / total_chars as u64;
            consumed += word.chars().count();
            let end = segment.start_ms + span * consumed as u64 / total_chars as u64;
            aligned.push(TranscriptWord {
                word: word.to_string(),
                start_ms: start,
                end_ms: end,
                score: ESTIMATED_WORD_SCORE,
                speaker: None,
            });
        }
        tracing::trace!(language = %self.language, words = aligned.len(), "aligned segment");
        segment.end_ms = end_ms;
        segment.words = aligned;
        segment
    }
}

/// Spreads each segment's words over its time span in proportion to their length.
/// One aligner per language, created on first use and cached.
#[derive(Default)]
pub struct UniformWordAligner {
    cache: Mutex<HashMap<String, Arc<LanguageAligner>>>,
}

impl UniformWordAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_languages(&self) -> Vec<String> {
        self.cache
            .lock()
            .map(|cache| {
                let mut languages: Vec<String> = cache.keys().cloned().collect();
                languages.sort();
                languages
            })
            .unwrap_or_default()
    }

    fn aligner(&self, language: &str) -> Result<Arc<LanguageAligner>, DomainError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| DomainError::internal_error("alignment cache lock poisoned"))?;
        let aligner = cache.entry(language.to_string()).or_insert_with(|| {
            tracing::info!(language, "loading alignment model");
            Arc::new(LanguageAligner {
                language: language.to_string(),
            })
        });
        Ok(Arc::clone(aligner))
    }
}

#[async_trait]
impl AlignmentPort for UniformWordAligner {
    async fn align(
        &self,
        transcript: Transcript,
        audio: &AudioBuffer,
    ) -> Result<Transcript, DomainError> {
        if transcript.language.trim().is_empty() {
            return Err(DomainError::invalid_input("transcript has no language"));
        }
        let aligner = self.aligner(&transcript.language)?;
        let audio_end_ms = (audio.duration_secs() * 1_000.0).round() as u64;
        let segments = transcript
            .segments
            .into_iter()
            .map(|segment| aligner.align_segment(segment, audio_end_ms))
            .collect();
        Ok(Transcript {
            language: transcript.language,
            segments,
        })
    }
}
