use async_trait::async_trait;
use photon_domain::{
    AudioBuffer, DomainError, Transcript, TranscriptSegment, TranscriptionPort,
    TranscriptionRequest,
};

#[derive(Debug, Clone)]
pub struct EnergyVadConfig {
    pub frame_ms: u32,
    pub threshold: f32,
    pub min_silence_ms: u64,
    pub min_speech_ms: u64,
    pub default_language: String,
    pub placeholder_text: String,
}

impl Default for EnergyVadConfig {
    fn default() -> Self {
        Self {
            frame_ms: 30,
            threshold: 0.02,
            min_silence_ms: 300,
            min_speech_ms: 200,
            default_language: "en".to_string(),
            placeholder_text: "[speech]".to_string(),
        }
    }
}

/// Splits audio into voiced regions by frame RMS. Used when no recognizer is compiled in.
pub struct EnergyVadTranscriber {
    config: EnergyVadConfig,
}

impl EnergyVadTranscriber {
    pub fn new(config: EnergyVadConfig) -> Self {
        Self { config }
    }

    fn voiced_regions(&self, audio: &AudioBuffer) -> Vec<(u64, u64)> {
        let frame_len =
            ((audio.sample_rate_hz as u64 * self.config.frame_ms as u64) / 1_000).max(1) as usize;
        let frame_ms = self.config.frame_ms.max(1) as u64;

        let mut regions: Vec<(u64, u64)> = Vec::new();
        for (idx, frame) in audio.samples.chunks(frame_len).enumerate() {
            let energy = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            if energy.sqrt() < self.config.threshold {
                continue;
            }
            let start_ms = idx as u64 * frame_ms;
            let end_ms = start_ms + frame.len() as u64 * 1_000 / audio.sample_rate_hz.max(1) as u64;
            match regions.last_mut() {
                Some(last) if start_ms.saturating_sub(last.1) < self.config.min_silence_ms => {
                    last.1 = end_ms;
                }
                _ => regions.push((start_ms, end_ms)),
            }
        }
        regions.retain(|(start, end)| end - start >= self.config.min_speech_ms);
        regions
    }
}

#[async_trait]
impl TranscriptionPort for EnergyVadTranscriber {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcript, DomainError> {
        if request.audio.sample_rate_hz == 0 {
            return Err(DomainError::invalid_input("audio has no sample rate"));
        }
        let segments = self
            .voiced_regions(&request.audio)
            .into_iter()
            .map(|(start_ms, end_ms)| TranscriptSegment {
                text: self.config.placeholder_text.clone(),
                start_ms,
                end_ms,
                words: Vec::new(),
                speaker: None,
            })
            .collect::<Vec<_>>();
        tracing::debug!(segments = segments.len(), "energy segmentation finished");
        Ok(Transcript {
            language: request
                .language
                .unwrap_or_else(|| self.config.default_language.clone()),
            segments,
        })
    }
}
