use async_trait::async_trait;
use photon_domain::{AudioBuffer, DiarizationPort, DomainError, SpeakerTurn};

use crate::signal::voiced_regions;

#[derive(Debug, Clone)]
pub struct PauseDiarizerConfig {
    pub frame_ms: u32,
    pub threshold: f32,
    /// Silence at least this long hands the turn to the next speaker.
    pub turn_gap_ms: u64,
}

impl Default for PauseDiarizerConfig {
    fn default() -> Self {
        Self {
            frame_ms: 30,
            threshold: 0.02,
            turn_gap_ms: 700,
        }
    }
}

/// Turn taking from pauses. Without speaker hints everything is one speaker;
/// with hints, turns rotate through `min_speakers` labels.
pub struct PauseDiarizer {
    config: PauseDiarizerConfig,
}

impl PauseDiarizer {
    pub fn new(config: PauseDiarizerConfig) -> Self {
        Self { config }
    }
}

fn speaker_label(idx: u32) -> String {
    format!("SPEAKER_{idx:02}")
}

#[async_trait]
impl DiarizationPort for PauseDiarizer {
    async fn diarize(
        &self,
        audio: &AudioBuffer,
        speakers: Option<(u32, u32)>,
    ) -> Result<Vec<SpeakerTurn>, DomainError> {
        if audio.sample_rate_hz == 0 {
            return Err(DomainError::invalid_input("audio has no sample rate"));
        }
        let regions = voiced_regions(
            audio,
            self.config.frame_ms,
            self.config.threshold,
            self.config.turn_gap_ms,
        );
        let rotation = speakers.map_or(1, |(min, _)| min.max(1));
        let turns: Vec<SpeakerTurn> = regions
            .into_iter()
            .enumerate()
            .map(|(idx, (start_ms, end_ms))| SpeakerTurn {
                speaker: speaker_label(idx as u32 % rotation),
                start_ms,
                end_ms,
            })
            .collect();
        tracing::debug!(turns = turns.len(), rotation, "diarization finished");
        Ok(turns)
    }
}
