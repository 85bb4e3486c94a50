use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use photon_domain::{AudioBuffer, DomainError, SpeechModelInfo, SpeechRequest, SpeechSynthesisPort};

#[derive(Debug, Clone)]
pub struct ToneSpeechConfig {
    pub sample_rate_hz: u32,
    pub char_ms: u32,
    pub base_pitch_hz: f32,
}

impl Default for ToneSpeechConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 22_050,
            char_ms: 60,
            base_pitch_hz: 180.0,
        }
    }
}

struct ToneVoice {
    config: ToneSpeechConfig,
    phase: f32,
}

impl ToneVoice {
    fn render(&mut self, text: &str, pitch_hz: f32) -> Vec<f32> {
        let per_char =
            (self.config.sample_rate_hz as u64 * self.config.char_ms as u64 / 1_000) as usize;
        let rate = self.config.sample_rate_hz as f32;
        let mut samples = Vec::with_capacity(per_char * text.chars().count());
        for ch in text.chars() {
            if ch.is_whitespace() {
                samples.extend(std::iter::repeat(0.0).take(per_char));
                continue;
            }
            let step = (u32::from(ch) % 12) as f32;
            let freq = pitch_hz * 2f32.powf(step / 12.0);
            for idx in 0..per_char {
                let envelope = (idx as f32 / per_char as f32 * std::f32::consts::PI).sin();
                samples.push(0.3 * envelope * self.phase.sin());
                self.phase = (self.phase + TAU * freq / rate) % TAU;
            }
        }
        samples
    }
}

/// Renders text as a sequence of pitched tones. One voice handle per model,
/// used by one request at a time.
pub struct ToneSpeechSynthesizer {
    info: SpeechModelInfo,
    voice: Arc<Mutex<ToneVoice>>,
}

impl ToneSpeechSynthesizer {
    pub fn new(info: SpeechModelInfo, config: ToneSpeechConfig) -> Self {
        tracing::info!(model = %info.name, "loaded speech model");
        Self {
            info,
            voice: Arc::new(Mutex::new(ToneVoice { config, phase: 0.0 })),
        }
    }

    fn pitch_for(&self, request: &SpeechRequest, base_pitch_hz: f32) -> f32 {
        let mut pitch = base_pitch_hz;
        if let Some(speaker) = request.speaker.as_deref() {
            let position = self.info.speakers.iter().position(|known| known == speaker);
            pitch *= 1.0 + 0.15 * position.unwrap_or(0) as f32;
        }
        if let Some(reference) = request.speaker_wav.as_ref() {
            pitch = reference_pitch(reference).unwrap_or(pitch);
        }
        pitch
    }
}

/// Rough fundamental from the zero-crossing rate of the reference clip.
fn reference_pitch(reference: &AudioBuffer) -> Option<f32> {
    if reference.samples.len() < 2 || reference.sample_rate_hz == 0 {
        return None;
    }
    let crossings = reference
        .samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    let pitch = crossings as f32 / 2.0 / reference.duration_secs() as f32;
    (60.0..=600.0).contains(&pitch).then_some(pitch)
}

#[async_trait]
impl SpeechSynthesisPort for ToneSpeechSynthesizer {
    fn info(&self) -> &SpeechModelInfo {
        &self.info
    }

    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioBuffer, DomainError> {
        if request.text.trim().is_empty() {
            return Err(DomainError::invalid_input("text is empty"));
        }
        let base_pitch_hz = {
            let voice = self
                .voice
                .lock()
                .map_err(|_| DomainError::internal_error("speech model lock poisoned"))?;
            voice.config.base_pitch_hz
        };
        let pitch = self.pitch_for(&request, base_pitch_hz);
        let voice = Arc::clone(&self.voice);
        tokio::task::spawn_blocking(move || {
            let mut voice = voice
                .lock()
                .map_err(|_| DomainError::internal_error("speech model lock poisoned"))?;
            let samples = voice.render(&request.text, pitch);
            Ok(AudioBuffer::new(voice.config.sample_rate_hz, samples))
        })
        .await
        .map_err(|err| DomainError::internal_error(&format!("speech worker failed: {err}")))?
    }
}
