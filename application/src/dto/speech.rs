use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SynthesizeSpeechRequest {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
    pub model: Option<String>,
    pub language: Option<String>,
    pub speaker: Option<String>,
    /// Reference voice for cloning models, as a URL or base64 encoded WAV.
    pub speaker_wav: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelQuery {
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub wav: Vec<u8>,
    pub sample_rate_hz: u32,
    pub duration_secs: f64,
}
