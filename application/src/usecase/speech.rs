use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use photon_domain::{AudioCodecPort, ContentSourcePort, SpeechRequest, SpeechSynthesisPort};

use crate::{ApplicationError, SynthesizeSpeechRequest, SynthesizedSpeech};

const REFERENCE_VOICE_SAMPLE_RATE_HZ: u32 = 16_000;

#[async_trait]
pub trait SpeechUseCase: Send + Sync {
    fn models(&self) -> Vec<String>;
    fn languages(&self, model: Option<&str>) -> Result<Vec<String>, ApplicationError>;
    fn speakers(&self, model: Option<&str>) -> Result<Vec<String>, ApplicationError>;
    async fn synthesize(
        &self,
        request: SynthesizeSpeechRequest,
    ) -> Result<SynthesizedSpeech, ApplicationError>;
}

pub struct SpeechUseCaseImpl {
    models: BTreeMap<String, Arc<dyn SpeechSynthesisPort>>,
    default_model: String,
    source: Arc<dyn ContentSourcePort>,
    codec: Arc<dyn AudioCodecPort>,
}

impl SpeechUseCaseImpl {
    pub fn new(
        models: Vec<Arc<dyn SpeechSynthesisPort>>,
        default_model: String,
        source: Arc<dyn ContentSourcePort>,
        codec: Arc<dyn AudioCodecPort>,
    ) -> Result<Self, ApplicationError> {
        let models: BTreeMap<_, _> = models
            .into_iter()
            .map(|model| (model.info().name.clone(), model))
            .collect();
        if !models.contains_key(&default_model) {
            return Err(ApplicationError::Internal(format!(
                "default speech model {default_model} is not loaded"
            )));
        }
        Ok(Self {
            models,
            default_model,
            source,
            codec,
        })
    }

    fn model(&self, name: Option<&str>) -> Result<&Arc<dyn SpeechSynthesisPort>, ApplicationError> {
        let name = name.unwrap_or(&self.default_model);
        self.models
            .get(name)
            .ok_or_else(|| ApplicationError::NotFound(format!("Model {name} not loaded.")))
    }

    async fn reference_voice(
        &self,
        speaker_wav: Option<&str>,
        sample_rate_hz: u32,
    ) -> Result<Option<photon_domain::AudioBuffer>, ApplicationError> {
        let Some(reference) = speaker_wav else {
            return Ok(None);
        };
        let content = self.source.fetch(reference).await.map_err(|err| {
            ApplicationError::Validation(format!("Cannot read speaker_wav: {err}"))
        })?;
        let audio = self.codec.decode(&content, sample_rate_hz).map_err(|err| {
            ApplicationError::Validation(format!("Cannot decode speaker_wav: {err}"))
        })?;
        Ok(Some(audio))
    }
}

#[async_trait]
impl SpeechUseCase for SpeechUseCaseImpl {
    fn models(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    fn languages(&self, model: Option<&str>) -> Result<Vec<String>, ApplicationError> {
        Ok(self.model(model)?.info().languages.clone())
    }

    fn speakers(&self, model: Option<&str>) -> Result<Vec<String>, ApplicationError> {
        Ok(self.model(model)?.info().speakers.clone())
    }

    async fn synthesize(
        &self,
        request: SynthesizeSpeechRequest,
    ) -> Result<SynthesizedSpeech, ApplicationError> {
        let model = self.model(request.model.as_deref())?.clone();
        let info = model.info();
        request.validate()?;

        if !info.is_multi_lingual() && request.language.is_some() {
            return Err(ApplicationError::validation(
                "Model is not multi-lingual, you should not pass in language.",
            ));
        }
        if !info.is_multi_speaker() && request.speaker.is_some() {
            return Err(ApplicationError::validation(
                "Model is not multi-speaker, you should not pass in speaker.",
            ));
        }
        if info.is_multi_lingual() && request.language.is_none() {
            return Err(ApplicationError::validation(
                "Model is multi-lingual, you should pass in language. Use GET /languages to get available languages.",
            ));
        }
        if info.is_multi_speaker() && request.speaker.is_none() {
            return Err(ApplicationError::validation(
                "Model is multi-speaker, you should pass in speaker. Use GET /speakers to get available speakers.",
            ));
        }
        if let Some(language) = request.language.as_deref() {
            if !info.languages.iter().any(|known| known == language) {
                return Err(ApplicationError::Validation(format!(
                    "Unsupported language {language} for model {}.",
                    info.name
                )));
            }
        }
        if let Some(speaker) = request.speaker.as_deref() {
            if !info.speakers.iter().any(|known| known == speaker) {
                return Err(ApplicationError::Validation(format!(
                    "Unknown speaker {speaker} for model {}.",
                    info.name
                )));
            }
        }
        if info.voice_cloning && request.speaker_wav.is_none() {
            return Err(ApplicationError::validation(
                "Speaker wav file is not provided. This is necessary when running a voice cloning model.",
            ));
        }

        tracing::info!(
            model = %info.name,
            language = request.language.as_deref().unwrap_or("-"),
            speaker = request.speaker.as_deref().unwrap_or("-"),
            text_chars = request.text.chars().count(),
            "synthesizing speech"
        );

        let speaker_wav = self
            .reference_voice(request.speaker_wav.as_deref(), REFERENCE_VOICE_SAMPLE_RATE_HZ)
            .await?;
        let audio = model
            .synthesize(SpeechRequest {
                text: request.text,
                language: request.language,
                speaker: request.speaker,
                speaker_wav,
            })
            .await
            .map_err(|err| {
                ApplicationError::Internal(format!("Failed to synthesize speech. Details: {err}"))
            })?;
        let wav = self.codec.encode_wav(&audio)?;

        Ok(SynthesizedSpeech {
            wav,
            sample_rate_hz: audio.sample_rate_hz,
            duration_secs: audio.duration_secs(),
        })
    }
}
