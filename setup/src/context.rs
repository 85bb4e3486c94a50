use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Error};
use tokio::task::JoinHandle;

use photon_application::{
    DocumentUseCaseImpl, EmbeddingUseCaseImpl, GenerationUseCaseImpl, SpeechUseCaseImpl,
    TranscriptionPipeline, TranscriptionPolicy, TranscriptionUseCaseImpl, VisionUseCaseImpl,
};
use photon_configuration::{AppConfig, SpeechModelConfig};
use photon_domain::{
    AudioCodecPort, ContentSourcePort, JobStorePort, SpeechModelInfo, SpeechSynthesisPort,
};
use photon_http_server::{
    ClipPhoton, EmbeddingPhoton, GenerationPhoton, NougatPhoton, Photon, TtsPhoton,
    WhisperxPhoton,
};
use photon_infra_asr_whisper::{build_transcriber, EnergyVadConfig, WhisperAdapterConfig};
use photon_infra_audio::{HttpContentSource, WavAudioCodec};
use photon_infra_jobs::{
    spawn_periodic_sweep, BackgroundTaskQueue, DiskJobStore, DiskJobStoreConfig,
    GenerationWorkerQueue,
};
use photon_infra_models::{
    embedding_model_spec, DocumentPageReader, HashingEmbedder, ImageCodec, PaletteEmbedder,
    PauseDiarizer, PauseDiarizerConfig, PromptEchoGenerator, ToneSpeechConfig,
    ToneSpeechSynthesizer, UniformWordAligner,
};

pub const KNOWN_PHOTONS: &[&str] = &[
    "whisperx",
    "tts",
    "embedding",
    "clip",
    "generation",
    "nougat",
];

/// Loaded model handles for every enabled photon, built once at startup.
pub struct ServiceContext {
    photons: Vec<Arc<dyn Photon>>,
    background: Vec<JoinHandle<()>>,
}

impl ServiceContext {
    pub async fn build(config: &AppConfig) -> Result<Self, Error> {
        let service = &config.service;
        for name in &service.photons.enabled {
            if !KNOWN_PHOTONS.contains(&name.as_str()) {
                tracing::warn!(photon = %name, "ignoring unknown photon in enable list");
            }
        }

        let source: Arc<dyn ContentSourcePort> = Arc::new(HttpContentSource::new(
            Duration::from_secs(service.audio.fetch_timeout_secs),
            service.audio.max_input_bytes,
        )?);
        let codec: Arc<dyn AudioCodecPort> = Arc::new(WavAudioCodec::new());

        let mut photons: Vec<Arc<dyn Photon>> = Vec::new();
        let mut background = Vec::new();

        if service.photons.is_enabled("whisperx") {
            let (photon, sweeper) =
                Self::whisperx(config, Arc::clone(&source), Arc::clone(&codec)).await?;
            photons.push(photon);
            background.push(sweeper);
        }
        if service.photons.is_enabled("tts") {
            photons.push(Self::tts(config, Arc::clone(&source), Arc::clone(&codec))?);
        }
        if service.photons.is_enabled("embedding") {
            photons.push(Self::embedding(config)?);
        }
        if service.photons.is_enabled("clip") {
            photons.push(Self::clip(config, Arc::clone(&source)));
        }
        if service.photons.is_enabled("generation") {
            let queue = GenerationWorkerQueue::new(
                Arc::new(PromptEchoGenerator::new()),
                service.generation.max_concurrency,
            );
            let use_case = GenerationUseCaseImpl::new(
                Arc::new(queue),
                service.generation.max_new_tokens_limit,
            );
            photons.push(Arc::new(GenerationPhoton::new(Arc::new(use_case))));
        }
        if service.photons.is_enabled("nougat") {
            let use_case = DocumentUseCaseImpl::new(
                Arc::clone(&source),
                Arc::new(DocumentPageReader::new()),
                service.document.batch_size,
            );
            photons.push(Arc::new(NougatPhoton::new(Arc::new(use_case))));
        }

        tracing::info!(
            photons = ?photons.iter().map(|photon| photon.name()).collect::<Vec<_>>(),
            "service context ready"
        );
        Ok(Self {
            photons,
            background,
        })
    }

    pub fn photons(&self) -> &[Arc<dyn Photon>] {
        &self.photons
    }

    pub fn shutdown(&self) {
        for task in &self.background {
            task.abort();
        }
    }

    async fn whisperx(
        config: &AppConfig,
        source: Arc<dyn ContentSourcePort>,
        codec: Arc<dyn AudioCodecPort>,
    ) -> Result<(Arc<dyn Photon>, JoinHandle<()>), Error> {
        let asr = &config.service.asr;
        let whisperx = &config.service.whisperx;
        let diarization = &config.service.diarization;

        let transcriber = build_transcriber(
            WhisperAdapterConfig {
                model_path: asr.model_path.clone(),
                temperature: asr.temperature,
                threads: asr.threads,
                dtw_preset: asr.dtw_preset.clone(),
                dtw_mem_size: asr.dtw_mem_size,
            },
            EnergyVadConfig {
                threshold: asr.vad_threshold,
                default_language: asr.default_language.clone(),
                ..EnergyVadConfig::default()
            },
        );
        let pipeline = TranscriptionPipeline::new(
            transcriber,
            Arc::new(UniformWordAligner::new()),
            Arc::new(PauseDiarizer::new(PauseDiarizerConfig {
                turn_gap_ms: diarization.turn_gap_ms,
                threshold: diarization.threshold,
                ..PauseDiarizerConfig::default()
            })),
        );

        let cleanup_interval = Duration::from_secs(whisperx.cleanup_interval_secs);
        let store = DiskJobStore::open(DiskJobStoreConfig {
            root: PathBuf::from(&whisperx.output_root),
            max_result_age: Duration::from_secs(whisperx.max_result_age_secs),
            cleanup_interval,
        })
        .await?;
        let jobs: Arc<dyn JobStorePort> = Arc::new(store);
        let sweeper = spawn_periodic_sweep(Arc::clone(&jobs), cleanup_interval);

        let use_case = TranscriptionUseCaseImpl::new(
            Arc::new(pipeline),
            source,
            codec,
            jobs,
            Arc::new(BackgroundTaskQueue::new(whisperx.workers)),
            TranscriptionPolicy {
                supported_languages: whisperx.supported_languages.clone(),
                sync_threshold: Duration::from_secs(whisperx.sync_threshold_secs),
                max_duration: Duration::from_secs(whisperx.max_duration_secs),
            },
        );
        tracing::info!(
            output_root = %whisperx.output_root,
            workers = whisperx.workers,
            sync_threshold_secs = whisperx.sync_threshold_secs,
            "whisperx photon ready"
        );
        Ok((Arc::new(WhisperxPhoton::new(Arc::new(use_case))), sweeper))
    }

    fn tts(
        config: &AppConfig,
        source: Arc<dyn ContentSourcePort>,
        codec: Arc<dyn AudioCodecPort>,
    ) -> Result<Arc<dyn Photon>, Error> {
        let tts = &config.service.tts;
        let models = tts
            .models_to_load()
            .into_iter()
            .map(|name| {
                let model = tts
                    .models
                    .iter()
                    .find(|model| model.name == name)
                    .ok_or_else(|| anyhow!("unknown speech model {name}"))?;
                let synthesizer: Arc<dyn SpeechSynthesisPort> = Arc::new(
                    ToneSpeechSynthesizer::new(
                        speech_model_info(model),
                        ToneSpeechConfig {
                            sample_rate_hz: tts.sample_rate_hz,
                            ..ToneSpeechConfig::default()
                        },
                    ),
                );
                Ok(synthesizer)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let use_case =
            SpeechUseCaseImpl::new(models, tts.default_model.trim().to_string(), source, codec)?;
        Ok(Arc::new(TtsPhoton::new(Arc::new(use_case))))
    }

    fn embedding(config: &AppConfig) -> Result<Arc<dyn Photon>, Error> {
        let embedding = &config.service.embedding;
        let spec = embedding_model_spec(&embedding.model_name, embedding.query_instruction.clone())?;
        tracing::info!(
            model = %spec.name,
            normalize_embeddings = embedding.normalize_embeddings,
            "embedding photon ready"
        );
        let model = HashingEmbedder::new(
            spec,
            embedding.dimensions,
            embedding.normalize_embeddings,
        );
        let use_case = EmbeddingUseCaseImpl::new(Arc::new(model));
        Ok(Arc::new(EmbeddingPhoton::new(Arc::new(use_case))))
    }

    fn clip(config: &AppConfig, source: Arc<dyn ContentSourcePort>) -> Arc<dyn Photon> {
        let clip = &config.service.clip;
        let model_name = format!("{}/{}", clip.model_name, clip.pretrained);
        tracing::info!(model = %model_name, dimensions = clip.dimensions, "clip photon ready");
        let use_case = VisionUseCaseImpl::new(
            source,
            Arc::new(ImageCodec::new()),
            Arc::new(PaletteEmbedder::new(model_name, clip.dimensions)),
        );
        Arc::new(ClipPhoton::new(Arc::new(use_case)))
    }
}

fn speech_model_info(model: &SpeechModelConfig) -> SpeechModelInfo {
    SpeechModelInfo {
        name: model.name.clone(),
        languages: model.languages.clone(),
        speakers: model.speakers.clone(),
        voice_cloning: model.voice_cloning,
    }
}
