use std::collections::HashSet;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub type AppConfig = PhotonConfig;
pub type ConfigError = figment::Error;

pub const ENV_PREFIX: &str = "PHOTON_SERVICE__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `full`, `compact` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub asr: AsrRuntimeConfig,
    #[serde(default)]
    pub whisperx: WhisperxConfig,
    #[serde(default)]
    pub diarization: DiarizationConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub clip: ClipConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub photons: PhotonsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrRuntimeConfig {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_dtw_preset")]
    pub dtw_preset: String,
    #[serde(default = "default_dtw_mem_size")]
    pub dtw_mem_size: usize,
    /// Language reported by the fallback segmenter when none is requested.
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperxConfig {
    #[serde(default = "default_output_root")]
    pub output_root: String,
    #[serde(default = "default_max_result_age_secs")]
    pub max_result_age_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_sync_threshold_secs")]
    pub sync_threshold_secs: u64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
    #[serde(default = "default_whisperx_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationConfig {
    #[serde(default = "default_turn_gap_ms")]
    pub turn_gap_ms: u64,
    #[serde(default = "default_vad_threshold")]
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_model")]
    pub default_model: String,
    /// Comma separated; the default model is always loaded as well.
    #[serde(default)]
    pub preload_models: String,
    #[serde(default = "default_tts_models")]
    pub models: Vec<SpeechModelConfig>,
    #[serde(default = "default_tts_sample_rate")]
    pub sample_rate_hz: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechModelConfig {
    pub name: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub speakers: Vec<String>,
    #[serde(default)]
    pub voice_cloning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model_name: String,
    #[serde(default)]
    pub query_instruction: Option<String>,
    #[serde(default = "default_true")]
    pub normalize_embeddings: bool,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipConfig {
    #[serde(default = "default_clip_model")]
    pub model_name: String,
    #[serde(default = "default_clip_pretrained")]
    pub pretrained: String,
    #[serde(default = "default_clip_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_new_tokens_limit")]
    pub max_new_tokens_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotonsConfig {
    #[serde(default = "default_enabled_photons")]
    pub enabled: Vec<String>,
}

impl PhotonsConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|enabled| enabled == name)
    }
}

impl TtsConfig {
    /// Models to load at startup: the preload list plus the default model, deduplicated.
    pub fn models_to_load(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.preload_models
            .split(',')
            .chain(std::iter::once(self.default_model.as_str()))
            .map(str::trim)
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .map(str::to_string)
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

impl Default for AsrRuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            temperature: 0.0,
            threads: default_threads(),
            dtw_preset: default_dtw_preset(),
            dtw_mem_size: default_dtw_mem_size(),
            default_language: default_language(),
            vad_threshold: default_vad_threshold(),
        }
    }
}

impl Default for WhisperxConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            max_result_age_secs: default_max_result_age_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            sync_threshold_secs: default_sync_threshold_secs(),
            max_duration_secs: default_max_duration_secs(),
            supported_languages: default_supported_languages(),
            workers: default_whisperx_workers(),
        }
    }
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self {
            turn_gap_ms: default_turn_gap_ms(),
            threshold: default_vad_threshold(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            default_model: default_tts_model(),
            preload_models: String::new(),
            models: default_tts_models(),
            sample_rate_hz: default_tts_sample_rate(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model(),
            query_instruction: None,
            normalize_embeddings: true,
            dimensions: default_embedding_dimensions(),
        }
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            model_name: default_clip_model(),
            pretrained: default_clip_pretrained(),
            dimensions: default_clip_dimensions(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_new_tokens_limit: default_max_new_tokens_limit(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl Default for PhotonsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_photons(),
        }
    }
}

/// Defaults, then `config/<RUN_ENV>.toml` when present, then `PHOTON_SERVICE__*` variables
/// (`__` separates nested keys, e.g. `PHOTON_SERVICE__SERVER__PORT`).
pub fn figment() -> Figment {
    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());
    Figment::from(Serialized::defaults(PhotonConfig::default()))
        .merge(Toml::file(format!("config/{run_env}.toml")))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load_config() -> Result<PhotonConfig, ConfigError> {
    figment().extract()
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format.as_str() {
        "pretty" => registry.with(fmt::layer().pretty()).try_init(),
        "compact" => registry.with(fmt::layer().compact()).try_init(),
        _ => registry.with(fmt::layer()).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_max_input_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_model_path() -> String {
    "models/ggml-large-v2.bin".to_string()
}

fn default_threads() -> usize {
    4
}

fn default_dtw_preset() -> String {
    "large_v2".to_string()
}

fn default_dtw_mem_size() -> usize {
    128
}

fn default_language() -> String {
    "en".to_string()
}

fn default_vad_threshold() -> f32 {
    0.02
}

fn default_output_root() -> String {
    "/tmp/whisperx".to_string()
}

fn default_max_result_age_secs() -> u64 {
    24 * 60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    60 * 60
}

fn default_sync_threshold_secs() -> u64 {
    60
}

fn default_max_duration_secs() -> u64 {
    60 * 60
}

fn default_supported_languages() -> Vec<String> {
    ["en", "fr", "de", "es", "it", "ja", "zh", "nl", "uk", "pt"]
        .iter()
        .map(|language| language.to_string())
        .collect()
}

fn default_whisperx_workers() -> usize {
    1
}

fn default_turn_gap_ms() -> u64 {
    700
}

fn default_tts_model() -> String {
    "tts_models/en/vctk/vits".to_string()
}

fn default_tts_models() -> Vec<SpeechModelConfig> {
    vec![
        SpeechModelConfig {
            name: "tts_models/en/vctk/vits".to_string(),
            languages: Vec::new(),
            speakers: ["p225", "p226", "p227", "p228", "p229", "p230"]
                .iter()
                .map(|speaker| speaker.to_string())
                .collect(),
            voice_cloning: false,
        },
        SpeechModelConfig {
            name: "tts_models/en/ljspeech/vits".to_string(),
            languages: Vec::new(),
            speakers: Vec::new(),
            voice_cloning: false,
        },
        SpeechModelConfig {
            name: "tts_models/multilingual/multi-dataset/xtts_v1".to_string(),
            languages: [
                "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn",
            ]
            .iter()
            .map(|language| language.to_string())
            .collect(),
            speakers: Vec::new(),
            voice_cloning: true,
        },
    ]
}

fn default_tts_sample_rate() -> u32 {
    22_050
}

fn default_embedding_model() -> String {
    "BAAI/bge-large-en-v1.5".to_string()
}

fn default_embedding_dimensions() -> usize {
    1024
}

fn default_clip_model() -> String {
    "ViT-B-32-quickgelu".to_string()
}

fn default_clip_pretrained() -> String {
    "laion400m_e32".to_string()
}

fn default_clip_dimensions() -> usize {
    512
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_new_tokens_limit() -> usize {
    2048
}

fn default_batch_size() -> usize {
    4
}

fn default_enabled_photons() -> Vec<String> {
    ["whisperx", "tts", "embedding", "clip", "generation", "nougat"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}
