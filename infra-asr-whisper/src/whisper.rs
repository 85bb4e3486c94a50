use async_trait::async_trait;
use photon_domain::{
    DomainError, Transcript, TranscriptSegment, TranscriptWord, TranscriptionPort,
    TranscriptionRequest,
};
use whisper_rs::{
    DtwMode, DtwModelPreset, DtwParameters, FullParams, SamplingStrategy, WhisperContext,
    WhisperContextParameters,
};

use crate::{ExclusiveRuntime, WhisperAdapterConfig};

impl WhisperAdapterConfig {
    fn to_dtw_preset(&self) -> DtwModelPreset {
        match self.dtw_preset.to_ascii_lowercase().as_str() {
            "tiny_en" => DtwModelPreset::TinyEn,
            "tiny" => DtwModelPreset::Tiny,
            "base_en" => DtwModelPreset::BaseEn,
            "small_en" => DtwModelPreset::SmallEn,
            "small" => DtwModelPreset::Small,
            "medium_en" => DtwModelPreset::MediumEn,
            "medium" => DtwModelPreset::Medium,
            "large_v2" => DtwModelPreset::LargeV2,
            "large_v3" => DtwModelPreset::LargeV3,
            "large_v3_turbo" => DtwModelPreset::LargeV3Turbo,
            _ => DtwModelPreset::Base,
        }
    }
}

/// Loads the ggml model on first use and keeps it for the life of the process.
/// Decodes run one at a time.
pub struct WhisperTranscriptionAdapter {
    config: WhisperAdapterConfig,
    runtime: ExclusiveRuntime<WhisperContext>,
}

impl WhisperTranscriptionAdapter {
    pub fn new(config: WhisperAdapterConfig) -> Self {
        Self {
            config,
            runtime: ExclusiveRuntime::new(),
        }
    }
}

fn load_context(config: &WhisperAdapterConfig) -> Result<WhisperContext, DomainError> {
    let mut context_params = WhisperContextParameters::default();
    context_params.dtw_parameters = DtwParameters {
        mode: DtwMode::ModelPreset {
            model_preset: config.to_dtw_preset(),
        },
        dtw_mem_size: config.dtw_mem_size,
    };
    let context = WhisperContext::new_with_params(&config.model_path, context_params).map_err(
        |err| DomainError::external_service_error("whisper", &format!("failed to load model: {err}")),
    )?;
    tracing::info!(model_path = %config.model_path, "loaded whisper model");
    Ok(context)
}

#[async_trait]
impl TranscriptionPort for WhisperTranscriptionAdapter {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcript, DomainError> {
        let load_config = self.config.clone();
        let config = self.config.clone();
        self.runtime
            .run(
                move || load_context(&load_config),
                move |context| run_full(context, &config, request),
            )
            .await
    }
}

fn run_full(
    context: &WhisperContext,
    config: &WhisperAdapterConfig,
    request: TranscriptionRequest,
) -> Result<Transcript, DomainError> {
    let whisper_error =
        |stage: &str, err: whisper_rs::WhisperError| DomainError::external_service_error("whisper", &format!("{stage}: {err}"));

    let mut state = context
        .create_state()
        .map_err(|err| whisper_error("failed to create state", err))?;

    let language = request.language.as_deref().unwrap_or("auto");
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(config.threads as i32);
    params.set_language(Some(language));
    params.set_no_timestamps(false);
    params.set_token_timestamps(true);
    params.set_temperature(config.temperature);
    params.set_single_segment(false);
    params.set_print_realtime(false);
    params.set_print_progress(false);
    params.set_print_timestamps(false);

    state
        .full(params, &request.audio.samples)
        .map_err(|err| whisper_error("full decode failed", err))?;

    let detected = match request.language {
        Some(language) => language,
        None => state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .unwrap_or("en")
            .to_string(),
    };

    let mut segments = Vec::new();
    for idx in 0..state.full_n_segments() {
        let Some(segment) = state.get_segment(idx) else {
            continue;
        };
        // timestamps are in 10 ms units
        let start_ms = (segment.start_timestamp().max(0) as u64) * 10;
        let end_ms = (segment.end_timestamp().max(0) as u64) * 10;
        let text = segment
            .to_str_lossy()
            .map(|cow| cow.trim().to_string())
            .unwrap_or_default();

        let n_tokens = segment.n_tokens().max(0);
        let token_span = if n_tokens > 0 {
            (end_ms.saturating_sub(start_ms) / n_tokens as u64).max(1)
        } else {
            1
        };
        let mut words: Vec<TranscriptWord> = Vec::new();
        let mut probabilities: Vec<f32> = Vec::new();
        for token_idx in 0..n_tokens {
            let Some(token) = segment.get_token(token_idx) else {
                continue;
            };
            let piece = token
                .to_str_lossy()
                .map(|cow| cow.to_string())
                .unwrap_or_default();
            if piece.starts_with("[_") || piece.starts_with("<|") {
                continue;
            }
            let token_start = start_ms.saturating_add(token_idx as u64 * token_span);
            let token_end = token_start.saturating_add(token_span).min(end_ms);
            let starts_word = piece.starts_with(' ') || words.is_empty();
            if starts_word {
                close_word(&mut words, &mut probabilities);
                words.push(TranscriptWord {
                    word: piece.trim().to_string(),
                    start_ms: token_start,
                    end_ms: token_end,
                    score: 0.0,
                    speaker: None,
                });
            } else if let Some(current) = words.last_mut() {
                current.word.push_str(&piece);
                current.end_ms = token_end;
            }
            probabilities.push(token.token_probability());
        }
        close_word(&mut words, &mut probabilities);
        words.retain(|word| !word.word.is_empty());

        segments.push(TranscriptSegment {
            text,
            start_ms,
            end_ms,
            words,
            speaker: None,
        });
    }

    tracing::debug!(segments = segments.len(), language = %detected, "whisper decode finished");
    Ok(Transcript {
        language: detected,
        segments,
    })
}

fn close_word(words: &mut [TranscriptWord], probabilities: &mut Vec<f32>) {
    if let Some(word) = words.last_mut() {
        if !probabilities.is_empty() {
            word.score = probabilities.iter().sum::<f32>() / probabilities.len() as f32;
        }
    }
    probabilities.clear();
}
