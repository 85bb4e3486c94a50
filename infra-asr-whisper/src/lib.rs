mod fallback;
mod runtime;
#[cfg(feature = "whisper-runtime")]
mod whisper;

use std::sync::Arc;

use photon_domain::TranscriptionPort;

pub use fallback::{EnergyVadConfig, EnergyVadTranscriber};
pub use runtime::ExclusiveRuntime;
#[cfg(feature = "whisper-runtime")]
pub use whisper::WhisperTranscriptionAdapter;

pub const WHISPER_RUNTIME_ENABLED: bool = cfg!(feature = "whisper-runtime");

#[derive(Debug, Clone)]
pub struct WhisperAdapterConfig {
    pub model_path: String,
    pub temperature: f32,
    pub threads: usize,
    pub dtw_preset: String,
    pub dtw_mem_size: usize,
}

/// Whisper when the runtime is compiled in, otherwise the energy based segmenter.
pub fn build_transcriber(
    whisper: WhisperAdapterConfig,
    fallback: EnergyVadConfig,
) -> Arc<dyn TranscriptionPort> {
    #[cfg(feature = "whisper-runtime")]
    {
        let _ = fallback;
        tracing::info!(model_path = %whisper.model_path, "using whisper transcription runtime");
        Arc::new(WhisperTranscriptionAdapter::new(whisper))
    }

    #[cfg(not(feature = "whisper-runtime"))]
    {
        tracing::warn!(
            model_path = %whisper.model_path,
            "compiled without whisper-runtime; transcripts only carry speech regions"
        );
        Arc::new(EnergyVadTranscriber::new(fallback))
    }
}
