//! In-process model adapters used when no external runtime is wired in.

pub mod alignment;
pub mod diarization;
pub mod document;
pub mod embedding;
pub mod generation;
pub mod speech;
pub mod vision;

mod signal;

pub use alignment::UniformWordAligner;
pub use diarization::{PauseDiarizer, PauseDiarizerConfig};
pub use document::DocumentPageReader;
pub use embedding::{embedding_model_spec, HashingEmbedder, BGE_MODELS};
pub use generation::PromptEchoGenerator;
pub use speech::{ToneSpeechConfig, ToneSpeechSynthesizer};
pub use vision::{ImageCodec, PaletteEmbedder};
