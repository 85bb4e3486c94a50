pub mod clip;
pub mod embedding;
pub mod generation;
pub mod health;
pub mod nougat;
pub mod tts;
pub mod whisperx;

pub use clip::ClipPhoton;
pub use embedding::EmbeddingPhoton;
pub use generation::GenerationPhoton;
pub use health::health_check;
pub use nougat::NougatPhoton;
pub use tts::TtsPhoton;
pub use whisperx::WhisperxPhoton;
