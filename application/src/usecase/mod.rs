pub mod document;
pub mod embedding;
pub mod generation;
pub mod speech;
pub mod transcription;
pub mod vision;

pub use document::{DocumentUseCase, DocumentUseCaseImpl, PageStream};
pub use embedding::{EmbeddingUseCase, EmbeddingUseCaseImpl};
pub use generation::{GenerationUseCase, GenerationUseCaseImpl};
pub use speech::{SpeechUseCase, SpeechUseCaseImpl};
pub use transcription::{TranscriptionPolicy, TranscriptionUseCase, TranscriptionUseCaseImpl};
pub use vision::{is_image_reference, VisionUseCase, VisionUseCaseImpl};
