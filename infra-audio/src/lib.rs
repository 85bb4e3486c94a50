pub mod codec;
pub mod source;

pub use codec::{resample_linear, WavAudioCodec};
pub use source::HttpContentSource;
