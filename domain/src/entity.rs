use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Sample rate every transcription backend expects its input at.
pub const TRANSCRIPTION_SAMPLE_RATE_HZ: u32 = 16_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(sample_rate_hz: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate_hz,
            samples,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default)]
    pub words: Vec<TranscriptWord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub language: Option<String>,
    pub audio: AudioBuffer,
}

/// Bounds handed to a diarization model.
///
/// The model only receives them when both are present and
/// `0 < min <= max`; anything else runs diarization without hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerHints {
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
}

impl SpeakerHints {
    pub fn new(min_speakers: Option<u32>, max_speakers: Option<u32>) -> Self {
        Self {
            min_speakers,
            max_speakers,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(min) = self.min_speakers {
            if min < 1 {
                return Err(DomainError::InvalidInput(format!(
                    "min_speakers must be >= 1, got {min}"
                )));
            }
        }
        if let Some(max) = self.max_speakers {
            if max < 1 {
                return Err(DomainError::InvalidInput(format!(
                    "max_speakers must be >= 1, got {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_speakers, self.max_speakers) {
            if min > max {
                return Err(DomainError::InvalidInput(format!(
                    "min_speakers must be <= max_speakers, got {min} > {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn effective(&self) -> Option<(u32, u32)> {
        match (self.min_speakers, self.max_speakers) {
            (Some(min), Some(max)) if min > 0 && min <= max => Some((min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOptions {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub speakers: SpeakerHints,
    #[serde(default)]
    pub transcribe_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechModelInfo {
    pub name: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub speakers: Vec<String>,
    #[serde(default)]
    pub voice_cloning: bool,
}

impl SpeechModelInfo {
    pub fn is_multi_lingual(&self) -> bool {
        !self.languages.is_empty()
    }

    pub fn is_multi_speaker(&self) -> bool {
        !self.speakers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub language: Option<String>,
    pub speaker: Option<String>,
    pub speaker_wav: Option<AudioBuffer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelSpec {
    pub name: String,
    pub query_instruction: Option<String>,
}

pub type Embedding = Vec<f32>;

/// Row-major RGB8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::invalid_input("image has no pixels"));
        }
        if pixels.len() != width as usize * height as usize * 3 {
            return Err(DomainError::InvalidInput(format!(
                "expected {} rgb bytes for a {width}x{height} image, got {}",
                width as usize * height as usize * 3,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn rgb(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels.chunks_exact(3).map(|px| [px[0], px[1], px[2]])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSentences {
    pub indices: Vec<usize>,
    pub scores: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub do_sample: bool,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            do_sample: true,
            top_k: 10,
            top_p: 0.95,
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: usize,
    pub sampling: SamplingParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub generated_tokens: usize,
}

/// Inclusive, 1-based page range inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn resolve(
        start: Option<u32>,
        end: Option<u32>,
        total_pages: u32,
    ) -> Result<Self, DomainError> {
        let start = start.unwrap_or(1);
        let end = end.unwrap_or(total_pages);
        if start < 1 || end > total_pages {
            return Err(DomainError::InvalidInput(format!(
                "Page number should be in range [1, {total_pages}]"
            )));
        }
        if start > end {
            return Err(DomainError::invalid_input(
                "Start page number should be less than end.",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Zero-based page indices.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start as usize - 1)..(self.end as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_hints_reject_inverted_bounds() {
        let err = SpeakerHints::new(Some(3), Some(2)).validate().unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidInput("min_speakers must be <= max_speakers, got 3 > 2".into())
        );
    }

    #[test]
    fn speaker_hints_reject_zero() {
        assert!(SpeakerHints::new(Some(0), None).validate().is_err());
        assert!(SpeakerHints::new(None, Some(0)).validate().is_err());
    }

    #[test]
    fn speaker_hints_only_apply_when_both_present() {
        assert_eq!(SpeakerHints::new(Some(1), Some(4)).effective(), Some((1, 4)));
        assert_eq!(SpeakerHints::new(Some(2), None).effective(), None);
        assert_eq!(SpeakerHints::new(Some(0), Some(2)).effective(), None);
    }

    #[test]
    fn page_range_defaults_to_whole_document() {
        let range = PageRange::resolve(None, None, 7).expect("valid range");
        assert_eq!(range, PageRange { start: 1, end: 7 });
        assert_eq!(range.indices().collect::<Vec<_>>(), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn page_range_rejects_end_before_start() {
        let err = PageRange::resolve(Some(4), Some(2), 10).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidInput("Start page number should be less than end.".into())
        );
    }

    #[test]
    fn page_range_rejects_out_of_bounds() {
        assert!(PageRange::resolve(Some(0), None, 3).is_err());
        assert!(PageRange::resolve(None, Some(4), 3).is_err());
    }

    #[test]
    fn transcript_text_skips_blank_segments() {
        let transcript = Transcript {
            language: "en".into(),
            segments: vec![
                TranscriptSegment {
                    text: " hello ".into(),
                    start_ms: 0,
                    end_ms: 10,
                    words: Vec::new(),
                    speaker: None,
                },
                TranscriptSegment {
                    text: "  ".into(),
                    start_ms: 10,
                    end_ms: 20,
                    words: Vec::new(),
                    speaker: None,
                },
                TranscriptSegment {
                    text: "world".into(),
                    start_ms: 20,
                    end_ms: 30,
                    words: Vec::new(),
                    speaker: None,
                },
            ],
        };
        assert_eq!(transcript.text(), "hello world");
    }

    #[test]
    fn decoded_image_checks_pixel_count() {
        let image = DecodedImage::new(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(image.rgb().collect::<Vec<_>>(), vec![[255, 0, 0], [0, 0, 255]]);
        assert!(DecodedImage::new(2, 2, vec![0; 6]).is_err());
        assert!(DecodedImage::new(0, 4, Vec::new()).is_err());
    }
}
