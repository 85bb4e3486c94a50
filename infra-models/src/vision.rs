use async_trait::async_trait;
use photon_domain::{DecodedImage, DomainError, Embedding, ImageCodecPort, VisionEmbeddingPort};

use crate::embedding::fnv1a;

/// PNG and JPEG through the `image` crate, flattened to RGB8.
#[derive(Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodecPort for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DomainError> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| DomainError::InvalidInput(format!("cannot decode image: {err}")))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        DecodedImage::new(width, height, image.into_raw())
    }
}

const PALETTE: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("gray", [128, 128, 128]),
    ("red", [255, 0, 0]),
    ("orange", [255, 140, 0]),
    ("yellow", [255, 230, 0]),
    ("green", [0, 170, 0]),
    ("blue", [0, 0, 255]),
    ("purple", [130, 0, 180]),
    ("pink", [255, 150, 200]),
    ("brown", [130, 80, 30]),
];

const SYNONYMS: &[(&str, &str)] = &[("grey", "gray"), ("violet", "purple")];

/// Weight of a word that is not a palette color, relative to a color word.
const OTHER_WORD_WEIGHT: f32 = 0.25;

/// Maps images and captions into a shared space keyed by palette colors: an image
/// lands on the mix of its pixels' nearest palette colors and a caption on the colors
/// it names, so "a red square" scores highest against mostly red images.
pub struct PaletteEmbedder {
    model_name: String,
    dimensions: usize,
}

impl PaletteEmbedder {
    pub fn new(model_name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimensions: dimensions.max(PALETTE.len()),
        }
    }

    fn direction(&self, feature: &str) -> Vec<f32> {
        let mut state = fnv1a(feature.as_bytes()) | 1;
        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 40) as f32 / (1u64 << 23) as f32 - 1.0
            })
            .collect();
        normalize(&mut vector);
        vector
    }

    fn mix(&self, weights: impl IntoIterator<Item = (String, f32)>) -> Embedding {
        let mut vector = vec![0.0f32; self.dimensions];
        for (feature, weight) in weights {
            for (slot, value) in vector.iter_mut().zip(self.direction(&feature)) {
                *slot += weight * value;
            }
        }
        normalize(&mut vector);
        vector
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

fn nearest_color(pixel: [u8; 3]) -> usize {
    let distance = |color: &[u8; 3]| -> u32 {
        pixel
            .iter()
            .zip(color)
            .map(|(&a, &b)| (i32::from(a) - i32::from(b)).pow(2) as u32)
            .sum()
    };
    PALETTE
        .iter()
        .enumerate()
        .min_by_key(|(_, (_, color))| distance(color))
        .map_or(0, |(idx, _)| idx)
}

fn color_word(token: &str) -> Option<&'static str> {
    let token = SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == token)
        .map_or(token, |(_, color)| *color);
    PALETTE
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(name, _)| *name)
}

#[async_trait]
impl VisionEmbeddingPort for PaletteEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_text(&self, text: &str) -> Result<Embedding, DomainError> {
        let weights: Vec<(String, f32)> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .map(|token| match color_word(&token) {
                Some(color) => (color.to_string(), 1.0),
                None => (token, OTHER_WORD_WEIGHT),
            })
            .collect();
        if weights.is_empty() {
            return Err(DomainError::invalid_input("text has no words to embed"));
        }
        Ok(self.mix(weights))
    }

    async fn embed_image(&self, image: &DecodedImage) -> Result<Embedding, DomainError> {
        let mut histogram = vec![0usize; PALETTE.len()];
        for pixel in image.rgb() {
            histogram[nearest_color(pixel)] += 1;
        }
        let total = histogram.iter().sum::<usize>().max(1) as f32;
        let weights = PALETTE
            .iter()
            .zip(histogram)
            .filter(|(_, count)| *count > 0)
            .map(|((name, _), count)| (name.to_string(), count as f32 / total));
        Ok(self.mix(weights))
    }
}
