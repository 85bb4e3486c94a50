use serde::Deserialize;
use validator::Validate;

use crate::OneOrMany;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StreamGenerationRequest {
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default = "default_stream_max_new_tokens")]
    #[validate(range(min = 1))]
    pub max_new_tokens: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompletionRequest {
    pub inputs: OneOrMany<String>,
    #[serde(default = "default_true")]
    pub do_sample: bool,
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1))]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub top_p: f32,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0))]
    pub temperature: f32,
    #[serde(default = "default_completion_max_new_tokens")]
    #[validate(range(min = 1))]
    pub max_new_tokens: usize,
}

pub type CompletionResponse = OneOrMany<String>;

fn default_stream_max_new_tokens() -> usize {
    100
}

fn default_completion_max_new_tokens() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> u32 {
    10
}

fn default_top_p() -> f32 {
    0.95
}

fn default_temperature() -> f32 {
    0.1
}
