use serde::{Deserialize, Serialize};

use photon_domain::Embedding;

use crate::OneOrMany;

#[derive(Debug, Clone, Deserialize)]
pub struct EncodeRequest {
    pub sentences: OneOrMany<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodeQueriesRequest {
    pub queries: OneOrMany<String>,
}

pub type EncodeResponse = OneOrMany<Embedding>;

#[derive(Debug, Clone, Deserialize)]
pub struct RankRequest {
    pub query: String,
    pub sentences: Vec<String>,
}

/// Serialized as `[indices, scores]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankResponse(pub Vec<usize>, pub Vec<f32>);
