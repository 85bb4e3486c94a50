use async_trait::async_trait;
use photon_domain::{DomainError, Embedding, EmbeddingModelSpec, EmbeddingPort};

const EN_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";
const ZH_INSTRUCTION: &str = "为这个句子生成表示以用于检索相关文章：";

/// Known BGE checkpoints and the instruction prepended to retrieval queries.
pub const BGE_MODELS: &[(&str, Option<&str>)] = &[
    ("BAAI/llm-embedder", None),
    ("BAAI/bge-reranker-large", None),
    ("BAAI/bge-reranker-base", None),
    ("BAAI/bge-large-en-v1.5", Some(EN_INSTRUCTION)),
    ("BAAI/bge-base-en-v1.5", Some(EN_INSTRUCTION)),
    ("BAAI/bge-small-en-v1.5", Some(EN_INSTRUCTION)),
    ("BAAI/bge-large-zh-v1.5", Some(ZH_INSTRUCTION)),
    ("BAAI/bge-base-zh-v1.5", Some(ZH_INSTRUCTION)),
    ("BAAI/bge-small-zh-v1.5", Some(ZH_INSTRUCTION)),
    ("BAAI/bge-large-en", Some(EN_INSTRUCTION)),
    ("BAAI/bge-base-en", Some(EN_INSTRUCTION)),
    ("BAAI/bge-small-en", Some(EN_INSTRUCTION)),
    ("BAAI/bge-large-zh", Some(ZH_INSTRUCTION)),
    ("BAAI/bge-base-zh", Some(ZH_INSTRUCTION)),
    ("BAAI/bge-small-zh", Some(ZH_INSTRUCTION)),
];

/// Looks `name` up in [`BGE_MODELS`]; `query_instruction` overrides the catalogue entry.
pub fn embedding_model_spec(
    name: &str,
    query_instruction: Option<String>,
) -> Result<EmbeddingModelSpec, DomainError> {
    let (_, default_instruction) = BGE_MODELS
        .iter()
        .find(|(known, _)| *known == name)
        .ok_or_else(|| {
            let available: Vec<&str> = BGE_MODELS.iter().map(|(known, _)| *known).collect();
            DomainError::InvalidInput(format!(
                "Model name {name} not found. Available models: {}",
                available.join(", ")
            ))
        })?;
    Ok(EmbeddingModelSpec {
        name: name.to_string(),
        query_instruction: query_instruction.or_else(|| default_instruction.map(str::to_string)),
    })
}

/// Signed feature hashing over lower-cased word unigrams and bigrams.
pub struct HashingEmbedder {
    spec: EmbeddingModelSpec,
    dimensions: usize,
    normalize: bool,
}

impl HashingEmbedder {
    pub fn new(spec: EmbeddingModelSpec, dimensions: usize, normalize: bool) -> Self {
        Self {
            spec,
            dimensions: dimensions.max(1),
            normalize,
        }
    }

    fn embed(&self, sentence: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens: Vec<String> = sentence
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect();
        let bigrams = tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
        for feature in tokens.iter().cloned().chain(bigrams) {
            let hash = fnv1a(feature.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        if self.normalize {
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                vector.iter_mut().for_each(|v| *v /= norm);
            }
        }
        vector
    }
}

pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingPort for HashingEmbedder {
    fn spec(&self) -> &EmbeddingModelSpec {
        &self.spec
    }

    fn normalizes_embeddings(&self) -> bool {
        self.normalize
    }

    async fn encode(&self, sentences: Vec<String>) -> Result<Vec<Embedding>, DomainError> {
        Ok(sentences.iter().map(|sentence| self.embed(sentence)).collect())
    }
}
