use std::sync::Arc;

use async_trait::async_trait;

use photon_domain::{Embedding, EmbeddingPort, RankedSentences};

use crate::{
    ApplicationError, EncodeQueriesRequest, EncodeRequest, EncodeResponse, OneOrMany,
    RankRequest, RankResponse,
};

#[async_trait]
pub trait EmbeddingUseCase: Send + Sync {
    async fn encode(&self, request: EncodeRequest) -> Result<EncodeResponse, ApplicationError>;
    async fn encode_queries(
        &self,
        request: EncodeQueriesRequest,
    ) -> Result<EncodeResponse, ApplicationError>;
    async fn rank(&self, request: RankRequest) -> Result<RankResponse, ApplicationError>;
}

pub struct EmbeddingUseCaseImpl {
    model: Arc<dyn EmbeddingPort>,
}

impl EmbeddingUseCaseImpl {
    pub fn new(model: Arc<dyn EmbeddingPort>) -> Self {
        Self { model }
    }

    async fn encode_shaped(
        &self,
        input: OneOrMany<String>,
        prefix: Option<&str>,
    ) -> Result<EncodeResponse, ApplicationError> {
        if input.is_empty() {
            return Err(ApplicationError::validation("sentences cannot be empty"));
        }
        let sentences = input
            .clone()
            .into_vec()
            .into_iter()
            .map(|sentence| match prefix {
                Some(prefix) => format!("{prefix}{sentence}"),
                None => sentence,
            })
            .collect::<Vec<_>>();
        let count = sentences.len();
        let embeddings = self.model.encode(sentences).await?;
        if embeddings.len() != count {
            return Err(ApplicationError::Internal(format!(
                "model returned {} embeddings for {count} sentences",
                embeddings.len()
            )));
        }
        input
            .reshape(embeddings)
            .ok_or_else(|| ApplicationError::Internal("embedding shape mismatch".to_string()))
    }
}

#[async_trait]
impl EmbeddingUseCase for EmbeddingUseCaseImpl {
    async fn encode(&self, request: EncodeRequest) -> Result<EncodeResponse, ApplicationError> {
        tracing::debug!(model = %self.model.spec().name, "encoding sentences");
        self.encode_shaped(request.sentences, None).await
    }

    async fn encode_queries(
        &self,
        request: EncodeQueriesRequest,
    ) -> Result<EncodeResponse, ApplicationError> {
        let instruction = self.model.spec().query_instruction.clone();
        self.encode_shaped(request.queries, instruction.as_deref())
            .await
    }

    async fn rank(&self, request: RankRequest) -> Result<RankResponse, ApplicationError> {
        if !self.model.normalizes_embeddings() {
            return Err(ApplicationError::Internal(
                "Model must have normalize_embeddings=True to use rank.".to_string(),
            ));
        }
        if request.sentences.is_empty() {
            return Err(ApplicationError::validation("sentences cannot be empty"));
        }

        let mut inputs = Vec::with_capacity(request.sentences.len() + 1);
        inputs.push(request.query);
        inputs.extend(request.sentences);
        let mut embeddings = self.model.encode(inputs).await?;
        if embeddings.is_empty() {
            return Err(ApplicationError::Internal("model returned no embeddings".into()));
        }
        let query = embeddings.remove(0);
        let ranked = rank_by_inner_product(&query, &embeddings);
        Ok(RankResponse(ranked.indices, ranked.scores))
    }
}

fn rank_by_inner_product(query: &Embedding, sentences: &[Embedding]) -> RankedSentences {
    let scores: Vec<f32> = sentences
        .iter()
        .map(|sentence| query.iter().zip(sentence).map(|(a, b)| a * b).sum())
        .collect();
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    let scores = indices.iter().map(|&idx| scores[idx]).collect();
    RankedSentences { indices, scores }
}
