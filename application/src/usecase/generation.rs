use std::sync::Arc;

use async_trait::async_trait;
use futures::{future, TryStreamExt};
use validator::Validate;

use photon_domain::{GenerationQueuePort, GenerationRequest, SamplingParams, TokenStream};

use crate::{ApplicationError, CompletionRequest, CompletionResponse, StreamGenerationRequest};

#[async_trait]
pub trait GenerationUseCase: Send + Sync {
    async fn stream(&self, request: StreamGenerationRequest)
        -> Result<TokenStream, ApplicationError>;
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ApplicationError>;
}

pub struct GenerationUseCaseImpl {
    queue: Arc<dyn GenerationQueuePort>,
    max_new_tokens_limit: usize,
}

impl GenerationUseCaseImpl {
    pub fn new(queue: Arc<dyn GenerationQueuePort>, max_new_tokens_limit: usize) -> Self {
        Self {
            queue,
            max_new_tokens_limit,
        }
    }

    fn check_budget(&self, max_new_tokens: usize) -> Result<(), ApplicationError> {
        if max_new_tokens > self.max_new_tokens_limit {
            return Err(ApplicationError::Validation(format!(
                "max_new_tokens must be <= {}, got {max_new_tokens}",
                self.max_new_tokens_limit
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationUseCase for GenerationUseCaseImpl {
    async fn stream(
        &self,
        request: StreamGenerationRequest,
    ) -> Result<TokenStream, ApplicationError> {
        request.validate()?;
        self.check_budget(request.max_new_tokens)?;
        tracing::debug!(
            prompt_chars = request.text.chars().count(),
            max_new_tokens = request.max_new_tokens,
            "queueing streaming generation"
        );
        Ok(self.queue.submit(GenerationRequest {
            prompt: request.text,
            max_new_tokens: request.max_new_tokens,
            sampling: SamplingParams::default(),
        })?)
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ApplicationError> {
        request.validate()?;
        self.check_budget(request.max_new_tokens)?;
        if request.inputs.is_empty() {
            return Err(ApplicationError::validation("inputs cannot be empty"));
        }
        let sampling = SamplingParams {
            do_sample: request.do_sample,
            top_k: request.top_k,
            top_p: request.top_p,
            temperature: request.temperature,
        };

        let prompts = request.inputs.clone().into_vec();
        let mut pending = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let stream = self.queue.submit(GenerationRequest {
                prompt: prompt.clone(),
                max_new_tokens: request.max_new_tokens,
                sampling,
            })?;
            pending.push(async move {
                let generated: String = stream.try_collect::<Vec<_>>().await?.concat();
                Ok::<_, ApplicationError>(format!("{prompt}{generated}"))
            });
        }
        let texts = future::try_join_all(pending).await?;

        request
            .inputs
            .reshape(texts)
            .ok_or_else(|| ApplicationError::Internal("completion shape mismatch".to_string()))
    }
}
