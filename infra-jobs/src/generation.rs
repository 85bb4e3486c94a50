use std::sync::Arc;

use futures::StreamExt;
use photon_domain::{
    DomainError, GenerationQueuePort, GenerationRequest, TextGenerationPort, TokenStream,
};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;

type TokenSender = mpsc::UnboundedSender<Result<String, DomainError>>;

struct GenerationJob {
    request: GenerationRequest,
    tokens: TokenSender,
}

/// FIFO of generation requests served by `max_concurrency` workers. Each request
/// gets its own token channel; the stream ends when generation stops.
pub struct GenerationWorkerQueue {
    tx: mpsc::UnboundedSender<GenerationJob>,
}

impl GenerationWorkerQueue {
    pub fn new(model: Arc<dyn TextGenerationPort>, max_concurrency: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        for worker in 0..max_concurrency.max(1) {
            tokio::spawn(run_worker(worker, Arc::clone(&model), Arc::clone(&rx)));
        }
        Self { tx }
    }
}

async fn run_worker(
    worker: usize,
    model: Arc<dyn TextGenerationPort>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<GenerationJob>>>,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(GenerationJob { request, tokens }) = next else {
            break;
        };
        let model = Arc::clone(&model);
        let errors = tokens.clone();
        let handle = tokio::task::spawn_blocking(move || {
            model.generate(&request, &mut |piece| {
                tokens.send(Ok(piece.to_string())).is_ok()
            })
        });
        match handle.await {
            Ok(Ok(stats)) => {
                tracing::debug!(worker, generated_tokens = stats.generated_tokens, "generation finished")
            }
            Ok(Err(err)) => {
                tracing::error!(worker, error = %err, "generation failed");
                let _ = errors.send(Err(err));
            }
            Err(err) => {
                tracing::error!(worker, error = %err, "generation worker panicked");
                let _ = errors.send(Err(DomainError::internal_error("generation worker failed")));
            }
        }
    }
}

impl GenerationQueuePort for GenerationWorkerQueue {
    fn submit(&self, request: GenerationRequest) -> Result<TokenStream, DomainError> {
        let (tokens, rx) = mpsc::unbounded_channel();
        self.tx
            .send(GenerationJob { request, tokens })
            .map_err(|_| DomainError::internal_error("generation queue is closed"))?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use photon_domain::{GenerationStats, SamplingParams};

    struct Words;

    impl TextGenerationPort for Words {
        fn generate(
            &self,
            request: &GenerationRequest,
            emit: &mut dyn FnMut(&str) -> bool,
        ) -> Result<GenerationStats, DomainError> {
            if request.prompt == "fail" {
                let _ = emit("partial");
                return Err(DomainError::internal_error("model crashed"));
            }
            let mut generated_tokens = 0;
            for word in request.prompt.split_whitespace().take(request.max_new_tokens) {
                if !emit(&format!("{word} ")) {
                    break;
                }
                generated_tokens += 1;
            }
            Ok(GenerationStats { generated_tokens })
        }
    }

    fn request(prompt: &str, max_new_tokens: usize) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            max_new_tokens,
            sampling: SamplingParams::default(),
        }
    }

    #[tokio::test]
    async fn streams_tokens_for_each_request() {
        let queue = GenerationWorkerQueue::new(Arc::new(Words), 2);
        let first = queue.submit(request("one two three", 2)).unwrap();
        let second = queue.submit(request("alpha beta", 10)).unwrap();

        let first: Vec<String> = first.try_collect().await.unwrap();
        let second: Vec<String> = second.try_collect().await.unwrap();
        assert_eq!(first.concat(), "one two ");
        assert_eq!(second.concat(), "alpha beta ");
    }

    #[tokio::test]
    async fn failed_generation_ends_only_its_own_stream() {
        let queue = GenerationWorkerQueue::new(Arc::new(Words), 1);
        let failing = queue.submit(request("fail", 4)).unwrap();
        let healthy = queue.submit(request("still works", 4)).unwrap();

        let items: Vec<Result<String, DomainError>> = failing.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("partial".to_string()));
        assert!(items[1].is_err());

        let healthy: Vec<String> = healthy.try_collect().await.unwrap();
        assert_eq!(healthy.concat(), "still works ");
    }
}
