use std::sync::Arc;

use photon_domain::DomainError;
use tokio::sync::{Mutex, OnceCell};

/// A model loaded once on a blocking thread. Calls into it run one at a time,
/// each on a blocking thread.
pub struct ExclusiveRuntime<M> {
    model: OnceCell<Arc<M>>,
    running: Mutex<()>,
}

impl<M> Default for ExclusiveRuntime<M> {
    fn default() -> Self {
        Self {
            model: OnceCell::new(),
            running: Mutex::new(()),
        }
    }
}

impl<M: Send + Sync + 'static> ExclusiveRuntime<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Loads the model with `load` unless an earlier call already did, then runs `call`.
    /// A failed load leaves the runtime empty so the next call retries.
    pub async fn run<L, F, T>(&self, load: L, call: F) -> Result<T, DomainError>
    where
        L: FnOnce() -> Result<M, DomainError> + Send + 'static,
        F: FnOnce(&M) -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let model = self
            .model
            .get_or_try_init(|| async move {
                let model = tokio::task::spawn_blocking(load).await.map_err(|err| {
                    DomainError::internal_error(&format!("model loader failed: {err}"))
                })??;
                Ok::<_, DomainError>(Arc::new(model))
            })
            .await?
            .clone();

        let _running = self.running.lock().await;
        tokio::task::spawn_blocking(move || call(&model))
            .await
            .map_err(|err| DomainError::internal_error(&format!("model worker failed: {err}")))?
    }
}
