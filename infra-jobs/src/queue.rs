use std::sync::Arc;

use futures::future::BoxFuture;
use photon_domain::{BackgroundTaskPort, DomainError};
use tokio::sync::{mpsc, Mutex};

struct QueuedTask {
    label: &'static str,
    task: BoxFuture<'static, ()>,
}

/// Unbounded FIFO of fire-and-forget futures drained by a fixed set of workers.
pub struct BackgroundTaskQueue {
    tx: mpsc::UnboundedSender<QueuedTask>,
}

impl BackgroundTaskQueue {
    /// Spawns the workers on the current runtime.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        for worker in 0..workers.max(1) {
            tokio::spawn(run_worker(worker, Arc::clone(&rx)));
        }
        Self { tx }
    }
}

async fn run_worker(worker: usize, rx: Arc<Mutex<mpsc::UnboundedReceiver<QueuedTask>>>) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(QueuedTask { label, task }) = next else {
            break;
        };
        tracing::debug!(worker, task = label, "background task started");
        // a panicking task must not take the worker down with it
        match tokio::spawn(task).await {
            Ok(()) => tracing::debug!(worker, task = label, "background task finished"),
            Err(err) => tracing::error!(worker, task = label, error = %err, "background task failed"),
        }
    }
    tracing::debug!(worker, "background worker stopped");
}

impl BackgroundTaskPort for BackgroundTaskQueue {
    fn submit(&self, label: &'static str, task: BoxFuture<'static, ()>) -> Result<(), DomainError> {
        self.tx
            .send(QueuedTask { label, task })
            .map_err(|_| DomainError::internal_error("background queue is closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn single_worker_runs_tasks_in_order() {
        let queue = BackgroundTaskQueue::new(1);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        for idx in 0..3 {
            let seen = Arc::clone(&seen);
            queue
                .submit(
                    "record",
                    async move {
                        tokio::time::sleep(Duration::from_millis(5 * (3 - idx))).await;
                        seen.lock().unwrap().push(idx);
                    }
                    .boxed(),
                )
                .unwrap();
        }
        queue
            .submit(
                "finish",
                async move {
                    let _ = done_tx.send(());
                }
                .boxed(),
            )
            .unwrap();

        done_rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn panicking_task_does_not_stop_the_worker() {
        let queue = BackgroundTaskQueue::new(1);
        let (done_tx, done_rx) = oneshot::channel();
        queue
            .submit("explode", async { panic!("boom") }.boxed())
            .unwrap();
        queue
            .submit(
                "after",
                async move {
                    let _ = done_tx.send(42);
                }
                .boxed(),
            )
            .unwrap();
        assert_eq!(done_rx.await.unwrap(), 42);
    }
}
