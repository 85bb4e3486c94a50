pub mod generation;
pub mod queue;
pub mod store;

pub use generation::GenerationWorkerQueue;
pub use queue::BackgroundTaskQueue;
pub use store::{spawn_periodic_sweep, DiskJobStore, DiskJobStoreConfig};
