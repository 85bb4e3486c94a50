pub mod app;
pub mod context;

pub use app::{build_and_run, Application};
pub use context::ServiceContext;
