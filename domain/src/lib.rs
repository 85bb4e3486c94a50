pub mod entity;
pub mod error;
pub mod job;
pub mod port;
pub mod service;

pub use entity::*;
pub use error::DomainError;
pub use job::*;
pub use port::*;
pub use service::*;
