pub mod config;
pub mod error;
pub mod identity;
pub mod request;
pub mod runner;
pub mod task;
pub mod transport;

pub use error::EngineError;
pub use identity::ClientIdentity;
pub use request::{ProxyConfig, RequestFields, RequestSpec};
pub use runner::{Submission, TaskRunner};
pub use task::{ResponseTask, TaskFailure, TaskState};
