//! Errors reported synchronously to the submitter
//!
//! Anything that goes wrong after a task starts is recorded inside the task
//! instead (see [`crate::task::TaskFailure`]).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("request is not actionable: endpoint, method and content type are required")]
    NotActionable,

    #[error("malformed endpoint '{endpoint}': {reason}")]
    MalformedEndpoint { endpoint: String, reason: String },

    #[error("invalid certificate store {}: {reason}", path.display())]
    InvalidCertificate { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
