//! Fatal pipeline failures
//!
//! Every variant aborts the run. Nothing here is retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provisioning failed: {message}")]
    Provisioning { message: String },

    #[error("ETL execution failed: {message}")]
    EtlExecution { message: String },

    #[error("Nothing to commit: output files are unchanged")]
    NothingToCommit,

    #[error("Push to {remote}/{branch} rejected: {message}")]
    PushRejected {
        remote: String,
        branch: String,
        message: String,
    },

    #[error("Git operation failed: {0:#}")]
    Git(anyhow::Error),
}

impl PipelineError {
    pub fn provisioning(message: impl Into<String>) -> Self {
        PipelineError::Provisioning {
            message: message.into(),
        }
    }

    pub fn etl(message: impl Into<String>) -> Self {
        PipelineError::EtlExecution {
            message: message.into(),
        }
    }

    /// Process exit code reported by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Provisioning { .. } => 2,
            PipelineError::EtlExecution { .. } => 3,
            PipelineError::NothingToCommit => 4,
            PipelineError::PushRejected { .. } => 5,
            PipelineError::Config(_) | PipelineError::Git(_) => 1,
        }
    }
}
