//! Deploy error types.

use std::fmt;
use stratus_build::BuildError;
use stratus_core::error::{PortalError, PublishError, ValidationError};

/// The sequential stages of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Manifest,
    Upload,
    Register,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Manifest => "manifest",
            Stage::Upload => "upload",
            Stage::Register => "register",
        })
    }
}

/// Errors produced by a deployment. Causes are passed through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("cancelled during the {0} stage")]
    Cancelled(Stage),
}
