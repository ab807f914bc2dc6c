use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk build output: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Malformed metadata.json: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Invalid asset pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("No such build artifact: {0}")]
    Missing(String),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
