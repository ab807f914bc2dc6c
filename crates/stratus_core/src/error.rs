use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Generic(String),
}

/// Problems detected before any storage is contacted.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    #[error("Assets are required.")]
    AssetsRequired,

    #[error("Unable to locate any assets to deploy.")]
    NoAssets,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Unknown asset type: {0}")]
    UnknownAssetType(String),

    #[error("Compression failed for {name}: {source}")]
    Compression {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Portal returned error {0}: {1}")]
    Rejected(u16, String),
}
