use crate::entity::{PublishRequest, SpaDescriptor, UpsertMode, VersionEntity};
use crate::error::*;

use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The payload of a blob upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBody {
    Bytes(Bytes),
    /// Read by the store when the upload happens.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUpload {
    pub key: String,
    pub body: BlobBody,
    pub content_type: String,
    /// User metadata stored on the blob, e.g. `brotli = "1"`.
    pub metadata: BTreeMap<String, String>,
}

impl BlobUpload {
    pub fn new(key: impl Into<String>, body: BlobBody, content_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            body,
            content_type: content_type.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait ObjectStore: Send + Sync + 'static + Clone {
    /// Creates the container if it does not exist. Must be safe to call repeatedly.
    fn ensure_container(
        &self,
        container: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn upload_blob(
        &self,
        container: &str,
        upload: BlobUpload,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

pub trait TableStore: Send + Sync + 'static + Clone {
    /// Creates the table if it does not exist. Must be safe to call repeatedly.
    fn ensure_table(&self, table: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn upsert_entity(
        &self,
        table: &str,
        entity: &VersionEntity,
        mode: UpsertMode,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// The hosting portal that owns version resolution for single-page applications.
pub trait Portal: Send + Sync + 'static + Clone {
    fn deploy_spa(
        &self,
        credential: &str,
        descriptor: &SpaDescriptor,
        version: &str,
    ) -> impl Future<Output = Result<(), PortalError>> + Send;

    fn publish_spa(
        &self,
        credential: &str,
        request: &PublishRequest,
    ) -> impl Future<Output = Result<(), PortalError>> + Send;
}
