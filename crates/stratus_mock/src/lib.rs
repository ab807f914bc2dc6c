use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stratus_core::prelude::*;

/// Every storage operation, in the order it was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    EnsureContainer(String),
    UploadBlob {
        container: String,
        key: String,
        content_type: String,
        metadata: BTreeMap<String, String>,
    },
    EnsureTable(String),
    UpsertEntity {
        table: String,
        partition_key: String,
        row_key: String,
        mode: UpsertMode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Failures {
    container: bool,
    table: bool,
    upsert: bool,
    uploads: BTreeSet<String>,
    stalls: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<StorageCall>,
    containers: BTreeSet<String>,
    blobs: BTreeMap<(String, String), StoredBlob>,
    tables: BTreeSet<String>,
    rows: BTreeMap<(String, String, String), VersionEntity>,
    failures: Failures,
}

/// Object and table store kept in memory, recording every call.
///
/// Clones share state, so a test can keep one handle for assertions while the
/// code under test owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every `ensure_container` call fail.
    pub fn fail_container(&self) {
        self.state().failures.container = true;
    }

    /// Makes every `ensure_table` call fail.
    pub fn fail_table(&self) {
        self.state().failures.table = true;
    }

    pub fn fail_upsert(&self) {
        self.state().failures.upsert = true;
    }

    /// Makes the upload of `key` fail.
    pub fn fail_upload(&self, key: impl Into<String>) {
        self.state().failures.uploads.insert(key.into());
    }

    /// Makes the upload of `key` hang forever once it has been recorded.
    pub fn stall_upload(&self, key: impl Into<String>) {
        self.state().failures.stalls.insert(key.into());
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.state().calls.clone()
    }

    /// Blob keys in the order they were uploaded.
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                StorageCall::UploadBlob { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn blob(&self, container: &str, key: &str) -> Option<StoredBlob> {
        self.state()
            .blobs
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn blob_keys(&self, container: &str) -> Vec<String> {
        self.state()
            .blobs
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn entity(&self, table: &str, partition_key: &str, row_key: &str) -> Option<VersionEntity> {
        self.state()
            .rows
            .get(&(
                table.to_string(),
                partition_key.to_string(),
                row_key.to_string(),
            ))
            .cloned()
    }

    /// Row keys written to `table`, in the order of their first write.
    pub fn upserted_row_keys(&self, table: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                StorageCall::UpsertEntity {
                    table: t, row_key, ..
                } if t == table => Some(row_key.clone()),
                _ => None,
            })
            .filter(|row_key| seen.insert(row_key.clone()))
            .collect()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state().containers.contains(container)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains(table)
    }
}

impl ObjectStore for MemoryStorage {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        let mut state = self.state();
        state
            .calls
            .push(StorageCall::EnsureContainer(container.to_string()));

        if state.failures.container {
            return Err(StorageError::Generic(format!(
                "container {container} unavailable"
            )));
        }

        state.containers.insert(container.to_string());
        Ok(())
    }

    async fn upload_blob(&self, container: &str, upload: BlobUpload) -> Result<(), StorageError> {
        let BlobUpload {
            key,
            body,
            content_type,
            metadata,
        } = upload;

        let stalled = {
            let mut state = self.state();
            state.calls.push(StorageCall::UploadBlob {
                container: container.to_string(),
                key: key.clone(),
                content_type: content_type.clone(),
                metadata: metadata.clone(),
            });

            if state.failures.uploads.contains(&key) {
                return Err(StorageError::Generic(format!("upload of {key} rejected")));
            }
            state.failures.stalls.contains(&key)
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let data = match body {
            BlobBody::Bytes(data) => data,
            BlobBody::File(path) => Bytes::from(tokio::fs::read(&path).await?),
        };

        self.state().blobs.insert(
            (container.to_string(), key),
            StoredBlob {
                data,
                content_type,
                metadata,
            },
        );
        Ok(())
    }
}

impl TableStore for MemoryStorage {
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError> {
        let mut state = self.state();
        state.calls.push(StorageCall::EnsureTable(table.to_string()));

        if state.failures.table {
            return Err(StorageError::Generic(format!("table {table} unavailable")));
        }

        state.tables.insert(table.to_string());
        Ok(())
    }

    async fn upsert_entity(
        &self,
        table: &str,
        entity: &VersionEntity,
        mode: UpsertMode,
    ) -> Result<(), StorageError> {
        let mut state = self.state();
        state.calls.push(StorageCall::UpsertEntity {
            table: table.to_string(),
            partition_key: entity.partition_key.clone(),
            row_key: entity.row_key.clone(),
            mode,
        });

        if state.failures.upsert {
            return Err(StorageError::Generic(format!(
                "upsert of {}/{} rejected",
                entity.partition_key, entity.row_key
            )));
        }

        let key = (
            table.to_string(),
            entity.partition_key.clone(),
            entity.row_key.clone(),
        );
        let stored = match (mode, state.rows.remove(&key)) {
            (UpsertMode::Merge, Some(mut existing)) => {
                existing.fields.extend(entity.fields.clone());
                existing
            }
            _ => entity.clone(),
        };
        state.rows.insert(key, stored);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortalCall {
    Deploy {
        credential: String,
        descriptor: SpaDescriptor,
        version: String,
    },
    Publish {
        credential: String,
        request: PublishRequest,
    },
}

/// Portal double that accepts everything unless told to reject.
#[derive(Clone, Debug, Default)]
pub struct MockPortal {
    calls: Arc<Mutex<Vec<PortalCall>>>,
    rejection: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_with(&self, status: u16, message: impl Into<String>) {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((status, message.into()));
    }

    pub fn calls(&self) -> Vec<PortalCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: PortalCall) -> Result<(), PortalError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        match self
            .rejection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some((status, message)) => Err(PortalError::Rejected(status, message)),
            None => Ok(()),
        }
    }
}

impl Portal for MockPortal {
    async fn deploy_spa(
        &self,
        credential: &str,
        descriptor: &SpaDescriptor,
        version: &str,
    ) -> Result<(), PortalError> {
        self.record(PortalCall::Deploy {
            credential: credential.to_string(),
            descriptor: descriptor.clone(),
            version: version.to_string(),
        })
    }

    async fn publish_spa(
        &self,
        credential: &str,
        request: &PublishRequest,
    ) -> Result<(), PortalError> {
        self.record(PortalCall::Publish {
            credential: credential.to_string(),
            request: request.clone(),
        })
    }
}
