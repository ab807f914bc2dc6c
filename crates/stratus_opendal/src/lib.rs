//! # Stratus OpenDAL Storage
//!
//! Implements [`ObjectStore`] and [`TableStore`] on top of an OpenDAL
//! [`Operator`].
//!
//! Two layouts are supported:
//!
//! * **Prefixed**: one operator (fs, memory, ...) where every container and
//!   table is a top-level directory.
//! * **Azure Blob**: one `azblob` operator per container. Version tables are
//!   containers as well, holding one JSON document per row.
//!
//! OpenDAL cannot create Azure containers, so in that layout they are created
//! through the Blob REST API. Application containers allow anonymous blob
//! reads; table containers stay private.

mod azure;

use azure::{AzureAccount, PublicAccess};
use bytes::Bytes;
use opendal::{
    ErrorKind, Operator,
    services::{Azblob, Fs},
};
use reqwest::Client;
use std::collections::HashMap;
use stratus_core::prelude::*;
use tracing::{debug, error, instrument, warn};

#[derive(Clone)]
enum Layout {
    Prefixed(Operator),
    Azblob { account: AzureAccount, http: Client },
}

#[derive(Clone)]
pub struct OpendalStorage {
    layout: Layout,
}

impl OpendalStorage {
    /// Create a new storage from an OpenDAL Operator.
    /// Containers and tables become directories below the operator's root.
    pub fn new(op: Operator) -> Self {
        Self {
            layout: Layout::Prefixed(op),
        }
    }

    /// Local directory storage rooted at `root`.
    pub fn fs(root: &str) -> Result<Self, StorageError> {
        let op = Operator::new(Fs::default().root(root))
            .map_err(|e| StorageError::Generic(format!("OpenDAL Fs Error: {e}")))?
            .finish();
        Ok(Self::new(op))
    }

    /// Azure Blob storage of `account`, one container per application.
    pub fn azblob(account: impl Into<String>, access_key: impl Into<String>) -> Self {
        let account = account.into();
        let endpoint = format!("https://{account}.blob.core.windows.net");
        Self {
            layout: Layout::Azblob {
                account: AzureAccount {
                    name: account,
                    access_key: access_key.into(),
                    endpoint,
                },
                http: Client::new(),
            },
        }
    }

    /// Overrides the blob endpoint, e.g. for Azurite.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        if let Layout::Azblob { account, .. } = &mut self.layout {
            account.endpoint = url.into();
        }
        self
    }

    /// The operator serving `container` and the path prefix inside it.
    fn locate(&self, container: &str) -> Result<(Operator, String), StorageError> {
        match &self.layout {
            Layout::Prefixed(op) => Ok((op.clone(), format!("{container}/"))),
            Layout::Azblob { account, .. } => {
                let builder = Azblob::default()
                    .container(container)
                    .endpoint(&account.endpoint)
                    .account_name(&account.name)
                    .account_key(&account.access_key);

                let op = Operator::new(builder)
                    .map_err(|e| StorageError::Generic(format!("OpenDAL Azblob Error: {e}")))?
                    .finish();
                Ok((op, String::new()))
            }
        }
    }

    /// Creates `container` if needed. Must be safe to call repeatedly.
    async fn ensure(&self, container: &str, access: PublicAccess) -> Result<(), StorageError> {
        match &self.layout {
            Layout::Azblob { account, http } => {
                azure::create_container(http, account, container, access).await
            }
            Layout::Prefixed(op) => {
                let prefix = format!("{container}/");
                if op.info().full_capability().create_dir {
                    op.create_dir(&prefix)
                        .await
                        .map_err(|e| map_err("Create Dir", &prefix, e))?;
                }
                Ok(())
            }
        }
    }

    fn entity_path(prefix: &str, entity: &VersionEntity) -> String {
        format!("{prefix}{}/{}.json", entity.partition_key, entity.row_key)
    }
}

fn map_err(context: &str, path: &str, e: opendal::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        return StorageError::NotFound(path.to_string());
    }
    error!("{context} failed for {path}: {e}");
    StorageError::Generic(format!("OpenDAL {context} Error: {e}"))
}

impl ObjectStore for OpendalStorage {
    #[instrument(skip(self))]
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        self.ensure(container, PublicAccess::Blob).await
    }

    #[instrument(skip(self, upload), fields(key = %upload.key))]
    async fn upload_blob(&self, container: &str, upload: BlobUpload) -> Result<(), StorageError> {
        let (op, prefix) = self.locate(container)?;
        let path = format!("{prefix}{}", upload.key);

        let data = match upload.body {
            BlobBody::Bytes(data) => data,
            BlobBody::File(file) => Bytes::from(tokio::fs::read(&file).await?),
        };

        let capability = op.info().full_capability();
        let mut write = op.write_with(&path, data);
        if capability.write_with_content_type {
            write = write.content_type(&upload.content_type);
        }
        if !upload.metadata.is_empty() {
            if capability.write_with_user_metadata {
                let metadata: HashMap<String, String> = upload.metadata.into_iter().collect();
                write = write.user_metadata(metadata);
            } else {
                warn!(
                    "Backend cannot store blob metadata; {path} is stored without its \
                     compression flags"
                );
            }
        }

        debug!("Uploading blob...");
        write.await.map_err(|e| map_err("Write", &path, e))?;
        Ok(())
    }
}

impl TableStore for OpendalStorage {
    #[instrument(skip(self))]
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError> {
        self.ensure(table, PublicAccess::Private).await
    }

    #[instrument(
        skip(self, entity),
        fields(partition_key = %entity.partition_key, row_key = %entity.row_key)
    )]
    async fn upsert_entity(
        &self,
        table: &str,
        entity: &VersionEntity,
        mode: UpsertMode,
    ) -> Result<(), StorageError> {
        let (op, prefix) = self.locate(table)?;
        let path = Self::entity_path(&prefix, entity);

        let stored = match mode {
            UpsertMode::Replace => entity.clone(),
            UpsertMode::Merge => match op.read(&path).await {
                Ok(buffer) => {
                    let mut existing: VersionEntity = serde_json::from_slice(&buffer.to_bytes())?;
                    existing.fields.extend(entity.fields.clone());
                    existing
                }
                Err(e) if e.kind() == ErrorKind::NotFound => entity.clone(),
                Err(e) => return Err(map_err("Read", &path, e)),
            },
        };

        debug!("Writing entity...");
        op.write(&path, serde_json::to_vec(&stored)?)
            .await
            .map_err(|e| map_err("Entity", &path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::put,
    };
    use base64::{Engine, engine::general_purpose::STANDARD};
    use opendal::services::Memory;
    use std::sync::{Arc, Mutex};

    fn memory() -> (OpendalStorage, Operator) {
        let op = Operator::new(Memory::default()).unwrap().finish();
        (OpendalStorage::new(op.clone()), op)
    }

    async fn read_entity(op: &Operator, path: &str) -> VersionEntity {
        let buffer = op.read(path).await.unwrap();
        serde_json::from_slice(&buffer.to_bytes()).unwrap()
    }

    #[tokio::test]
    async fn blobs_live_below_their_container() {
        let (storage, op) = memory();

        storage.ensure_container("my-app").await.unwrap();
        storage.ensure_container("my-app").await.unwrap();
        storage
            .upload_blob(
                "my-app",
                BlobUpload::new(
                    "2.4.0/app.js",
                    BlobBody::Bytes(Bytes::from_static(b"console.log(1)")),
                    "application/javascript",
                ),
            )
            .await
            .unwrap();

        let data = op.read("my-app/2.4.0/app.js").await.unwrap().to_bytes();
        assert_eq!(&data[..], b"console.log(1)");
    }

    #[tokio::test]
    async fn fs_layout_writes_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = OpendalStorage::fs(&dir.path().to_string_lossy()).unwrap();

        storage.ensure_container("my-app").await.unwrap();
        storage
            .upload_blob(
                "my-app",
                BlobUpload::new(
                    "1.0.0/app.js",
                    BlobBody::Bytes(Bytes::from_static(b"ok")),
                    "application/javascript",
                ),
            )
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("my-app/1.0.0/app.js")).unwrap();
        assert_eq!(written, b"ok");
    }

    #[tokio::test]
    async fn fs_layout_stores_flagged_blobs_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = OpendalStorage::fs(&dir.path().to_string_lossy()).unwrap();
        let upload = BlobUpload::new(
            "1.0.0/app.js",
            BlobBody::Bytes(Bytes::from_static(b"flagged")),
            "application/javascript",
        )
        .with_metadata("brotli", "1")
        .with_metadata("gzip", "1");

        storage.upload_blob("my-app", upload).await.unwrap();

        let written = std::fs::read(dir.path().join("my-app/1.0.0/app.js")).unwrap();
        assert_eq!(written, b"flagged");
    }

    #[tokio::test]
    async fn missing_upload_file_is_io_error() {
        let (storage, _) = memory();
        let upload = BlobUpload::new(
            "logo.png",
            BlobBody::File("/no/such/logo.png".into()),
            "image/png",
        );

        let err = storage.upload_blob("my-app", upload).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn replace_overwrites_whole_row() {
        let (storage, op) = memory();
        storage.ensure_table("spas").await.unwrap();

        let first = VersionEntity::new("my-app", "2")
            .with_field("Scripts", "[]")
            .with_field("Stylesheets", "[]");
        let second = VersionEntity::new("my-app", "2").with_field("Scripts", "[1]");

        storage.upsert_entity("spas", &first, UpsertMode::Replace).await.unwrap();
        storage.upsert_entity("spas", &second, UpsertMode::Replace).await.unwrap();

        assert_eq!(read_entity(&op, "spas/my-app/2.json").await, second);
    }

    #[tokio::test]
    async fn merge_keeps_existing_fields() {
        let (storage, op) = memory();

        let first = VersionEntity::new("my-app", "__default").with_field("A", "1");
        let second = VersionEntity::new("my-app", "__default").with_field("Version", "1.0.0");

        storage.upsert_entity("spas", &first, UpsertMode::Merge).await.unwrap();
        storage.upsert_entity("spas", &second, UpsertMode::Merge).await.unwrap();

        let stored = read_entity(&op, "spas/my-app/__default.json").await;
        assert_eq!(stored.field("A"), Some("1"));
        assert_eq!(stored.field("Version"), Some("1.0.0"));
    }

    type Seen = Arc<Mutex<Vec<(String, HeaderMap)>>>;

    /// Blob service stub answering `Create Container` like Azure does.
    async fn blob_service() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/{container}",
                put(
                    |State(seen): State<Seen>,
                     Path(container): Path<String>,
                     Query(query): Query<HashMap<String, String>>,
                     headers: HeaderMap| async move {
                        if query.get("restype").map(String::as_str) != Some("container") {
                            return StatusCode::BAD_REQUEST;
                        }
                        if container == "forbidden" {
                            return StatusCode::FORBIDDEN;
                        }
                        let mut seen = seen.lock().unwrap();
                        let exists = seen.iter().any(|(c, _)| *c == container);
                        seen.push((container, headers));
                        if exists {
                            StatusCode::CONFLICT
                        } else {
                            StatusCode::CREATED
                        }
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{addr}"), seen)
    }

    fn azurite(endpoint: &str) -> OpendalStorage {
        OpendalStorage::azblob("acct", STANDARD.encode(b"secret")).with_endpoint(endpoint)
    }

    #[tokio::test]
    async fn azblob_creates_missing_container_with_blob_access() {
        let (endpoint, seen) = blob_service().await;
        let storage = azurite(&endpoint);

        storage.ensure_container("new-app").await.unwrap();
        storage.ensure_container("new-app").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let headers = &seen[0].1;
        assert_eq!(headers["x-ms-blob-public-access"], "blob");
        assert_eq!(headers["x-ms-version"], azure::API_VERSION);
        assert!(headers.contains_key("x-ms-date"));
        assert!(
            headers["authorization"]
                .to_str()
                .unwrap()
                .starts_with("SharedKey acct:")
        );
    }

    #[tokio::test]
    async fn azblob_tables_are_private_containers() {
        let (endpoint, seen) = blob_service().await;

        azurite(&endpoint).ensure_table("spas").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "spas");
        assert!(!seen[0].1.contains_key("x-ms-blob-public-access"));
    }

    #[tokio::test]
    async fn azblob_rejection_is_a_storage_error() {
        let (endpoint, _) = blob_service().await;

        let err = azurite(&endpoint)
            .ensure_container("forbidden")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Generic(msg) if msg.contains("403")));
    }
}
