//! # Stratus Publish
//!
//! Writes a deployment into the two stores: asset payloads into the object
//! store, version rows into the table store.
//!
//! Uploads are sequential and the first failure aborts the batch. Blobs that
//! were already written stay in place; there is no rollback across assets.

pub mod content_type;

use futures::try_join;
use std::collections::HashMap;
use stratus_compress::{Compressed, ContentMode, compress_bytes, compress_file, is_compressible};
use stratus_core::prelude::*;
use tracing::{debug, error, info, instrument};

pub use content_type::{content_type_for, content_type_for_key};

/// Metadata keys set on an original blob once its compressed siblings exist.
pub const BROTLI_FLAG: &str = "brotli";
pub const GZIP_FLAG: &str = "gzip";

#[derive(Clone)]
pub struct StoragePublisher<O: ObjectStore, T: TableStore> {
    objects: O,
    tables: T,
}

impl<O: ObjectStore, T: TableStore> StoragePublisher<O, T> {
    pub fn new(objects: O, tables: T) -> Self {
        Self { objects, tables }
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn tables(&self) -> &T {
        &self.tables
    }

    /// Uploads every asset into `container`, creating it when needed.
    ///
    /// `None` is rejected before storage is contacted; an empty slice only
    /// ensures the container.
    #[instrument(skip(self, assets), fields(container = %container))]
    pub async fn publish_assets(
        &self,
        container: &str,
        assets: Option<&[Asset]>,
    ) -> Result<(), PublishError> {
        let Some(assets) = assets else {
            error!("Assets are required.");
            return Err(ValidationError::AssetsRequired.into());
        };

        info!("Verifying container {container}");
        self.objects
            .ensure_container(container)
            .await
            .inspect_err(|e| error!("Failed to verify container {container}: {e}"))?;

        // Static deployments upload identical bytes under several namespaces.
        let mut compressed = HashMap::new();
        for asset in assets {
            self.publish_asset(container, asset, &mut compressed)
                .await
                .inspect_err(|e| error!("Failed to publish {}: {e}", asset.name))?;
        }

        info!("SPA {container} registered in blob storage.");
        Ok(())
    }

    async fn publish_asset(
        &self,
        container: &str,
        asset: &Asset,
        cache: &mut HashMap<String, Compressed>,
    ) -> Result<(), PublishError> {
        info!("Creating blob for {}", asset.name);

        let Some(source) = &asset.source else {
            return Err(PublishError::UnknownAssetType(asset.name.clone()));
        };

        let content_type = content_type_for(asset);
        let body = match source {
            AssetSource::Inline(data) => BlobBody::Bytes(data.clone()),
            AssetSource::File(path) => BlobBody::File(path.clone()),
        };
        let mut upload = BlobUpload::new(&asset.name, body, &content_type);

        if is_compressible(asset, &content_type) {
            let reusable = match asset.content_hash.as_str() {
                "" => None,
                hash => cache.get(hash).cloned(),
            };

            let Compressed { brotli, gzip } = match reusable {
                Some(hit) => {
                    debug!("Reusing compressed variants for {}", asset.name);
                    hit
                }
                None => {
                    let fresh = match source {
                        AssetSource::Inline(data) => {
                            compress_bytes(data.clone(), ContentMode::Text).await
                        }
                        AssetSource::File(path) => compress_file(path).await,
                    }
                    .map_err(|source| PublishError::Compression {
                        name: asset.name.clone(),
                        source,
                    })?;
                    if !asset.content_hash.is_empty() {
                        cache.insert(asset.content_hash.clone(), fresh.clone());
                    }
                    fresh
                }
            };

            let brotli_key = format!("{}.br", asset.name);
            let gzip_key = format!("{}.gz", asset.name);
            info!("Uploading compressed variants {brotli_key} and {gzip_key}");

            // Flags on the original may only advertise siblings that exist.
            try_join!(
                self.objects.upload_blob(
                    container,
                    BlobUpload::new(
                        &brotli_key,
                        BlobBody::Bytes(brotli),
                        content_type_for_key(&brotli_key)
                    ),
                ),
                self.objects.upload_blob(
                    container,
                    BlobUpload::new(
                        &gzip_key,
                        BlobBody::Bytes(gzip),
                        content_type_for_key(&gzip_key)
                    ),
                ),
            )?;

            upload = upload
                .with_metadata(BROTLI_FLAG, "1")
                .with_metadata(GZIP_FLAG, "1");
        }

        info!("Setting content type to {content_type} for blob {}", asset.name);
        self.objects.upload_blob(container, upload).await?;
        Ok(())
    }

    /// Replaces the row `(partition_key, row_key)` in `table`, creating the
    /// table when needed.
    #[instrument(skip(self, entity), fields(table = %table, row_key = %entity.row_key))]
    pub async fn publish_version_entity(
        &self,
        table: &str,
        entity: &VersionEntity,
    ) -> Result<(), PublishError> {
        info!("Verifying table {table}");
        self.tables
            .ensure_table(table)
            .await
            .inspect_err(|e| error!("Failed to verify table {table}: {e}"))?;

        self.tables
            .upsert_entity(table, entity, UpsertMode::Replace)
            .await
            .inspect_err(|e| error!("Failed to register {}: {e}", entity.row_key))?;

        info!("SPA {} registered in table storage.", entity.partition_key);
        Ok(())
    }
}
