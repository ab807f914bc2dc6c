//! Deployment orchestrator.
//!
//! A deployment runs three stages in order: build the manifest, upload the
//! assets, register the version. Registration only starts once every upload
//! succeeded, so version rows never point at missing blobs. Nothing is rolled
//! back when a later stage fails.

use crate::error::{DeployError, Stage};
use stratus_build::{ArtifactProvider, BuildOptions, build_manifest, bundle_assets, emitted_assets};
use stratus_core::prelude::*;
use stratus_publish::StoragePublisher;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Where a deployed version was registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Handed to the portal (SPA mode).
    Portal,
    /// Row keys written to the version table (static mode).
    Rows(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Names of the uploaded assets, compressed variants excluded.
    pub uploaded: Vec<String>,
    pub registration: Registration,
}

pub struct Deployer<O: ObjectStore, T: TableStore, P: Portal> {
    publisher: StoragePublisher<O, T>,
    portal: P,
}

async fn run_stage<F, R>(
    stage: Stage,
    cancel: &CancellationToken,
    work: F,
) -> Result<R, DeployError>
where
    F: Future<Output = Result<R, DeployError>>,
{
    if cancel.is_cancelled() {
        warn!(%stage, "Deployment cancelled");
        return Err(DeployError::Cancelled(stage));
    }

    debug!(%stage, "Starting stage");
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(%stage, "Deployment cancelled");
            Err(DeployError::Cancelled(stage))
        }
        result = work => result,
    }
}

/// Runs `work` against the build output on the blocking thread pool.
async fn read_build<A, R, F>(artifacts: &A, work: F) -> Result<R, DeployError>
where
    A: ArtifactProvider + Clone + Send + 'static,
    R: Send + 'static,
    F: FnOnce(&A) -> Result<R, DeployError> + Send + 'static,
{
    let artifacts = artifacts.clone();
    tokio::task::spawn_blocking(move || work(&artifacts)).await?
}

impl<O: ObjectStore, T: TableStore, P: Portal> Deployer<O, T, P> {
    pub fn new(publisher: StoragePublisher<O, T>, portal: P) -> Self {
        Self { publisher, portal }
    }

    pub fn publisher(&self) -> &StoragePublisher<O, T> {
        &self.publisher
    }

    /// Uploads the build output and registers the version.
    #[instrument(
        skip_all,
        fields(app = %settings.name, version = %settings.version, mode = ?settings.mode)
    )]
    pub async fn deploy<A>(
        &self,
        settings: &DeploySettings,
        artifacts: &A,
        cancel: &CancellationToken,
    ) -> Result<DeployReport, DeployError>
    where
        A: ArtifactProvider + Clone + Send + Sync + 'static,
    {
        let result = self.run(settings, artifacts, cancel).await;
        match &result {
            Ok(_) => info!("Successfully registered."),
            Err(e) => error!("{e}"),
        }
        result
    }

    async fn run<A>(
        &self,
        settings: &DeploySettings,
        artifacts: &A,
        cancel: &CancellationToken,
    ) -> Result<DeployReport, DeployError>
    where
        A: ArtifactProvider + Clone + Send + Sync + 'static,
    {
        let manifest_settings = settings.clone();
        let assets = run_stage(
            Stage::Manifest,
            cancel,
            read_build(artifacts, move |a| collect_assets(&manifest_settings, a)),
        )
        .await?;

        run_stage(Stage::Upload, cancel, async {
            self.publisher
                .publish_assets(&settings.name, Some(&assets))
                .await
                .map_err(DeployError::from)
        })
        .await?;

        let registration = run_stage(Stage::Register, cancel, async {
            match settings.mode {
                DeployMode::Spa => self.register_spa(settings, artifacts).await,
                DeployMode::Static => self.register_static(settings, artifacts).await,
            }
        })
        .await?;

        Ok(DeployReport {
            uploaded: assets.into_iter().map(|asset| asset.name).collect(),
            registration,
        })
    }

    async fn register_spa<A>(
        &self,
        settings: &DeploySettings,
        artifacts: &A,
    ) -> Result<Registration, DeployError>
    where
        A: ArtifactProvider + Clone + Send + Sync + 'static,
    {
        let options = BuildOptions::from_settings(settings, false);
        let assets = read_build(artifacts, move |a| Ok(build_manifest(a, &options)?)).await?;

        let descriptor = SpaDescriptor::new(
            settings.name.clone(),
            settings.package_config.clone(),
            settings.skyux_config.clone(),
            assets,
        )
        .with_root_element(settings.root_element_tag_name.clone());

        info!("Registering {} with the portal.", settings.name);
        self.portal
            .deploy_spa(&settings.access_key, &descriptor, &settings.version)
            .await?;

        Ok(Registration::Portal)
    }

    /// Writes the exact version row and, for release versions, the major and
    /// `<major>-latest` aliases.
    async fn register_static<A>(
        &self,
        settings: &DeploySettings,
        artifacts: &A,
    ) -> Result<Registration, DeployError>
    where
        A: ArtifactProvider + Clone + Send + Sync + 'static,
    {
        let version = settings.version.as_str();
        let mut rows = vec![self.register(settings, artifacts, version, version).await?];

        match valid_major_version(version) {
            Some(major) => {
                rows.push(self.register(settings, artifacts, &major, &major).await?);
                rows.push(
                    self.register(settings, artifacts, version, &latest_alias(&major))
                        .await?,
                );
            }
            None => info!(
                "Not updating latest major release as version {version} is invalid or is a pre-release."
            ),
        }

        Ok(Registration::Rows(rows))
    }

    /// Registers the bundles of `namespace` under `row_key`.
    ///
    /// Each row lists its own namespace only, never the exact and major trees together.
    async fn register<A>(
        &self,
        settings: &DeploySettings,
        artifacts: &A,
        namespace: &str,
        row_key: &str,
    ) -> Result<String, DeployError>
    where
        A: ArtifactProvider + Clone + Send + Sync + 'static,
    {
        let tree = namespace.to_string();
        let assets = read_build(artifacts, move |a| Ok(bundle_assets(a, &tree, false)?)).await?;
        let entity = VersionEntity::release(
            &settings.name,
            row_key,
            &assets,
            &settings.package_config,
            &settings.skyux_config,
        )?;

        info!("Registering {namespace} as {row_key}.");
        self.publisher
            .publish_version_entity(&settings.table_name, &entity)
            .await?;

        Ok(entity.row_key)
    }

    /// Marks `settings.version` as the current version without uploading.
    #[instrument(skip_all, fields(app = %settings.name, version = %settings.version))]
    pub async fn publish(&self, settings: &DeploySettings) -> Result<(), DeployError> {
        let result = match settings.mode {
            DeployMode::Static => {
                let entity = VersionEntity::pointer(&settings.name, &settings.version);
                self.publisher
                    .publish_version_entity(&settings.table_name, &entity)
                    .await
                    .map_err(DeployError::from)
            }
            DeployMode::Spa => {
                let request = PublishRequest {
                    name: settings.name.clone(),
                    version: settings.version.clone(),
                };
                self.portal
                    .publish_spa(&settings.access_key, &request)
                    .await
                    .map_err(DeployError::from)
            }
        };

        match &result {
            Ok(()) => info!("Successfully published."),
            Err(e) => error!("{e}"),
        }
        result
    }
}

/// Bundle assets with content plus every emitted asset.
fn collect_assets<A>(settings: &DeploySettings, artifacts: &A) -> Result<Vec<Asset>, DeployError>
where
    A: ArtifactProvider + ?Sized,
{
    let mut assets = build_manifest(artifacts, &BuildOptions::from_settings(settings, true))?;
    assets.extend(emitted_assets(
        artifacts,
        &settings.assets_glob,
        settings.mode,
        &settings.version,
    )?);

    if assets.is_empty() {
        return Err(ValidationError::NoAssets.into());
    }

    debug!(count = assets.len(), "Collected assets");
    Ok(assets)
}
