use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use stratus_build::FsArtifacts;
use stratus_core::prelude::*;
use stratus_deploy::{Deployer, Registration};
use stratus_opendal::OpendalStorage;
use stratus_portal::PortalHttpClient;
use stratus_publish::StoragePublisher;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Publishes versioned front-end bundles to blob and table storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a build output directory and register the version
    Deploy {
        /// The build output directory
        #[arg(long, env = "STRATUS_DIST", default_value = "dist")]
        dist: PathBuf,
    },
    /// Make an already deployed version the current one
    Publish,
}

#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Application name, also used as the blob container
    #[arg(long, global = true, env = "STRATUS_NAME")]
    name: Option<String>,

    /// The version being deployed (e.g. "2.4.0")
    #[arg(long, global = true, env = "STRATUS_VERSION")]
    version: Option<String>,

    #[arg(long, global = true, env = "STRATUS_AZURE_STORAGE_ACCOUNT")]
    azure_storage_account: Option<String>,

    #[arg(long, global = true, env = "STRATUS_AZURE_STORAGE_ACCESS_KEY")]
    azure_storage_access_key: Option<String>,

    #[arg(long, global = true, env = "STRATUS_AZURE_STORAGE_TABLE_NAME")]
    azure_storage_table_name: Option<String>,

    /// Deploy a statically hosted client instead of a portal SPA
    #[arg(long = "static", global = true, env = "STRATUS_IS_STATIC_CLIENT")]
    is_static_client: bool,

    #[arg(long, global = true, env = "STRATUS_HASH_FILE_NAMES")]
    hash_file_names: Option<bool>,

    /// Glob of images and fonts to upload, relative to the build output
    #[arg(long, global = true, env = "STRATUS_ASSETS_GLOB")]
    assets_glob: Option<String>,

    /// JSON file with the package configuration
    #[arg(long, global = true, env = "STRATUS_PACKAGE_CONFIG")]
    package_config: Option<PathBuf>,

    /// JSON file with the SKY UX configuration
    #[arg(long, global = true, env = "STRATUS_SKYUX_CONFIG")]
    skyux_config: Option<PathBuf>,

    #[arg(long, global = true, env = "STRATUS_ROOT_ELEMENT_TAG_NAME")]
    root_element_tag_name: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Backend {
    #[default]
    Azblob,
    Fs,
}

#[derive(Args, Debug)]
struct TargetArgs {
    #[arg(long, global = true, env = "STRATUS_BACKEND", value_enum, default_value_t)]
    backend: Backend,

    /// Root directory of the fs backend
    #[arg(long, global = true, env = "STRATUS_STORAGE_ROOT", default_value = ".stratus")]
    storage_root: String,

    /// Overrides the Azure blob endpoint, e.g. for Azurite
    #[arg(long, global = true, env = "STRATUS_STORAGE_ENDPOINT")]
    storage_endpoint: Option<String>,

    /// Base URL of the SPA portal
    #[arg(long, global = true, env = "STRATUS_PORTAL_URL")]
    portal_url: Option<String>,
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

impl SettingsArgs {
    fn into_settings(self) -> anyhow::Result<Settings> {
        Ok(Settings {
            name: self.name,
            version: self.version,
            azure_storage_account: self.azure_storage_account,
            azure_storage_access_key: self.azure_storage_access_key,
            azure_storage_table_name: self.azure_storage_table_name,
            is_static_client: Some(self.is_static_client),
            hash_file_names: self.hash_file_names,
            assets_glob: self.assets_glob,
            package_config: self.package_config.as_deref().map(read_json).transpose()?,
            skyux_config: self.skyux_config.as_deref().map(read_json).transpose()?,
            root_element_tag_name: self.root_element_tag_name,
        })
    }
}

type CliDeployer = Deployer<OpendalStorage, OpendalStorage, PortalHttpClient>;

fn deployer(target: &TargetArgs, settings: &DeploySettings) -> anyhow::Result<CliDeployer> {
    let storage = match target.backend {
        Backend::Fs => OpendalStorage::fs(&target.storage_root)?,
        Backend::Azblob => {
            let storage = OpendalStorage::azblob(&settings.storage_account, &settings.access_key);
            match &target.storage_endpoint {
                Some(endpoint) => storage.with_endpoint(endpoint),
                None => storage,
            }
        }
    };

    let portal_url = match (&target.portal_url, settings.mode) {
        (Some(url), _) => url.clone(),
        (None, DeployMode::Static) => String::new(),
        (None, DeployMode::Spa) => bail!("--portal-url is required for SPA deployments"),
    };

    Ok(Deployer::new(
        StoragePublisher::new(storage.clone(), storage),
        PortalHttpClient::new(portal_url),
    ))
}

/// Cancelled on Ctrl-C so an interrupted run stops between stages.
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.settings.into_settings()?.validate()?;
    let deployer = deployer(&cli.target, &settings)?;

    match cli.command {
        Commands::Deploy { dist } => {
            println!(
                "🚀 Deploying {} {} from {dist:?}...",
                settings.name, settings.version
            );

            let report = deployer
                .deploy(&settings, &FsArtifacts::new(dist), &shutdown_token())
                .await?;

            for name in &report.uploaded {
                println!("  {name}");
            }
            match report.registration {
                Registration::Portal => println!(
                    "✅ Uploaded {} assets and registered version {} with the portal.",
                    report.uploaded.len(),
                    settings.version
                ),
                Registration::Rows(rows) => println!(
                    "✅ Uploaded {} assets and registered rows {}.",
                    report.uploaded.len(),
                    rows.join(", ")
                ),
            }
        }
        Commands::Publish => {
            println!("📌 Publishing {} {}...", settings.name, settings.version);
            deployer.publish(&settings).await?;
            println!("✅ {} now serves version {}.", settings.name, settings.version);
        }
    }

    Ok(())
}
