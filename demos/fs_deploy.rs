use opendal::{Operator, services::Fs};
use serde_json::json;
use std::env;
use stratus::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Any OpenDAL service works here, e.g. opendal::services::Azblob.
    let root_path = env::var("STRATUS_FS_ROOT").unwrap_or_else(|_| "/tmp/stratus".to_string());
    let op = Operator::new(Fs::default().root(&root_path))?.finish();
    let storage = OpendalStorage::new(op);

    // Static deployments never reach the portal.
    let deployer = Deployer::new(
        StoragePublisher::new(storage.clone(), storage),
        MockPortal::new(),
    );

    let settings = Settings {
        name: Some("demo-app".into()),
        version: Some(env::var("STRATUS_VERSION").unwrap_or_else(|_| "1.0.0".into())),
        azure_storage_account: Some("local".into()),
        azure_storage_access_key: Some("unused".into()),
        azure_storage_table_name: Some("versions".into()),
        is_static_client: Some(true),
        package_config: Some(json!({"name": "demo-app"})),
        ..Default::default()
    }
    .validate()?;

    let dist = env::var("STRATUS_DIST").unwrap_or_else(|_| "dist".to_string());
    let report = deployer
        .deploy(&settings, &FsArtifacts::new(dist), &CancellationToken::new())
        .await?;

    println!("Uploaded {} assets to {root_path}", report.uploaded.len());
    println!("Registration: {:?}", report.registration);
    Ok(())
}
