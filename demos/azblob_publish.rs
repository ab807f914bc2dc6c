use std::env;
use stratus::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings {
        name: env::var("STRATUS_NAME").ok(),
        version: env::var("STRATUS_VERSION").ok(),
        azure_storage_account: env::var("STRATUS_AZURE_STORAGE_ACCOUNT").ok(),
        azure_storage_access_key: env::var("STRATUS_AZURE_STORAGE_ACCESS_KEY").ok(),
        azure_storage_table_name: env::var("STRATUS_AZURE_STORAGE_TABLE_NAME").ok(),
        is_static_client: Some(true),
        ..Default::default()
    }
    .validate()?;

    let mut storage = OpendalStorage::azblob(&settings.storage_account, &settings.access_key);
    if let Ok(endpoint) = env::var("STRATUS_STORAGE_ENDPOINT") {
        // e.g. http://127.0.0.1:10000/devstoreaccount1 for Azurite
        storage = storage.with_endpoint(endpoint);
    }

    let portal_url = env::var("STRATUS_PORTAL_URL").unwrap_or_default();
    let deployer = Deployer::new(
        StoragePublisher::new(storage.clone(), storage),
        PortalHttpClient::new(portal_url),
    );

    deployer.publish(&settings).await?;
    println!("{} now points at {}", settings.name, settings.version);
    Ok(())
}
