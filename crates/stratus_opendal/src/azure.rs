//! Container creation against the Azure Blob REST API.
//!
//! OpenDAL's azblob service works inside an existing container only, so
//! containers are created with a Shared Key signed `Create Container` call.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode, Url};
use sha2::Sha256;
use std::collections::BTreeMap;
use stratus_core::error::StorageError;
use tracing::{debug, error, info};

pub(crate) const API_VERSION: &str = "2021-08-06";

/// Anonymous read access granted on a new container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PublicAccess {
    /// Blobs are publicly readable, listing is not.
    Blob,
    Private,
}

#[derive(Clone)]
pub(crate) struct AzureAccount {
    pub(crate) name: String,
    pub(crate) access_key: String,
    pub(crate) endpoint: String,
}

fn generic(message: String) -> StorageError {
    error!("{message}");
    StorageError::Generic(message)
}

/// The Shared Key string-to-sign of a bodiless `PUT`.
///
/// The eleven standard headers are all empty; `Content-Length` is empty for a
/// zero-length body.
pub(crate) fn string_to_sign(
    account: &str,
    path: &str,
    headers: &BTreeMap<&str, String>,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();

    let standard_headers = "\n".repeat(12);
    format!("PUT{standard_headers}{canonical_headers}/{account}{path}\nrestype:container")
}

fn sign(access_key: &str, string_to_sign: &str) -> Result<String, StorageError> {
    let key = STANDARD
        .decode(access_key)
        .map_err(|e| generic(format!("Azure access key is not valid base64: {e}")))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| generic(format!("Azure access key rejected: {e}")))?;
    mac.update(string_to_sign.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Creates `container` unless it already exists.
pub(crate) async fn create_container(
    http: &Client,
    account: &AzureAccount,
    container: &str,
    access: PublicAccess,
) -> Result<(), StorageError> {
    let url = format!(
        "{}/{container}?restype=container",
        account.endpoint.trim_end_matches('/')
    );
    let path = Url::parse(&url)
        .map_err(|e| generic(format!("Invalid Azure endpoint {url}: {e}")))?
        .path()
        .to_string();

    let mut headers = BTreeMap::new();
    headers.insert(
        "x-ms-date",
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
    );
    headers.insert("x-ms-version", API_VERSION.to_string());
    if access == PublicAccess::Blob {
        headers.insert("x-ms-blob-public-access", "blob".to_string());
    }

    let signature = sign(
        &account.access_key,
        &string_to_sign(&account.name, &path, &headers),
    )?;

    let mut request = http
        .put(&url)
        .header("Content-Length", "0")
        .header("Authorization", format!("SharedKey {}:{signature}", account.name));
    for (name, value) in &headers {
        request = request.header(*name, value);
    }

    debug!("Creating container at {url}");
    let response = request
        .send()
        .await
        .map_err(|e| generic(format!("Azure Create Container Error: {e}")))?;

    match response.status() {
        StatusCode::CREATED => {
            info!("Created container {container}");
            Ok(())
        }
        StatusCode::CONFLICT => {
            debug!("Container {container} already exists");
            Ok(())
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(generic(format!(
                "Azure Create Container Error: {container} returned {status}: {body}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_lists_sorted_ms_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("x-ms-version", API_VERSION.to_string());
        headers.insert("x-ms-date", "Fri, 16 Oct 2026 10:00:00 GMT".to_string());
        headers.insert("x-ms-blob-public-access", "blob".to_string());

        assert_eq!(
            string_to_sign("acct", "/my-app", &headers),
            "PUT\n\n\n\n\n\n\n\n\n\n\n\n\
             x-ms-blob-public-access:blob\n\
             x-ms-date:Fri, 16 Oct 2026 10:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /acct/my-app\nrestype:container"
        );
    }

    #[test]
    fn signature_is_hmac_of_the_decoded_key() {
        let key = STANDARD.encode(b"secret");
        let first = sign(&key, "payload").unwrap();

        assert_eq!(first, sign(&key, "payload").unwrap());
        assert_ne!(first, sign(&key, "other").unwrap());
        assert_eq!(STANDARD.decode(&first).unwrap().len(), 32);
    }

    #[test]
    fn malformed_key_is_rejected() {
        assert!(matches!(
            sign("not base64!", "payload"),
            Err(StorageError::Generic(_))
        ));
    }
}
