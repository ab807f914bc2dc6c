use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use stratus_core::prelude::*;
use tracing::{debug, error};

/// Talks to the portal that hosts single-page applications.
///
/// - `PUT {base}/spas/{name}/versions/{version}` registers a deployed version.
/// - `POST {base}/spas/{name}/publish` makes a version the current one.
#[derive(Clone)]
pub struct PortalHttpClient {
    base_url: String,
    client: Client,
}

impl PortalHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn auth_request(&self, builder: RequestBuilder, credential: &str) -> RequestBuilder {
        if credential.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {credential}"))
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        builder: RequestBuilder,
        credential: &str,
        body: &B,
    ) -> Result<Response, PortalError> {
        let response = self
            .auth_request(builder, credential)
            .json(body)
            .send()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Portal rejected request with {status}: {text}");
            return Err(PortalError::Rejected(status.as_u16(), text));
        }

        Ok(response)
    }
}

impl Portal for PortalHttpClient {
    async fn deploy_spa(
        &self,
        credential: &str,
        descriptor: &SpaDescriptor,
        version: &str,
    ) -> Result<(), PortalError> {
        let url = format!(
            "{}/spas/{}/versions/{version}",
            self.base_url, descriptor.name
        );
        debug!("Registering SPA at {url}");

        self.send(self.client.put(&url), credential, descriptor)
            .await?;
        Ok(())
    }

    async fn publish_spa(
        &self,
        credential: &str,
        request: &PublishRequest,
    ) -> Result<(), PortalError> {
        let url = format!("{}/spas/{}/publish", self.base_url, request.name);
        debug!("Publishing SPA at {url}");

        self.send(self.client.post(&url), credential, request)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{post, put},
    };
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    async fn record(
        State(seen): State<Seen>,
        Path(params): Path<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        let auth = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let target = match params.get("version") {
            Some(version) => format!("{}/{version}", params["name"]),
            None => params["name"].clone(),
        };
        seen.lock().unwrap().push((target, auth, body));
        StatusCode::CREATED
    }

    async fn portal(status: Option<StatusCode>) -> (PortalHttpClient, Seen) {
        let seen: Seen = Arc::default();
        let app = match status {
            None => Router::new()
                .route("/spas/{name}/versions/{version}", put(record))
                .route("/spas/{name}/publish", post(record))
                .with_state(seen.clone()),
            Some(status) => Router::new().fallback(move || async move { (status, "nope") }),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (PortalHttpClient::new(format!("http://{addr}/")), seen)
    }

    #[tokio::test]
    async fn deploys_descriptor_with_credential() {
        let (client, seen) = portal(None).await;
        let descriptor = SpaDescriptor::new("my-app", json!({"p": 1}), json!({"s": 2}), vec![]);

        client.deploy_spa("abc", &descriptor, "1.2.3").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "my-app/1.2.3");
        assert_eq!(seen[0].1.as_deref(), Some("Bearer abc"));
        assert_eq!(seen[0].2["package_config"], json!({"p": 1}));
        assert_eq!(seen[0].2["scripts"], json!([]));
    }

    #[tokio::test]
    async fn publishes_version() {
        let (client, seen) = portal(None).await;
        let request = PublishRequest {
            name: "my-app".into(),
            version: "1.2.3".into(),
        };

        client.publish_spa("abc", &request).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "my-app");
        assert_eq!(seen[0].2, json!({"name": "my-app", "version": "1.2.3"}));
    }

    #[tokio::test]
    async fn rejection_keeps_status_and_body() {
        let (client, _) = portal(Some(StatusCode::CONFLICT)).await;
        let request = PublishRequest {
            name: "my-app".into(),
            version: "1.2.3".into(),
        };

        match client.publish_spa("abc", &request).await {
            Err(PortalError::Rejected(409, body)) => assert_eq!(body, "nope"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_portal_is_a_network_error() {
        let client = PortalHttpClient::new("http://127.0.0.1:9");
        let request = PublishRequest {
            name: "my-app".into(),
            version: "1.2.3".into(),
        };

        assert!(matches!(
            client.publish_spa("", &request).await,
            Err(PortalError::Network(_))
        ));
    }
}
