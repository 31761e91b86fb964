//! HTTP IPFS gateway.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::traits::*;
use crate::types::ContentHash;

/// Default public gateway.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";

/// Resolves content through `GET {base}/ipfs/{hash}`.
pub struct HttpGateway {
    base_url: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl ContentGateway for HttpGateway {
    fn url(&self, hash: &ContentHash) -> String {
        format!("{}/ipfs/{}", self.base_url.trim_end_matches('/'), hash)
    }

    async fn fetch(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let response = self.client.get(self.url(hash)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(hash.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Service { status, message });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_is_computed_locally() {
        let gateway = HttpGateway::new("https://gateway.example/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.url(&ContentHash::from("QmAbc")),
            "https://gateway.example/ipfs/QmAbc"
        );
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ipfs/QmResolution"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Suspect arrested"))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(server.uri(), Duration::from_secs(5)).unwrap();
        let text = gateway
            .fetch_text(&ContentHash::from("QmResolution"))
            .await
            .unwrap();
        assert_eq!(text, "Suspect arrested");
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            gateway.fetch(&ContentHash::from("QmGone")).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
