//! Pinata pinning service client.

use async_trait::async_trait;
use cid::Cid;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::traits::*;
use crate::types::ContentHash;

/// Default Pinata API base URL.
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

/// Pinata credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinataConfig {
    pub api_url: String,
    pub api_key: String,
    pub secret_api_key: String,
    pub timeout_secs: u64,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PINATA_API_URL.to_string(),
            api_key: String::new(),
            secret_api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
    #[serde(default)]
    pin_size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
}

/// Pins content through `POST /pinning/pinFileToIPFS`.
pub struct PinataStore {
    config: PinataConfig,
    client: Client,
}

impl PinataStore {
    pub fn new(config: PinataConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn pin_url(&self) -> String {
        format!(
            "{}/pinning/pinFileToIPFS",
            self.config.api_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn pin(&self, data: &[u8], kind: PinKind) -> Result<ContentHash, StorageError> {
        let part = Part::bytes(data.to_vec())
            .file_name(kind.file_name())
            .mime_str(kind.content_type())?;
        let metadata = serde_json::to_string(&PinataMetadata {
            name: kind.file_name(),
        })
        .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
        let form = Form::new().part("file", part).text("pinataMetadata", metadata);

        let response = self
            .client
            .post(self.pin_url())
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.secret_api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Service { status, message });
        }

        let body: PinResponse = response.json().await?;
        Cid::from_str(&body.ipfs_hash).map_err(|e| {
            StorageError::InvalidResponse(format!("IpfsHash {} is not a CID: {}", body.ipfs_hash, e))
        })?;

        debug!(hash = %body.ipfs_hash, size = ?body.pin_size, "Pinned to Pinata");
        Ok(ContentHash::new(body.ipfs_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    fn store_for(server: &MockServer) -> PinataStore {
        PinataStore::new(PinataConfig {
            api_url: server.uri(),
            api_key: "key".into(),
            secret_api_key: "secret".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_pin_sends_credentials_and_parses_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinFileToIPFS"))
            .and(header("pinata_api_key", "key"))
            .and(header("pinata_secret_api_key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IpfsHash": CID_V0,
                "PinSize": 14,
                "Timestamp": "2024-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hash = store_for(&server)
            .pin(b"IPFS Test Data", PinKind::Text)
            .await
            .unwrap();
        assert_eq!(hash.as_str(), CID_V0);
    }

    #[tokio::test]
    async fn test_pin_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = store_for(&server).pin(b"x", PinKind::Text).await.unwrap_err();
        assert!(matches!(err, StorageError::Service { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_pin_rejects_non_cid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IpfsHash": "not-a-cid" })))
            .mount(&server)
            .await;

        let err = store_for(&server).pin(b"x", PinKind::Json).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidResponse(_)));
    }
}
