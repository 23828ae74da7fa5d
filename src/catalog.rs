//! Dataset status reporting to the catalog microservice.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CatalogConfig;

/// Registration status values understood by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetStatus {
    Saved,
    Failed,
}

impl DatasetStatus {
    pub fn code(self) -> u8 {
        match self {
            DatasetStatus::Saved => 1,
            DatasetStatus::Failed => 2,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Transport(String),

    #[error("Catalog returned status {status}: {message}")]
    Status { status: u16, message: String },
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn update_dataset_status(&self, dataset_id: &str, status: DatasetStatus) -> Result<(), CatalogError>;
}

#[derive(Serialize)]
struct StatusUpdate {
    status: u8,
}

pub struct CatalogClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.url)
            .map_err(|e| CatalogError::Transport(format!("Invalid catalog URL {}: {}", config.url, e)))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// `{base}/v1/dataset/{id}`, with the id encoded as a single path segment.
    fn dataset_url(&self, dataset_id: &str) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::Transport(format!("Catalog URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "dataset", dataset_id]);
        Ok(url)
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn update_dataset_status(&self, dataset_id: &str, status: DatasetStatus) -> Result<(), CatalogError> {
        let url = self.dataset_url(dataset_id)?;
        debug!("Catalog request: PATCH {}", url);

        let mut request = self.client.patch(url).json(&StatusUpdate {
            status: status.code(),
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let code = response.status();
        if !code.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: code.as_u16(),
                message,
            });
        }

        info!(dataset_id, status = status.code(), "updated dataset status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(url: &str, token: Option<&str>) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            url: url.to_string(),
            token: token.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DatasetStatus::Saved.code(), 1);
        assert_eq!(DatasetStatus::Failed.code(), 2);
    }

    #[tokio::test]
    async fn test_patch_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/dataset/abc-123"))
            .and(header("authorization", "Bearer ct-token"))
            .and(body_json(serde_json::json!({"status": 2})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        client(&mock_server.uri(), Some("ct-token"))
            .update_dataset_status("abc-123", DatasetStatus::Failed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_patch_encodes_dataset_id() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/dataset/a%2Fb%3Fc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        client(&mock_server.uri(), None)
            .update_dataset_status("a/b?c", DatasetStatus::Saved)
            .await
            .unwrap();
    }

    #[test]
    fn test_dataset_url_keeps_base_path() {
        let c = client("http://catalog.local/api/", None);
        assert_eq!(
            c.dataset_url("abc").unwrap().as_str(),
            "http://catalog.local/api/v1/dataset/abc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = CatalogClient::new(&CatalogConfig {
            url: "not a url".to_string(),
            token: None,
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(CatalogError::Transport(_))));
    }

    #[tokio::test]
    async fn test_patch_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/dataset/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Dataset not found"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server.uri(), None)
            .update_dataset_status("missing", DatasetStatus::Saved)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::Status {
                status: 404,
                message: "Dataset not found".to_string()
            }
        );
    }
}
