//! Error envelope shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::gee::ProviderError;
use crate::query::QueryError;

pub const UNSUPPORTED_QUERY_MESSAGE: &str = "Query not supported. Please visit https://doc.apihighways.org/ to obtain more information on supported queries.";

pub const DOWNLOAD_NOT_SUPPORTED_MESSAGE: &str = "Download not supported for this dataset. Please visit https://doc.apihighways.org/ to obtain more information on supported queries.";

const QUERY_FAILED_MESSAGE: &str = "Error performing query";

const CATALOG_FAILED_MESSAGE: &str = "Error updating dataset status";

/// `{ "status": 400, "detail": "..." }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: String,
}

/// Every way a request can fail, one variant per response class.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The request body or parameters do not match the expected schema.
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("SQL format error: {0}")]
    SqlFormat(String),

    /// The provider rejected the query.
    #[error("Query error: {0}")]
    GeeQuery(String),

    /// Valid input the provider cannot run.
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Download not supported: {0}")]
    DownloadNotSupported(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdapterError::Validation(_) | AdapterError::SqlFormat(_) | AdapterError::GeeQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            AdapterError::DownloadNotSupported(_) => StatusCode::NOT_IMPLEMENTED,
            AdapterError::UnsupportedQuery(_)
            | AdapterError::Catalog(_)
            | AdapterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller. Internal details stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            AdapterError::Validation(msg)
            | AdapterError::SqlFormat(msg)
            | AdapterError::GeeQuery(msg) => msg.clone(),
            AdapterError::UnsupportedQuery(_) => UNSUPPORTED_QUERY_MESSAGE.to_string(),
            AdapterError::DownloadNotSupported(_) => DOWNLOAD_NOT_SUPPORTED_MESSAGE.to_string(),
            AdapterError::Catalog(_) => CATALOG_FAILED_MESSAGE.to_string(),
            AdapterError::Internal(_) => QUERY_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status().as_u16(),
            detail: self.detail(),
        }
    }
}

impl From<QueryError> for AdapterError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::SqlFormat(msg) => AdapterError::SqlFormat(msg),
            QueryError::Unsupported(msg) => AdapterError::UnsupportedQuery(msg),
            QueryError::Malformed(_) | QueryError::FilterType { .. } => {
                AdapterError::Validation(error.to_string())
            }
        }
    }
}

impl From<ProviderError> for AdapterError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Query(msg) => AdapterError::GeeQuery(msg),
            ProviderError::Unsupported(msg) => AdapterError::UnsupportedQuery(msg),
            other => AdapterError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("[ROUTER]: {}", self);
        } else {
            warn!("[ROUTER]: {}", self);
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_mapping() {
        let e: AdapterError = QueryError::SqlFormat("bad".into()).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.detail(), "bad");

        let e: AdapterError = QueryError::Unsupported("GROUP BY".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.detail(), UNSUPPORTED_QUERY_MESSAGE);

        let e: AdapterError = QueryError::FilterType { key: "a".into() }.into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.detail(), "Filter parameter 'a' must be a string");
    }

    #[test]
    fn test_provider_error_mapping() {
        let e: AdapterError = ProviderError::Query("Table not found".into()).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.detail(), "Table not found");

        let e: AdapterError = ProviderError::Transport("connection reset".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.detail(), "Error performing query");
    }

    #[test]
    fn test_download_not_supported() {
        let e = AdapterError::DownloadNotSupported("a".into());
        assert_eq!(e.body().status, 501);
        assert_eq!(e.body().detail, DOWNLOAD_NOT_SUPPORTED_MESSAGE);
    }
}
