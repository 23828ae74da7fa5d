use async_trait::async_trait;
use thiserror::Error;

use super::result::{ColumnInfo, QueryResult};
use crate::query::ProviderQuery;

/// Failures reported by a query executor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The backend rejected the query itself.
    #[error("{0}")]
    Query(String),

    /// The query cannot be expressed against the backend.
    #[error("Unsupported query: {0}")]
    Unsupported(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Runs provider queries.
///
/// Calls are awaited to completion by the handler; there is no retry.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute and return rows plus column metadata.
    async fn execute(&self, query: &ProviderQuery) -> Result<QueryResult, ProviderError>;

    /// Execute for column metadata only.
    async fn execute_metadata_only(&self, query: &ProviderQuery) -> Result<Vec<ColumnInfo>, ProviderError> {
        let result = self.execute(&query.with_limit(1)).await?;
        Ok(result.columns)
    }
}
