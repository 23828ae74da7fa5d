//! Request schemas.
//!
//! Bodies are validated here, before anything reaches the translator.

use serde::Deserialize;
use serde_json::{Map, Value};

/// `dataset: { data: { attributes: { tableName } } }`
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEnvelope {
    pub data: Dataset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    pub attributes: DatasetAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetAttributes {
    #[serde(rename = "tableName")]
    pub table_name: String,
}

/// Body of `/query` and `/download`.
///
/// Keys other than `dataset` and `sql` are filter parameters, kept in the
/// order they were sent.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub dataset: DatasetEnvelope,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl QueryRequest {
    pub fn table_name(&self) -> &str {
        &self.dataset.data.attributes.table_name
    }
}

/// Body of `/fields`.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldsRequest {
    pub dataset: DatasetEnvelope,
}

/// Body of `/rest-datasets/gee`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub connector: Connector,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connector {
    pub id: String,
    pub table_name: String,
}
