//! Response shaping for query results and field listings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gee::{ColumnInfo, QueryResult};

/// One column of a dataset, tagged with the table it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "columnName")]
    pub column_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Wrap rows into `{ "data": [...], "meta": meta }`.
///
/// `meta` carries no pagination or counts.
pub fn serialize_query(result: &QueryResult, meta: Map<String, Value>) -> Value {
    serde_json::json!({
        "data": rows_to_json(result),
        "meta": meta,
    })
}

/// Rows as JSON objects keyed by column name, in column order.
pub fn rows_to_json(result: &QueryResult) -> Vec<Value> {
    result
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (i, cell) in row.iter().enumerate() {
                let col_name = result
                    .columns
                    .get(i)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("column_{}", i));
                obj.insert(col_name, cell.to_json());
            }
            Value::Object(obj)
        })
        .collect()
}

pub fn serialize_fields(fields: &[ColumnInfo], table_name: &str) -> Vec<FieldDescriptor> {
    fields
        .iter()
        .map(|field| FieldDescriptor {
            table_name: table_name.to_string(),
            column_name: field.name.clone(),
            type_name: field.type_name.clone(),
        })
        .collect()
}
