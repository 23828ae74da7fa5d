//! Query-string fragment construction.
//!
//! Requests reach the translator as a fragment in one of two forms:
//!
//! ```text
//! ?sql=SELECT * FROM "forest_loss" LIMIT 1
//! ?tableName="forest_loss"&year=2020&iso=BRA
//! ```
//!
//! The table name, filter keys and filter values are percent-encoded so that
//! `&`, `=` and `%` inside them survive the round trip. The fragment is never
//! sent over the wire, it is only read back by [`super::QueryService::convert`].
use serde_json::Value;

use super::types::{QueryError, QueryType};

/// Key carrying the dataset envelope in request bodies; never a filter.
pub const DATASET_KEY: &str = "dataset";

pub fn sql_query_string(sql: &str) -> String {
    format!("?sql={}", sql)
}

/// Build `?tableName="<table>"&key=value...` from filters in the order given.
pub fn fs_query_string<'a, I>(table_name: &str, filters: I) -> Result<String, QueryError>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut query = format!("?tableName=\"{}\"", urlencoding::encode(table_name));
    for (key, value) in filters {
        if key == DATASET_KEY {
            continue;
        }
        let value = value.as_str().ok_or_else(|| QueryError::FilterType {
            key: key.to_string(),
        })?;
        query.push('&');
        query.push_str(&urlencoding::encode(key));
        query.push('=');
        query.push_str(&urlencoding::encode(value));
    }
    Ok(query)
}

/// Pick the request form: SQL when `sql` is present, otherwise filters.
pub fn build_query<'a, I>(
    table_name: &str,
    sql: Option<&str>,
    filters: I,
) -> Result<(String, QueryType), QueryError>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    match sql {
        Some(sql) if !sql.is_empty() => Ok((sql_query_string(sql), QueryType::Sql)),
        _ => Ok((fs_query_string(table_name, filters)?, QueryType::Fs)),
    }
}

/// Probe used to read a table's schema: a single row of every column.
pub fn schema_probe(table_name: &str) -> String {
    sql_query_string(&format!("SELECT * FROM \"{}\" LIMIT 1", table_name))
}
