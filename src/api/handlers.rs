use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::error::AdapterError;
use super::types::{FieldsRequest, QueryRequest, RegisterRequest};
use super::AppState;
use crate::catalog::DatasetStatus;
use crate::export::{to_csv, CSV_CONTENT_TYPE};
use crate::gee::{ColumnInfo, QueryResult};
use crate::query::{build_query, schema_probe, QueryError, QueryService, QueryType};
use crate::serialize::{serialize_fields, serialize_query};

type UrlParams = Vec<(String, String)>;

fn validate<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AdapterError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| AdapterError::Validation(rejection.body_text()))
}

/// Build the fragment for a query/download request.
///
/// `sql` comes from the URL first, then the body. Filters come from the URL
/// when it has any, otherwise from the body.
fn request_fragment(params: &UrlParams, request: &QueryRequest) -> Result<(String, QueryType), QueryError> {
    let sql = params
        .iter()
        .find(|(k, _)| k == "sql")
        .map(|(_, v)| v.as_str())
        .or(request.sql.as_deref());

    let url_filters: Vec<(&str, Value)> = params
        .iter()
        .filter(|(k, _)| k != "sql")
        .map(|(k, v)| (k.as_str(), Value::String(v.clone())))
        .collect();

    if url_filters.is_empty() {
        build_query(
            request.table_name(),
            sql,
            request.filters.iter().map(|(k, v)| (k.as_str(), v)),
        )
    } else {
        build_query(
            request.table_name(),
            sql,
            url_filters.iter().map(|(k, v)| (*k, v)),
        )
    }
}

async fn run_query(state: &AppState, fragment: &str, query_type: QueryType) -> Result<QueryResult, AdapterError> {
    let provider_query = QueryService::convert(fragment, query_type)?;
    Ok(state.executor.execute(&provider_query).await?)
}

async fn probe_fields(state: &AppState, table_name: &str) -> Result<Vec<ColumnInfo>, AdapterError> {
    let provider_query = QueryService::convert(&schema_probe(table_name), QueryType::Sql)?;
    Ok(state.executor.execute_metadata_only(&provider_query).await?)
}

/// Query a dataset with SQL or filter parameters.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    Query(params): Query<UrlParams>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, AdapterError> {
    info!(%dataset_id, "Doing GEE Query");
    let request = validate(body)?;

    let (fragment, query_type) = request_fragment(&params, &request)?;
    let result = run_query(&state, &fragment, query_type).await?;

    Ok(Json(serialize_query(&result, Map::new())))
}

/// Column listing of a dataset.
pub async fn fields(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    body: Result<Json<FieldsRequest>, JsonRejection>,
) -> Result<Json<Value>, AdapterError> {
    info!(%dataset_id, "Getting fields of a GEE Dataset");
    let request = validate(body)?;
    let table_name = &request.dataset.data.attributes.table_name;

    let columns = probe_fields(&state, table_name).await?;

    Ok(Json(json!({ "data": serialize_fields(&columns, table_name) })))
}

/// Full result of a query, as JSON or CSV depending on `Accept`.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    Query(params): Query<UrlParams>,
    headers: HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, AdapterError> {
    info!(%dataset_id, "Downloading GEE Dataset");
    let request = validate(body)?;

    let (fragment, query_type) = request_fragment(&params, &request).map_err(|e| match e {
        QueryError::FilterType { key } => AdapterError::DownloadNotSupported(key),
        other => other.into(),
    })?;
    let result = run_query(&state, &fragment, query_type).await?;

    if wants_csv(&headers) {
        let disposition = format!("attachment; filename=\"{}.csv\"", dataset_id);
        return Ok((
            [
                (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            to_csv(&result),
        )
            .into_response());
    }

    Ok(Json(serialize_query(&result, Map::new())).into_response())
}

fn wants_csv(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/csv"))
}

/// Probe a new dataset's schema and report the outcome to the catalog.
pub async fn register_dataset(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Value>, AdapterError> {
    info!("Registering new GEE Dataset");
    let connector = validate(body)?.connector;

    let probe = probe_fields(&state, &connector.table_name).await;
    let status = match &probe {
        Ok(_) => DatasetStatus::Saved,
        Err(e) => {
            error!("[ROUTER]: schema probe of {} failed: {}", connector.table_name, e);
            DatasetStatus::Failed
        }
    };

    let reported = state
        .catalog
        .update_dataset_status(&connector.id, status)
        .await;
    if let Err(e) = &reported {
        error!("[ROUTER]: {}", e);
    }

    if state.report_register_failures {
        reported?;
    }
    let columns = match probe {
        Ok(columns) => columns,
        Err(e) if state.report_register_failures => return Err(e),
        Err(_) => Vec::new(),
    };

    Ok(Json(json!({ "data": serialize_fields(&columns, &connector.table_name) })))
}
