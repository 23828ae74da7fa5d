//! HTTP surface of the adapter.

pub mod error;
pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::{routing::post, Router};

use crate::catalog::Catalog;
use crate::gee::QueryExecutor;

pub use error::{AdapterError, ErrorBody};

/// Shared state handed to every handler.
pub struct AppState {
    pub executor: Arc<dyn QueryExecutor>,
    pub catalog: Arc<dyn Catalog>,
    /// Surface probe and catalog failures from `/rest-datasets/gee`
    /// instead of always answering 200.
    pub report_register_failures: bool,
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/query/{dataset_id}", post(handlers::query))
        .route("/fields/{dataset_id}", post(handlers::fields))
        .route("/download/{dataset_id}", post(handlers::download))
        .route("/rest-datasets/gee", post(handlers::register_dataset))
}

/// Routes mounted under `/api/v1/earthengine`, with state attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1/earthengine", configure_routes())
        .with_state(state)
}
