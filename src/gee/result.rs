use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::query::Projection;

/// Column that carries each feature's geometry.
pub const GEOMETRY_COLUMN: &str = "the_geom";

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<CellValue>>,
    pub row_count: usize,
    pub execution_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Geometry(Value),
    Json(Value),
    Array(Vec<CellValue>),
}

impl CellValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Array(items) => CellValue::Array(items.iter().map(CellValue::from_json).collect()),
            Value::Object(_) if is_geometry(value) => CellValue::Geometry(value.clone()),
            Value::Object(_) => CellValue::Json(value.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Integer(i) => serde_json::json!(*i),
            CellValue::Float(f) => serde_json::json!(*f),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Geometry(g) | CellValue::Json(g) => g.clone(),
            CellValue::Array(items) => Value::Array(items.iter().map(CellValue::to_json).collect()),
        }
    }

    /// Flat text form, as written to a CSV cell. Nulls are empty and nested
    /// values are compact JSON.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Geometry(_) | CellValue::Json(_) | CellValue::Array(_) => {
                self.to_json().to_string()
            }
        }
    }

    /// Schema type reported for a column holding this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "boolean",
            CellValue::Integer(_) | CellValue::Float(_) => "number",
            CellValue::Text(_) => "string",
            CellValue::Geometry(_) => "geometry",
            CellValue::Json(_) => "object",
            CellValue::Array(_) => "array",
        }
    }
}

fn is_geometry(value: &Value) -> bool {
    matches!(
        value.get("type").and_then(Value::as_str),
        Some(
            "Point"
                | "MultiPoint"
                | "LineString"
                | "MultiLineString"
                | "Polygon"
                | "MultiPolygon"
                | "GeometryCollection"
        )
    ) && (value.get("coordinates").is_some() || value.get("geometries").is_some())
}

/// A GeoJSON feature as returned by `table:computeFeatures`.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl QueryResult {
    /// Tabulate features. Columns follow property order of first appearance,
    /// with the geometry column last; a named projection fixes the columns
    /// and their order instead.
    pub fn from_features(features: &[Feature], projection: &Projection, execution_time: Duration) -> Self {
        let names: Vec<String> = match projection {
            Projection::Columns(columns) => columns.clone(),
            Projection::All => {
                let mut names: Vec<String> = Vec::new();
                for feature in features {
                    for key in feature.properties.iter().flat_map(|p| p.keys()) {
                        if !names.iter().any(|n| n == key) {
                            names.push(key.clone());
                        }
                    }
                }
                let has_geometry = features
                    .iter()
                    .any(|f| f.geometry.as_ref().is_some_and(|g| !g.is_null()));
                if has_geometry && !names.iter().any(|n| n == GEOMETRY_COLUMN) {
                    names.push(GEOMETRY_COLUMN.to_string());
                }
                names
            }
        };

        let rows: Vec<Vec<CellValue>> = features
            .iter()
            .map(|feature| names.iter().map(|name| cell_for(feature, name)).collect())
            .collect();

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let type_name = rows
                    .iter()
                    .map(|row| &row[i])
                    .find(|cell| !matches!(cell, CellValue::Null))
                    .map(CellValue::type_name)
                    .unwrap_or("null");
                ColumnInfo {
                    name,
                    type_name: type_name.to_string(),
                }
            })
            .collect();

        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
            execution_time,
        }
    }
}

fn cell_for(feature: &Feature, name: &str) -> CellValue {
    if let Some(value) = feature.properties.as_ref().and_then(|p| p.get(name)) {
        return CellValue::from_json(value);
    }
    if name == GEOMETRY_COLUMN {
        if let Some(geometry) = feature.geometry.as_ref().filter(|g| !g.is_null()) {
            return CellValue::Geometry(geometry.clone());
        }
    }
    CellValue::Null
}
