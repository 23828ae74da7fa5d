//! Lowering of a `ProviderQuery` to an Earth Engine expression graph.
//!
//! The graph loads the table, applies one `Filter.and` over all predicates
//! and finally sorts/limits:
//!
//! ```text
//! Collection.limit(
//!     Collection.filter(Collection.loadTable(tableId), Filter.and([...])),
//!     limit, key, ascending)
//! ```
//!
//! Column selection is not part of the graph; the client applies the
//! projection when tabulating features.

use serde_json::{json, Map, Value};

use super::executor::ProviderError;
use crate::query::{CompareOp, Literal, Predicate, ProviderQuery};

/// Build the `{ "result": ..., "values": ... }` expression for a query.
pub fn to_expression(query: &ProviderQuery) -> Result<Value, ProviderError> {
    let mut node = invoke(
        "Collection.loadTable",
        vec![("tableId", constant(json!(query.table)))],
    );

    if !query.predicates.is_empty() {
        let filters = query
            .predicates
            .iter()
            .map(filter_node)
            .collect::<Result<Vec<_>, _>>()?;
        let filter = match <[Value; 1]>::try_from(filters) {
            Ok([single]) => single,
            Err(filters) => invoke("Filter.and", vec![("filters", array(filters))]),
        };
        node = invoke(
            "Collection.filter",
            vec![("collection", node), ("filter", filter)],
        );
    }

    if query.limit.is_some() || query.order_by.is_some() {
        let mut args = vec![("collection", node)];
        if let Some(limit) = query.limit {
            args.push(("limit", constant(json!(limit))));
        }
        if let Some(order) = &query.order_by {
            args.push(("key", constant(json!(order.column))));
            args.push(("ascending", constant(json!(order.ascending))));
        }
        node = invoke("Collection.limit", args);
    }

    Ok(json!({
        "result": "0",
        "values": { "0": node }
    }))
}

fn filter_node(predicate: &Predicate) -> Result<Value, ProviderError> {
    match predicate {
        Predicate::Compare { column, op, value } => {
            if matches!(value, Literal::Null) {
                return Err(ProviderError::Unsupported(format!(
                    "comparison of '{}' with NULL, use IS NULL",
                    column
                )));
            }
            let name = match op {
                CompareOp::Eq => "Filter.equals",
                CompareOp::NotEq => "Filter.notEquals",
                CompareOp::Lt => "Filter.lessThan",
                CompareOp::LtEq => "Filter.lessThanOrEquals",
                CompareOp::Gt => "Filter.greaterThan",
                CompareOp::GtEq => "Filter.greaterThanOrEquals",
            };
            Ok(invoke(
                name,
                vec![
                    ("leftField", constant(json!(column))),
                    ("rightValue", constant(value.to_json())),
                ],
            ))
        }
        Predicate::InList {
            column,
            values,
            negated,
        } => {
            let list = values.iter().map(Literal::to_json).collect::<Vec<_>>();
            let node = invoke(
                "Filter.inList",
                vec![
                    ("leftField", constant(json!(column))),
                    ("rightValue", constant(Value::Array(list))),
                ],
            );
            Ok(negate_if(node, *negated))
        }
        Predicate::IsNull { column, negated } => {
            let not_null = invoke(
                "Filter.notNull",
                vec![("properties", constant(json!([column])))],
            );
            Ok(negate_if(not_null, !*negated))
        }
        Predicate::Between {
            column,
            low,
            high,
            negated,
        } => {
            let node = invoke(
                "Filter.rangeContains",
                vec![
                    ("field", constant(json!(column))),
                    ("minValue", constant(low.to_json())),
                    ("maxValue", constant(high.to_json())),
                ],
            );
            Ok(negate_if(node, *negated))
        }
    }
}

fn negate_if(filter: Value, negate: bool) -> Value {
    if negate {
        invoke("Filter.not", vec![("filter", filter)])
    } else {
        filter
    }
}

fn invoke(function_name: &str, arguments: Vec<(&str, Value)>) -> Value {
    let arguments: Map<String, Value> = arguments
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    json!({
        "functionInvocationValue": {
            "functionName": function_name,
            "arguments": arguments
        }
    })
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

fn array(values: Vec<Value>) -> Value {
    json!({ "arrayValue": { "values": values } })
}
