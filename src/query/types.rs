//! Provider query types.
//!
//! A `ProviderQuery` is what the translator hands to the execution client:
//! the query-string fragment it was built from plus a typed plan that the
//! Earth Engine lowering can walk without re-parsing anything.

use std::fmt;

use thiserror::Error;

/// Which form of request produced a query fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// `?sql=SELECT ...`
    Sql,
    /// `?tableName="..."&key=value...`
    Fs,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Sql => write!(f, "sql"),
            QueryType::Fs => write!(f, "fs"),
        }
    }
}

/// Errors raised while building or converting a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The fragment does not have the expected `?...` shape.
    #[error("Malformed query string: {0}")]
    Malformed(String),

    /// The SQL statement could not be parsed or is not a query.
    #[error("{0}")]
    SqlFormat(String),

    /// Valid SQL that cannot be expressed against the provider.
    #[error("Unsupported query: {0}")]
    Unsupported(String),

    /// A filter value was not a string.
    #[error("Filter parameter '{key}' must be a string")]
    FilterType { key: String },
}

/// Typed plan of a single-table select.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuery {
    pub query_type: QueryType,
    /// The fragment this plan was converted from.
    pub source: String,
    pub table: String,
    pub projection: Projection,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderKey>,
    pub limit: Option<u64>,
}

impl ProviderQuery {
    /// A plan selecting every column of `table`.
    pub fn scan(query_type: QueryType, source: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            query_type,
            source: source.into(),
            table: table.into(),
            projection: Projection::All,
            predicates: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Copy of this plan capped at `limit` rows, keeping any tighter limit.
    pub fn with_limit(&self, limit: u64) -> Self {
        let mut query = self.clone();
        query.limit = Some(query.limit.map_or(limit, |l| l.min(limit)));
        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    All,
    /// Named columns, in requested order.
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub column: String,
    pub ascending: bool,
}

/// A single conjunct of the WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    InList {
        column: String,
        values: Vec<Literal>,
        negated: bool,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    Between {
        column: String,
        low: Literal,
        high: Literal,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Operator with its operands swapped (`1 < x` is `x > 1`).
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::NotEq => CompareOp::NotEq,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Interpret an untyped filter value the way a form field would be read:
    /// numbers and booleans become typed, everything else stays text.
    ///
    /// Zero-padded digits such as `"004"` are codes, not numbers, and stay text.
    pub fn infer(raw: &str) -> Self {
        if has_leading_zero(raw) {
            Literal::String(raw.to_string())
        } else if let Ok(i) = raw.parse::<i64>() {
            Literal::Integer(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                Literal::Float(f)
            } else {
                Literal::String(raw.to_string())
            }
        } else if raw == "true" || raw == "false" {
            Literal::Boolean(raw == "true")
        } else {
            Literal::String(raw.to_string())
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Literal::Null => serde_json::Value::Null,
            Literal::Boolean(b) => serde_json::Value::Bool(*b),
            Literal::Integer(i) => serde_json::json!(*i),
            Literal::Float(f) => serde_json::json!(*f),
            Literal::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw).as_bytes();
    matches!(digits, [b'0', next, ..] if next.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_infer_keeps_zero_padded_codes() {
        assert_eq!(Literal::infer("004"), Literal::String("004".into()));
        assert_eq!(Literal::infer("-07"), Literal::String("-07".into()));
        assert_eq!(Literal::infer("00.5"), Literal::String("00.5".into()));
        assert_eq!(Literal::infer("0"), Literal::Integer(0));
        assert_eq!(Literal::infer("0.5"), Literal::Float(0.5));
        assert_eq!(Literal::infer("-0.25"), Literal::Float(-0.25));
    }

    #[test]
    fn test_literal_infer() {
        assert_eq!(Literal::infer("2020"), Literal::Integer(2020));
        assert_eq!(Literal::infer("-1.5"), Literal::Float(-1.5));
        assert_eq!(Literal::infer("true"), Literal::Boolean(true));
        assert_eq!(Literal::infer("Brazil"), Literal::String("Brazil".into()));
        assert_eq!(Literal::infer("NaN"), Literal::String("NaN".into()));
    }

    #[test]
    fn test_with_limit_keeps_tighter() {
        let mut q = ProviderQuery::scan(QueryType::Sql, "?sql=x", "t");
        assert_eq!(q.with_limit(1).limit, Some(1));
        q.limit = Some(0);
        assert_eq!(q.with_limit(1).limit, Some(0));
    }

    #[test]
    fn test_compare_op_flip() {
        assert_eq!(CompareOp::Lt.flip(), CompareOp::Gt);
        assert_eq!(CompareOp::GtEq.flip(), CompareOp::LtEq);
        assert_eq!(CompareOp::Eq.flip(), CompareOp::Eq);
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::FilterType { key: "year".into() };
        assert_eq!(err.to_string(), "Filter parameter 'year' must be a string");
    }
}
