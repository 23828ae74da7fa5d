/// Query translation.
///
/// ```text
/// Request (sql | filters)
///       ↓
/// Fragment builder   (builder.rs)   ?sql=... | ?tableName="..."&k=v
///       ↓
/// Fragment parser    (parser.rs)
///       ↓
/// ProviderQuery      (types.rs)
///       ↓
/// Execution client   (gee module)
/// ```
pub mod builder;
pub mod parser;
pub mod types;

pub use builder::{build_query, fs_query_string, schema_probe, sql_query_string};
pub use types::*;

use tracing::debug;

/// Converts request fragments into provider queries.
pub struct QueryService;

impl QueryService {
    /// Convert a `?...` fragment of the given type into a provider query.
    ///
    /// Every call parses from scratch; nothing is cached.
    pub fn convert(query_string: &str, query_type: QueryType) -> Result<ProviderQuery, QueryError> {
        if !query_string.starts_with('?') {
            return Err(QueryError::Malformed(format!(
                "query string must start with '?': '{}'",
                query_string
            )));
        }

        let query = match query_type {
            QueryType::Sql => parser::parse_sql_fragment(query_string)?,
            QueryType::Fs => parser::parse_fs_fragment(query_string)?,
        };
        debug!(query_type = %query_type, table = %query.table, "converted query");
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_sql_scenario() {
        let fragment = sql_query_string("SELECT * FROM \"forest_loss\" LIMIT 1");
        assert_eq!(fragment, "?sql=SELECT * FROM \"forest_loss\" LIMIT 1");

        let query = QueryService::convert(&fragment, QueryType::Sql).unwrap();
        assert_eq!(query.source, fragment);
        assert_eq!(query.table, "forest_loss");
        assert_eq!(query.limit, Some(1));
    }

    #[test]
    fn test_convert_fs_scenario() {
        let filters = serde_json::json!({"year": "2020"});
        let map = filters.as_object().unwrap();
        let (fragment, kind) =
            build_query("forest_loss", None, map.iter().map(|(k, v)| (k.as_str(), v))).unwrap();
        assert_eq!(fragment, "?tableName=\"forest_loss\"&year=2020");

        let query = QueryService::convert(&fragment, kind).unwrap();
        assert_eq!(query.table, "forest_loss");
        assert_eq!(query.predicates.len(), 1);
    }

    fn convert_filters(table: &str, filters: serde_json::Value) -> Result<ProviderQuery, QueryError> {
        let map = filters.as_object().unwrap();
        let (fragment, kind) =
            build_query(table, None, map.iter().map(|(k, v)| (k.as_str(), v)))?;
        QueryService::convert(&fragment, kind)
    }

    #[test]
    fn test_convert_fs_value_with_ampersand_stays_one_filter() {
        let query = convert_filters("t", serde_json::json!({"iso": "BRA&year=1999"})).unwrap();
        assert_eq!(
            query.predicates,
            vec![Predicate::Compare {
                column: "iso".into(),
                op: CompareOp::Eq,
                value: Literal::String("BRA&year=1999".into())
            }]
        );

        let query = convert_filters("t", serde_json::json!({"name": "A&B"})).unwrap();
        assert_eq!(
            query.predicates,
            vec![Predicate::Compare {
                column: "name".into(),
                op: CompareOp::Eq,
                value: Literal::String("A&B".into())
            }]
        );
    }

    #[test]
    fn test_convert_fs_key_with_equals() {
        let query =
            convert_filters("users/forest", serde_json::json!({"a=b": "c", "pct": "100%"})).unwrap();
        assert_eq!(query.table, "users/forest");
        assert_eq!(
            query.predicates,
            vec![
                Predicate::Compare {
                    column: "a=b".into(),
                    op: CompareOp::Eq,
                    value: Literal::String("c".into())
                },
                Predicate::Compare {
                    column: "pct".into(),
                    op: CompareOp::Eq,
                    value: Literal::String("100%".into())
                },
            ]
        );
    }

    #[test]
    fn test_convert_requires_question_mark() {
        let err = QueryService::convert("sql=SELECT 1", QueryType::Sql).unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[test]
    fn test_convert_type_mismatch() {
        let err = QueryService::convert("?sql=SELECT * FROM t", QueryType::Fs).unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }
}
