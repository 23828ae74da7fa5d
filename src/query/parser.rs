/// Query fragment → `ProviderQuery` parser.
///
/// SQL goes through `sqlparser` and is then narrowed to the single-table
/// select the provider can run. Anything outside that shape is reported as
/// `Unsupported`, while text that does not parse at all is a `SqlFormat`
/// error.
use sqlparser::ast as sp;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use super::types::*;

/// Parse the body of an `?sql=` fragment.
pub fn parse_sql_fragment(fragment: &str) -> Result<ProviderQuery, QueryError> {
    let sql = fragment
        .strip_prefix("?sql=")
        .ok_or_else(|| QueryError::Malformed(format!("expected '?sql=', got '{}'", fragment)))?;

    let mut statements = SqlParser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| QueryError::SqlFormat(format!("SQL parse error: {}", e)))?;

    if statements.len() != 1 {
        return Err(QueryError::SqlFormat(format!(
            "Expected 1 statement, found {}",
            statements.len()
        )));
    }

    match statements.remove(0) {
        sp::Statement::Query(query) => convert_query(*query, fragment),
        other => Err(QueryError::SqlFormat(format!(
            "Only SELECT statements are supported, got: {}",
            other
        ))),
    }
}

/// Parse a `?tableName="..."&key=value` fragment.
pub fn parse_fs_fragment(fragment: &str) -> Result<ProviderQuery, QueryError> {
    let body = fragment
        .strip_prefix('?')
        .ok_or_else(|| QueryError::Malformed(format!("expected leading '?', got '{}'", fragment)))?;

    let mut segments = body.split('&');
    let table = segments
        .next()
        .and_then(|s| s.strip_prefix("tableName="))
        .map(|t| t.trim_matches('"'))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| QueryError::Malformed("missing tableName".to_string()))?;

    let mut query = ProviderQuery::scan(QueryType::Fs, fragment, decode(table)?);
    for segment in segments {
        let (key, value) = segment
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| QueryError::Malformed(format!("invalid filter '{}'", segment)))?;
        query.predicates.push(Predicate::Compare {
            column: decode(key)?,
            op: CompareOp::Eq,
            value: Literal::infer(&decode(value)?),
        });
    }
    Ok(query)
}

fn decode(component: &str) -> Result<String, QueryError> {
    urlencoding::decode(component)
        .map(|c| c.into_owned())
        .map_err(|e| QueryError::Malformed(format!("invalid encoding in '{}': {}", component, e)))
}

fn unsupported(what: impl std::fmt::Display) -> QueryError {
    QueryError::Unsupported(what.to_string())
}

fn convert_query(query: sp::Query, fragment: &str) -> Result<ProviderQuery, QueryError> {
    if query.with.is_some() {
        return Err(unsupported("WITH clauses"));
    }
    if query.offset.is_some() || query.fetch.is_some() {
        return Err(unsupported("OFFSET/FETCH"));
    }
    if !query.limit_by.is_empty() {
        return Err(unsupported("LIMIT BY"));
    }

    let select = match *query.body {
        sp::SetExpr::Select(select) => *select,
        sp::SetExpr::SetOperation { op, .. } => return Err(unsupported(format!("{} queries", op))),
        other => return Err(unsupported(other)),
    };

    let mut plan = convert_select(select, fragment)?;

    let order_exprs: Vec<sp::OrderByExpr> = query.order_by.map(|ob| ob.exprs).unwrap_or_default();
    plan.order_by = convert_order_by(order_exprs)?;
    plan.limit = query.limit.map(convert_limit).transpose()?;
    Ok(plan)
}

fn convert_select(select: sp::Select, fragment: &str) -> Result<ProviderQuery, QueryError> {
    if select.distinct.is_some() {
        return Err(unsupported("DISTINCT"));
    }
    if select.top.is_some() {
        return Err(unsupported("TOP"));
    }
    if select.having.is_some() || select.qualify.is_some() {
        return Err(unsupported("HAVING/QUALIFY"));
    }
    match &select.group_by {
        sp::GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
        _ => return Err(unsupported("GROUP BY")),
    }

    let table = match select.from.as_slice() {
        [single] => convert_from(single)?,
        [] => return Err(QueryError::SqlFormat("Missing FROM clause".to_string())),
        _ => return Err(unsupported("multiple tables in FROM")),
    };

    let mut plan = ProviderQuery::scan(QueryType::Sql, fragment, table);
    plan.projection = convert_projection(select.projection)?;
    if let Some(selection) = select.selection {
        collect_predicates(selection, &mut plan.predicates)?;
    }
    Ok(plan)
}

fn convert_from(twj: &sp::TableWithJoins) -> Result<String, QueryError> {
    if !twj.joins.is_empty() {
        return Err(unsupported("JOIN"));
    }
    match &twj.relation {
        sp::TableFactor::Table { name, args: None, .. } => {
            let parts: Vec<&str> = name.0.iter().map(|p| p.value.as_str()).collect();
            Ok(parts.join("."))
        }
        other => Err(unsupported(format!("FROM {}", other))),
    }
}

fn convert_projection(items: Vec<sp::SelectItem>) -> Result<Projection, QueryError> {
    let mut columns = Vec::with_capacity(items.len());
    for item in items {
        match item {
            sp::SelectItem::Wildcard(_) | sp::SelectItem::QualifiedWildcard(..) => {
                return Ok(Projection::All)
            }
            sp::SelectItem::UnnamedExpr(expr) => columns.push(column_name(&expr)?),
            sp::SelectItem::ExprWithAlias { expr, alias } => {
                return Err(unsupported(format!("alias {} AS {}", expr, alias)))
            }
        }
    }
    Ok(Projection::Columns(columns))
}

fn convert_order_by(exprs: Vec<sp::OrderByExpr>) -> Result<Option<OrderKey>, QueryError> {
    match exprs.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(OrderKey {
            column: column_name(&single.expr)?,
            ascending: single.asc.unwrap_or(true),
        })),
        _ => Err(unsupported("ORDER BY on more than one column")),
    }
}

fn convert_limit(expr: sp::Expr) -> Result<u64, QueryError> {
    match &expr {
        sp::Expr::Value(sp::Value::Number(n, _)) => n
            .parse::<u64>()
            .map_err(|_| QueryError::SqlFormat(format!("Invalid LIMIT: {}", n))),
        _ => Err(unsupported(format!("LIMIT {}", expr))),
    }
}

/// Flatten an AND-tree into conjuncts.
fn collect_predicates(expr: sp::Expr, out: &mut Vec<Predicate>) -> Result<(), QueryError> {
    match expr {
        sp::Expr::Nested(inner) => collect_predicates(*inner, out),
        sp::Expr::BinaryOp {
            left,
            op: sp::BinaryOperator::And,
            right,
        } => {
            collect_predicates(*left, out)?;
            collect_predicates(*right, out)
        }
        sp::Expr::BinaryOp { left, op, right } => {
            let op = convert_compare_op(&op)?;
            let predicate = match (column_name(&left), literal(&right)) {
                (Ok(column), Ok(value)) => Predicate::Compare { column, op, value },
                _ => Predicate::Compare {
                    column: column_name(&right)?,
                    op: op.flip(),
                    value: literal(&left)?,
                },
            };
            out.push(predicate);
            Ok(())
        }
        sp::Expr::IsNull(inner) => {
            out.push(Predicate::IsNull {
                column: column_name(&inner)?,
                negated: false,
            });
            Ok(())
        }
        sp::Expr::IsNotNull(inner) => {
            out.push(Predicate::IsNull {
                column: column_name(&inner)?,
                negated: true,
            });
            Ok(())
        }
        sp::Expr::InList {
            expr,
            list,
            negated,
        } => {
            out.push(Predicate::InList {
                column: column_name(&expr)?,
                values: list.iter().map(literal).collect::<Result<Vec<_>, _>>()?,
                negated,
            });
            Ok(())
        }
        sp::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            out.push(Predicate::Between {
                column: column_name(&expr)?,
                low: literal(&low)?,
                high: literal(&high)?,
                negated,
            });
            Ok(())
        }
        other => Err(unsupported(format!("WHERE {}", other))),
    }
}

fn convert_compare_op(op: &sp::BinaryOperator) -> Result<CompareOp, QueryError> {
    match op {
        sp::BinaryOperator::Eq => Ok(CompareOp::Eq),
        sp::BinaryOperator::NotEq => Ok(CompareOp::NotEq),
        sp::BinaryOperator::Lt => Ok(CompareOp::Lt),
        sp::BinaryOperator::LtEq => Ok(CompareOp::LtEq),
        sp::BinaryOperator::Gt => Ok(CompareOp::Gt),
        sp::BinaryOperator::GtEq => Ok(CompareOp::GtEq),
        other => Err(unsupported(format!("operator {}", other))),
    }
}

fn column_name(expr: &sp::Expr) -> Result<String, QueryError> {
    match expr {
        sp::Expr::Identifier(ident) => Ok(ident.value.clone()),
        sp::Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.clone())
            .ok_or_else(|| unsupported("empty identifier")),
        sp::Expr::Nested(inner) => column_name(inner),
        other => Err(unsupported(format!("expression {}", other))),
    }
}

fn literal(expr: &sp::Expr) -> Result<Literal, QueryError> {
    match expr {
        sp::Expr::Value(val) => convert_value(val),
        sp::Expr::Nested(inner) => literal(inner),
        sp::Expr::UnaryOp {
            op: sp::UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Literal::Integer(i) => Ok(Literal::Integer(-i)),
            Literal::Float(f) => Ok(Literal::Float(-f)),
            _ => Err(unsupported(format!("expression -{}", expr))),
        },
        other => Err(unsupported(format!("expression {}", other))),
    }
}

fn convert_value(val: &sp::Value) -> Result<Literal, QueryError> {
    match val {
        sp::Value::Null => Ok(Literal::Null),
        sp::Value::Boolean(b) => Ok(Literal::Boolean(*b)),
        sp::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Literal::Integer(i))
            } else {
                n.parse::<f64>()
                    .map(Literal::Float)
                    .map_err(|_| QueryError::SqlFormat(format!("Invalid number: {}", n)))
            }
        }
        sp::Value::SingleQuotedString(s) | sp::Value::DoubleQuotedString(s) => {
            Ok(Literal::String(s.clone()))
        }
        other => Err(unsupported(format!("literal {}", other))),
    }
}
