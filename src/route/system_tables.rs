//! Routing predicates for system catalog queries.
//!
//! Catalog views such as `information_schema.tables` exist on every backend,
//! so a query against them can only be narrowed by the schema or table names
//! it filters on. This module finds comparisons against those name columns,
//! collects the compared values as routing parameters, and rewrites the
//! compared operand into a [`WhereExpr::RouteParam`] so the value can be
//! substituted when the statement is executed.
//!
//! Values are deduplicated: within one filter tree a value that appears
//! several times (across AND, OR, or IN lists) maps to a single parameter.

use tracing::{debug, error, info};

use crate::query::ast::{BinaryExpr, BinaryOp, MultiExpr, WhereExpr};
use crate::result::ReportExt;

use super::static_value::{StaticConversion, StaticValue, static_value_convert};
use super::{RouteResult, SCHEMA_NAME_PREFIX, TABLE_NAME_PREFIX};

const SCHEMA_NAME_COLUMNS: &[&str] = &[
    "table_schema",
    "constraint_schema",
    "schema_name",
    "routine_schema",
];

const TABLE_NAME_COLUMNS: &[&str] = &["table_name"];

/// Functions whose value depends on the session, never on a literal.
const SESSION_SCHEMA_FUNCTIONS: &[&str] =
    &["database", "schema", "current_schema", "current_database"];

/// Routing values newly discovered by one extraction call, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemPredicates {
    pub schemas: Vec<StaticValue>,
    pub tables: Vec<StaticValue>,
}

impl SystemPredicates {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.tables.is_empty()
    }

    fn append(&mut self, other: SystemPredicates) {
        self.schemas.extend(other.schemas);
        self.tables.extend(other.tables);
    }
}

/// What a column reference names, for routing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    SchemaName,
    TableName,
    Other,
}

/// Classify a leaf by its unqualified column name. Non-columns are `Other`.
pub fn column_classify(expr: &WhereExpr) -> ColumnKind {
    let WhereExpr::Column(col) = expr else {
        return ColumnKind::Other;
    };

    let name_matches = |aliases: &[&str]| {
        aliases
            .iter()
            .any(|alias| col.column.eq_ignore_ascii_case(alias))
    };

    if name_matches(SCHEMA_NAME_COLUMNS) {
        ColumnKind::SchemaName
    } else if name_matches(TABLE_NAME_COLUMNS) {
        ColumnKind::TableName
    } else {
        ColumnKind::Other
    }
}

/// Session-dependent schema functions must stay in the query as written.
fn rewrite_allowed(expr: &WhereExpr) -> bool {
    match expr {
        WhereExpr::Function { name, .. } => !SESSION_SCHEMA_FUNCTIONS
            .iter()
            .any(|func| name.eq_ignore_ascii_case(func)),
        WhereExpr::Value(_)
        | WhereExpr::Column(_)
        | WhereExpr::Unary(_)
        | WhereExpr::Binary(_)
        | WhereExpr::Multi(_)
        | WhereExpr::Row(_)
        | WhereExpr::RouteParam(_)
        | WhereExpr::Opaque(_) => true,
    }
}

enum Operand {
    Value(StaticValue),
    Vetoed,
    Unsupported,
}

fn operand_resolve(expr: &WhereExpr) -> RouteResult<Operand> {
    if !rewrite_allowed(expr) {
        debug!("operand {} depends on the session, not rewritten", expr.to_sql());
        return Ok(Operand::Vetoed);
    }

    match static_value_convert(expr) {
        StaticConversion::Value(value) => Ok(Operand::Value(value)),
        StaticConversion::Unsupported => {
            debug!("operand {} has no static value, not rewritten", expr.to_sql());
            Ok(Operand::Unsupported)
        }
        StaticConversion::Failed(report) => {
            Err(report.attach_loc(format!("converting routing operand {}", expr.to_sql())))
        }
    }
}

/// Find `value` in `existing` and return its parameter name and `true`, or the
/// name it would get if appended and `false`. Never modifies `existing`.
pub(crate) fn route_param_find(
    value: &StaticValue,
    prefix: &str,
    existing: &[StaticValue],
) -> (String, bool) {
    match existing.iter().position(|known| known.routing_eq(value)) {
        Some(index) => (format!("{prefix}{}", index + 1), true),
        None => (format!("{prefix}{}", existing.len() + 1), false),
    }
}

/// Extract routing predicates from `expr`, rewriting matched operands in place.
///
/// `schema_params` and `table_params` are the values the route already holds;
/// they seed deduplication and the parameter numbering. The returned values are
/// only those not already present, in the order they were found. Shapes that
/// cannot be rewritten are left untouched. Errors come only from operands
/// whose static conversion failed.
pub fn system_predicates_extract(
    expr: &mut WhereExpr,
    schema_params: &[StaticValue],
    table_params: &[StaticValue],
) -> RouteResult<SystemPredicates> {
    match expr {
        WhereExpr::Binary(binary) => match binary.op {
            BinaryOp::Equal => equality_extract(binary, schema_params, table_params),
            BinaryOp::Or => or_extract(binary, schema_params, table_params),
            BinaryOp::And => and_extract(binary, schema_params, table_params),
            BinaryOp::NotEqual
            | BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual
            | BinaryOp::Like
            | BinaryOp::ILike
            | BinaryOp::NotLike
            | BinaryOp::NotILike => Ok(SystemPredicates::default()),
        },
        WhereExpr::Multi(multi) => in_list_extract(multi, schema_params, table_params),
        WhereExpr::Value(_)
        | WhereExpr::Column(_)
        | WhereExpr::Unary(_)
        | WhereExpr::Row(_)
        | WhereExpr::Function { .. }
        | WhereExpr::RouteParam(_)
        | WhereExpr::Opaque(_) => Ok(SystemPredicates::default()),
    }
}

/// Run extraction and append the discovered values to the route's lists.
pub fn system_predicates_find(
    expr: &mut WhereExpr,
    schema_params: &mut Vec<StaticValue>,
    table_params: &mut Vec<StaticValue>,
) -> RouteResult<()> {
    let found = system_predicates_extract(expr, schema_params, table_params)?;
    if found.is_empty() {
        return Ok(());
    }

    debug!(
        "routing predicates found: {} schema, {} table",
        found.schemas.len(),
        found.tables.len()
    );
    schema_params.extend(found.schemas);
    table_params.extend(found.tables);

    Ok(())
}

fn equality_extract(
    cmp: &mut BinaryExpr,
    schema_params: &[StaticValue],
    table_params: &[StaticValue],
) -> RouteResult<SystemPredicates> {
    let (kind, other) = match (column_classify(&cmp.lexpr), column_classify(&cmp.rexpr)) {
        (ColumnKind::Other, ColumnKind::Other) => return Ok(SystemPredicates::default()),
        (ColumnKind::Other, kind) => (kind, &mut cmp.lexpr),
        (kind, _) => (kind, &mut cmp.rexpr),
    };

    let Operand::Value(value) = operand_resolve(other)? else {
        return Ok(SystemPredicates::default());
    };

    let mut found = SystemPredicates::default();
    let (prefix, known, new_values) = match kind {
        ColumnKind::SchemaName => (SCHEMA_NAME_PREFIX, schema_params, &mut found.schemas),
        ColumnKind::TableName => (TABLE_NAME_PREFIX, table_params, &mut found.tables),
        ColumnKind::Other => return Ok(found),
    };

    let (name, exists) = route_param_find(&value, prefix, known);
    debug!("{} rewritten to :{name}", other.to_sql());
    **other = WhereExpr::RouteParam(name);
    if !exists {
        new_values.push(value);
    }

    Ok(found)
}

fn or_extract(
    or: &mut BinaryExpr,
    schema_params: &[StaticValue],
    table_params: &[StaticValue],
) -> RouteResult<SystemPredicates> {
    let mut found = system_predicates_extract(&mut or.lexpr, schema_params, table_params)?;

    // the right branch sees the left branch's values, not the other way round
    let schemas = [schema_params, found.schemas.as_slice()].concat();
    let tables = [table_params, found.tables.as_slice()].concat();
    let right = system_predicates_extract(&mut or.rexpr, &schemas, &tables)?;

    found.append(right);
    Ok(found)
}

fn and_extract(
    and: &mut BinaryExpr,
    schema_params: &[StaticValue],
    table_params: &[StaticValue],
) -> RouteResult<SystemPredicates> {
    let mut conjuncts = Vec::new();
    where_expr_conjuncts_mut(&mut and.lexpr, &mut conjuncts);
    where_expr_conjuncts_mut(&mut and.rexpr, &mut conjuncts);

    let mut found = SystemPredicates::default();
    for conjunct in conjuncts {
        let schemas = [schema_params, found.schemas.as_slice()].concat();
        let tables = [table_params, found.tables.as_slice()].concat();
        let sub = system_predicates_extract(conjunct, &schemas, &tables)?;
        found.append(sub);
    }

    Ok(found)
}

/// Flatten nested ANDs into their conjuncts, left to right.
fn where_expr_conjuncts_mut<'a>(expr: &'a mut WhereExpr, conjuncts: &mut Vec<&'a mut WhereExpr>) {
    let is_and = matches!(expr, WhereExpr::Binary(binary) if binary.op == BinaryOp::And);
    if !is_and {
        conjuncts.push(expr);
        return;
    }

    if let WhereExpr::Binary(binary) = expr {
        where_expr_conjuncts_mut(&mut binary.lexpr, conjuncts);
        where_expr_conjuncts_mut(&mut binary.rexpr, conjuncts);
    }
}

/// Column kinds of an IN subject: a single column or a row of expressions.
/// `None` when the subject has another shape or names no routing column.
fn in_columns_split(subject: &WhereExpr) -> Option<Vec<ColumnKind>> {
    let kinds = match subject {
        WhereExpr::Column(_) => vec![column_classify(subject)],
        WhereExpr::Row(elems) => elems.iter().map(column_classify).collect(),
        WhereExpr::Value(_)
        | WhereExpr::Unary(_)
        | WhereExpr::Binary(_)
        | WhereExpr::Multi(_)
        | WhereExpr::Function { .. }
        | WhereExpr::RouteParam(_)
        | WhereExpr::Opaque(_) => return None,
    };

    if kinds.iter().all(|kind| *kind == ColumnKind::Other) {
        info!("IN subject {} names no schema or table column", subject.to_sql());
        return None;
    }

    Some(kinds)
}

/// Split an IN value list into rows of `column_count` elements.
///
/// One column takes bare scalars; several columns take rows of matching
/// arity. Any other shape yields `None`.
fn in_rows_split(values: &[WhereExpr], column_count: usize) -> Option<Vec<Vec<WhereExpr>>> {
    if values.is_empty() {
        return None;
    }

    values
        .iter()
        .map(|value| match (value, column_count) {
            (WhereExpr::Row(_), 1) => {
                error!("expected a scalar IN value, got row {}", value.to_sql());
                None
            }
            (_, 1) => Some(vec![value.clone()]),
            (WhereExpr::Row(elems), _) if elems.len() == column_count => Some(elems.clone()),
            _ => {
                error!(
                    "expected an IN row of {column_count} values, got {}",
                    value.to_sql()
                );
                None
            }
        })
        .collect()
}

/// Inverse of [`in_rows_split`]: single-column rows collapse to scalars.
fn in_rows_rebuild(rows: Vec<Vec<WhereExpr>>, column_count: usize) -> Vec<WhereExpr> {
    rows.into_iter()
        .map(|mut row| match (column_count, row.pop()) {
            (1, Some(value)) if row.is_empty() => value,
            (_, last) => {
                row.extend(last);
                WhereExpr::Row(row)
            }
        })
        .collect()
}

/// IN / NOT IN: rewrite every schema/table position of every row.
///
/// The value list is rewritten on a copy and written back only when every
/// position converted, so an unsupported value leaves the comparison as it was.
fn in_list_extract(
    multi: &mut MultiExpr,
    schema_params: &[StaticValue],
    table_params: &[StaticValue],
) -> RouteResult<SystemPredicates> {
    let Some(columns) = multi.subject().and_then(in_columns_split) else {
        return Ok(SystemPredicates::default());
    };
    let Some(mut rows) = in_rows_split(multi.values(), columns.len()) else {
        return Ok(SystemPredicates::default());
    };

    let mut found = SystemPredicates::default();
    for (index, kind) in columns.iter().enumerate() {
        let (prefix, known, new_values) = match kind {
            ColumnKind::SchemaName => (SCHEMA_NAME_PREFIX, schema_params, &mut found.schemas),
            ColumnKind::TableName => (TABLE_NAME_PREFIX, table_params, &mut found.tables),
            ColumnKind::Other => continue,
        };

        for elem in rows.iter_mut().filter_map(|row| row.get_mut(index)) {
            let value = match operand_resolve(elem)? {
                Operand::Value(value) => value,
                Operand::Vetoed => continue,
                Operand::Unsupported => return Ok(SystemPredicates::default()),
            };

            let scope = [known, new_values.as_slice()].concat();
            let (name, exists) = route_param_find(&value, prefix, &scope);
            *elem = WhereExpr::RouteParam(name);
            if !exists {
                new_values.push(value);
            }
        }
    }

    multi.exprs.truncate(1);
    multi.exprs.extend(in_rows_rebuild(rows, columns.len()));

    Ok(found)
}
