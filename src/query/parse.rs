use error_set::error_set;
use ordered_float::NotNan;
use tracing::debug;

use pg_query::ParseResult;
use pg_query::protobuf::a_const::Val;
use pg_query::protobuf::node::Node as NodeEnum;
use pg_query::protobuf::{
    AConst, AExpr, AExprKind, BoolExpr, BoolExprType, ColumnRef, FuncCall, JoinExpr,
    LimitOption, NullTest, NullTestType, ParamRef, RangeVar, RawStmt, ResTarget, RowExpr,
    SelectStmt, SetOperation, TypeCast,
};
use strum_macros::AsRefStr;

use super::ast::{
    BinaryExpr, BinaryOp, ColumnNode, LiteralValue, MultiExpr, MultiOp, UnaryExpr, UnaryOp,
    WhereExpr,
};

error_set! {
    WhereParseError := {
        #[display("Unsupported WHERE clause pattern: {pattern}")]
        UnsupportedPattern { pattern: String },
        #[display("Unsupported A expression: {expr}")]
        UnsupportedAExpr { expr: String },
        #[display("Unsupported operator: {operator}")]
        UnsupportedOperator { operator: String },
        #[display("Invalid column reference")]
        InvalidColumnRef,
        #[display("Invalid constant value: {value}")]
        InvalidConstValue { value: String },
        #[display("Missing expression")]
        MissingExpression,
        #[display("{error}")]
        Other { error: String },
    }

    StatementParseError := {
        #[display("Multiple statements not supported")]
        MultipleStatements,
        #[display("Missing statement")]
        MissingStatement,
        #[display("Unsupported statement type: {statement_type}")]
        UnsupportedStatement { statement_type: String },
        #[display("Unsupported FROM item: {item}")]
        UnsupportedFromItem { item: String },
        #[display("Malformed set operation")]
        MalformedSetOp,
    }
}

/// A relation named in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNode {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

/// Where a filter came from inside a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    JoinOn,
    Where,
}

/// A boolean filter taken from a SELECT. `expr` is `None` when the clause uses
/// syntax the filter tree cannot express.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub source: FilterSource,
    pub expr: Option<WhereExpr>,
}

/// The parts of a plain SELECT that routing looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub tables: Vec<TableNode>,
    /// JOIN ON conditions in FROM order, followed by the WHERE clause
    pub filters: Vec<FilterClause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SetOpType {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Select(SelectNode),
    SetOp {
        op: SetOpType,
        all: bool,
        left: Box<QueryBody>,
        right: Box<QueryBody>,
    },
}

impl QueryBody {
    /// All plain SELECT arms, left to right.
    pub fn select_nodes(&self) -> Vec<&SelectNode> {
        match self {
            QueryBody::Select(node) => vec![node],
            QueryBody::SetOp { left, right, .. } => {
                let mut nodes = left.select_nodes();
                nodes.extend(right.select_nodes());
                nodes
            }
        }
    }

    /// Outline of the set-operation structure, e.g. `(SELECT UNION ALL SELECT)`.
    pub fn shape(&self) -> String {
        match self {
            QueryBody::Select(_) => "SELECT".to_owned(),
            QueryBody::SetOp {
                op,
                all,
                left,
                right,
            } => {
                let all = if *all { " ALL" } else { "" };
                format!(
                    "({} {}{all} {})",
                    left.shape(),
                    op.as_ref(),
                    right.shape()
                )
            }
        }
    }

    pub fn select_nodes_mut(&mut self) -> Vec<&mut SelectNode> {
        match self {
            QueryBody::Select(node) => vec![node],
            QueryBody::SetOp { left, right, .. } => {
                let mut nodes = left.select_nodes_mut();
                nodes.extend(right.select_nodes_mut());
                nodes
            }
        }
    }
}

/// Convert a single-statement pg_query parse result into a [`QueryBody`].
pub fn query_body_parse(ast: &ParseResult) -> Result<QueryBody, StatementParseError> {
    let [raw_stmt] = ast.protobuf.stmts.as_slice() else {
        return match ast.protobuf.stmts.is_empty() {
            true => Err(StatementParseError::MissingStatement),
            false => Err(StatementParseError::MultipleStatements),
        };
    };

    let stmt_node = raw_stmt
        .stmt
        .as_ref()
        .ok_or(StatementParseError::MissingStatement)?;

    match stmt_node.node.as_ref() {
        Some(NodeEnum::SelectStmt(select_stmt)) => select_stmt_convert(select_stmt),
        Some(other) => Err(StatementParseError::UnsupportedStatement {
            statement_type: statement_type_name(other),
        }),
        None => Err(StatementParseError::MissingStatement),
    }
}

fn statement_type_name(node: &NodeEnum) -> String {
    let debug = format!("{node:?}");
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_owned()
}

fn select_stmt_convert(select_stmt: &SelectStmt) -> Result<QueryBody, StatementParseError> {
    let op = match select_stmt.op() {
        SetOperation::SetopNone | SetOperation::Undefined => {
            return select_node_convert(select_stmt).map(QueryBody::Select);
        }
        SetOperation::SetopUnion => SetOpType::Union,
        SetOperation::SetopIntersect => SetOpType::Intersect,
        SetOperation::SetopExcept => SetOpType::Except,
    };

    let (Some(larg), Some(rarg)) = (&select_stmt.larg, &select_stmt.rarg) else {
        return Err(StatementParseError::MalformedSetOp);
    };

    Ok(QueryBody::SetOp {
        op,
        all: select_stmt.all,
        left: Box::new(select_stmt_convert(larg)?),
        right: Box::new(select_stmt_convert(rarg)?),
    })
}

fn select_node_convert(select_stmt: &SelectStmt) -> Result<SelectNode, StatementParseError> {
    if !select_stmt.values_lists.is_empty() {
        return Err(StatementParseError::UnsupportedFromItem {
            item: "VALUES".to_owned(),
        });
    }

    let mut node = SelectNode {
        tables: Vec::new(),
        filters: Vec::new(),
    };

    for from_node in &select_stmt.from_clause {
        from_item_collect(from_node, &mut node)?;
    }

    if let Some(where_node) = &select_stmt.where_clause {
        node.filters.push(FilterClause {
            source: FilterSource::Where,
            expr: filter_convert(where_node),
        });
    }

    Ok(node)
}

fn from_item_collect(
    from_node: &pg_query::Node,
    select: &mut SelectNode,
) -> Result<(), StatementParseError> {
    match from_node.node.as_ref() {
        Some(NodeEnum::RangeVar(range_var)) => {
            select.tables.push(table_node_convert(range_var));
            Ok(())
        }
        Some(NodeEnum::JoinExpr(join)) => join_expr_collect(join, select),
        Some(other) => Err(StatementParseError::UnsupportedFromItem {
            item: statement_type_name(other),
        }),
        None => Err(StatementParseError::UnsupportedFromItem {
            item: "empty".to_owned(),
        }),
    }
}

fn join_expr_collect(join: &JoinExpr, select: &mut SelectNode) -> Result<(), StatementParseError> {
    let (Some(larg), Some(rarg)) = (&join.larg, &join.rarg) else {
        return Err(StatementParseError::UnsupportedFromItem {
            item: "JOIN without both sides".to_owned(),
        });
    };

    from_item_collect(larg, select)?;
    from_item_collect(rarg, select)?;

    if let Some(quals) = &join.quals {
        select.filters.push(FilterClause {
            source: FilterSource::JoinOn,
            expr: filter_convert(quals),
        });
    }

    Ok(())
}

fn table_node_convert(range_var: &RangeVar) -> TableNode {
    let schema = if range_var.schemaname.is_empty() {
        None
    } else {
        Some(range_var.schemaname.clone())
    };

    TableNode {
        schema,
        name: range_var.relname.clone(),
        alias: range_var
            .alias
            .as_ref()
            .map(|alias_node| alias_node.aliasname.clone()),
    }
}

fn filter_convert(node: &pg_query::Node) -> Option<WhereExpr> {
    match node_convert_to_expr(node) {
        Ok(expr) => Some(expr),
        Err(e) => {
            debug!("filter left unconverted: {e}");
            None
        }
    }
}

/// Convert a pg_query Node to a WhereExpr - main entry point for recursion.
///
/// Syntax the tree does not model becomes a [`WhereExpr::Opaque`] leaf at the
/// innermost node that could not be converted, so the rest of the clause
/// keeps its structure. Malformed trees are still errors.
pub fn node_convert_to_expr(node: &pg_query::Node) -> Result<WhereExpr, WhereParseError> {
    match node_convert_modelled(node) {
        Err(
            e @ (WhereParseError::UnsupportedPattern { .. }
            | WhereParseError::UnsupportedAExpr { .. }
            | WhereParseError::UnsupportedOperator { .. }),
        ) => {
            let sql = node_sql_text(node).unwrap_or_else(|| format!("<{e}>"));
            debug!("kept as opaque expression ({e}): {sql}");
            Ok(WhereExpr::Opaque(sql))
        }
        result => result,
    }
}

/// SQL text of an expression node, via the pg_query deparser on `SELECT <expr>`.
fn node_sql_text(node: &pg_query::Node) -> Option<String> {
    let target = pg_query::Node {
        node: Some(NodeEnum::ResTarget(Box::new(ResTarget {
            val: Some(Box::new(node.clone())),
            ..Default::default()
        }))),
    };
    let select = SelectStmt {
        target_list: vec![target],
        op: SetOperation::SetopNone as i32,
        limit_option: LimitOption::Default as i32,
        ..Default::default()
    };
    let protobuf = pg_query::protobuf::ParseResult {
        version: 0,
        stmts: vec![RawStmt {
            stmt: Some(Box::new(pg_query::Node {
                node: Some(NodeEnum::SelectStmt(Box::new(select))),
            })),
            stmt_location: 0,
            stmt_len: 0,
        }],
    };

    let sql = pg_query::deparse(&protobuf).ok()?;
    sql.strip_prefix("SELECT ").map(str::to_owned)
}

fn node_convert_modelled(node: &pg_query::Node) -> Result<WhereExpr, WhereParseError> {
    match node.node.as_ref() {
        Some(NodeEnum::AExpr(expr)) => a_expr_convert(expr),
        Some(NodeEnum::BoolExpr(expr)) => bool_expr_convert(expr),
        Some(NodeEnum::ColumnRef(col_ref)) => {
            let column = column_ref_extract(col_ref)?;
            Ok(WhereExpr::Column(column))
        }
        Some(NodeEnum::AConst(const_val)) => {
            let value = const_value_extract(const_val)?;
            Ok(WhereExpr::Value(value))
        }
        Some(NodeEnum::ParamRef(param_ref)) => {
            let value = param_ref_extract(param_ref);
            Ok(WhereExpr::Value(value))
        }
        Some(NodeEnum::TypeCast(type_cast)) => type_cast_convert(type_cast),
        Some(NodeEnum::RowExpr(row)) => row_expr_convert(row),
        Some(NodeEnum::NullTest(null_test)) => null_test_convert(null_test),
        Some(NodeEnum::FuncCall(func_call)) => func_call_convert(func_call),
        Some(unsupported) => Err(WhereParseError::UnsupportedPattern {
            pattern: statement_type_name(unsupported),
        }),
        None => Err(WhereParseError::MissingExpression),
    }
}

/// Convert pg_query NullTest to WhereExpr (IS NULL / IS NOT NULL)
fn null_test_convert(null_test: &NullTest) -> Result<WhereExpr, WhereParseError> {
    let arg = null_test
        .arg
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    let op = match null_test.nulltesttype() {
        NullTestType::IsNull => UnaryOp::IsNull,
        NullTestType::IsNotNull => UnaryOp::IsNotNull,
        NullTestType::Undefined => {
            return Err(WhereParseError::UnsupportedAExpr {
                expr: "Undefined NullTest type".to_owned(),
            });
        }
    };

    Ok(WhereExpr::Unary(UnaryExpr {
        op,
        expr: Box::new(node_convert_to_expr(arg)?),
    }))
}

/// Last component of a qualified name list (e.g. `pg_catalog.now` -> `now`)
fn name_last_component(names: &[pg_query::Node]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| match &n.node {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .next_back()
}

fn func_call_convert(func_call: &FuncCall) -> Result<WhereExpr, WhereParseError> {
    let name = name_last_component(&func_call.funcname).ok_or_else(|| {
        WhereParseError::UnsupportedPattern {
            pattern: "unnamed function".to_owned(),
        }
    })?;

    if func_call.agg_star {
        return Err(WhereParseError::UnsupportedPattern {
            pattern: format!("{name}(*)"),
        });
    }

    let args = func_call
        .args
        .iter()
        .map(node_convert_to_expr)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WhereExpr::Function { name, args })
}

fn row_expr_convert(row: &RowExpr) -> Result<WhereExpr, WhereParseError> {
    let elems = row
        .args
        .iter()
        .map(node_convert_to_expr)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WhereExpr::Row(elems))
}

/// `'literal'::type` becomes a cast string; `NULL::type` keeps the null.
fn type_cast_convert(type_cast: &TypeCast) -> Result<WhereExpr, WhereParseError> {
    let arg = type_cast
        .arg
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    let cast = type_cast
        .type_name
        .as_ref()
        .and_then(|type_name| name_last_component(&type_name.names))
        .ok_or_else(|| WhereParseError::Other {
            error: "type cast without type name".to_owned(),
        })?;

    match node_convert_to_expr(arg)? {
        WhereExpr::Value(LiteralValue::String(s)) => {
            Ok(WhereExpr::Value(LiteralValue::StringWithCast(s, cast)))
        }
        WhereExpr::Value(LiteralValue::Null) => Ok(WhereExpr::Value(LiteralValue::Null)),
        _ => Err(WhereParseError::UnsupportedPattern {
            pattern: format!("cast to {cast}"),
        }),
    }
}

/// Extract column reference from pg_query ColumnRef
fn column_ref_extract(col_ref: &ColumnRef) -> Result<ColumnNode, WhereParseError> {
    let mut table: Option<String> = None;
    let mut column: Option<String> = None;

    for field in &col_ref.fields {
        match field.node.as_ref() {
            Some(NodeEnum::String(s)) => {
                // a later component turns the previous one into the qualifier
                table = column.take();
                column = Some(s.sval.clone());
            }
            _ => return Err(WhereParseError::InvalidColumnRef),
        }
    }

    let column = column.ok_or(WhereParseError::InvalidColumnRef)?;
    Ok(ColumnNode { table, column })
}

/// Extract constant value from pg_query A_Const
pub fn const_value_extract(const_val: &AConst) -> Result<LiteralValue, WhereParseError> {
    if const_val.isnull {
        return Ok(LiteralValue::Null);
    }

    match const_val.val.as_ref() {
        Some(Val::Sval(s)) => Ok(LiteralValue::String(s.sval.clone())),
        Some(Val::Ival(i)) => Ok(LiteralValue::Integer(i64::from(i.ival))),
        Some(Val::Fval(f)) => f
            .fval
            .parse::<f64>()
            .ok()
            .and_then(|v| NotNan::new(v).ok())
            .map(|value| LiteralValue::Float {
                value,
                text: f.fval.clone(),
            })
            .ok_or_else(|| WhereParseError::InvalidConstValue {
                value: f.fval.clone(),
            }),
        Some(Val::Boolval(b)) => Ok(LiteralValue::Boolean(b.boolval)),
        Some(Val::Bsval(bs)) => Ok(LiteralValue::String(bs.bsval.clone())),
        None => Ok(LiteralValue::Null),
    }
}

fn param_ref_extract(param_ref: &ParamRef) -> LiteralValue {
    LiteralValue::Parameter(format!("${}", param_ref.number))
}

/// The single operator name of an A_Expr
fn operator_name(name_nodes: &[pg_query::Node]) -> Result<&str, WhereParseError> {
    let [name_node] = name_nodes else {
        return Err(WhereParseError::Other {
            error: "Multi-part operator names not supported".to_owned(),
        });
    };

    match name_node.node.as_ref() {
        Some(NodeEnum::String(s)) => Ok(s.sval.as_str()),
        _ => Err(WhereParseError::Other {
            error: "Invalid operator name format".to_owned(),
        }),
    }
}

fn a_expr_operands(expr: &AExpr) -> Result<(WhereExpr, &pg_query::Node), WhereParseError> {
    let lexpr = expr
        .lexpr
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;
    let rexpr = expr
        .rexpr
        .as_ref()
        .ok_or(WhereParseError::MissingExpression)?;

    Ok((node_convert_to_expr(lexpr)?, rexpr))
}

/// Convert PostgreSQL A_Expr (expressions like col = value)
fn a_expr_convert(expr: &AExpr) -> Result<WhereExpr, WhereParseError> {
    match expr.kind() {
        AExprKind::AexprOp | AExprKind::AexprLike | AExprKind::AexprIlike => {
            let op = binary_operator_extract(expr.kind(), operator_name(&expr.name)?)?;
            let (lexpr, rexpr) = a_expr_operands(expr)?;

            Ok(WhereExpr::Binary(BinaryExpr {
                op,
                lexpr: Box::new(lexpr),
                rexpr: Box::new(node_convert_to_expr(rexpr)?),
            }))
        }
        AExprKind::AexprIn => {
            // name: ["="] for IN, ["<>"] for NOT IN
            let op = match operator_name(&expr.name)? {
                "=" => MultiOp::In,
                "<>" => MultiOp::NotIn,
                other => {
                    return Err(WhereParseError::UnsupportedOperator {
                        operator: format!("IN with operator '{other}'"),
                    });
                }
            };
            let (subject, rexpr) = a_expr_operands(expr)?;

            // Build MultiExpr: [subject, value1, value2, ...]
            let mut exprs = vec![subject];
            exprs.extend(in_list_extract(rexpr)?);

            Ok(WhereExpr::Multi(MultiExpr { op, exprs }))
        }
        unsupported_kind => Err(WhereParseError::UnsupportedAExpr {
            expr: format!("{unsupported_kind:?}"),
        }),
    }
}

/// Extract values from IN list (pg_query List node)
fn in_list_extract(node: &pg_query::Node) -> Result<Vec<WhereExpr>, WhereParseError> {
    let Some(NodeEnum::List(list)) = &node.node else {
        return Err(WhereParseError::Other {
            error: "IN clause: expected List on right side".to_owned(),
        });
    };

    list.items.iter().map(node_convert_to_expr).collect()
}

fn binary_operator_extract(kind: AExprKind, name: &str) -> Result<BinaryOp, WhereParseError> {
    let op = match (kind, name) {
        (AExprKind::AexprOp, "=") => BinaryOp::Equal,
        (AExprKind::AexprOp, "!=" | "<>") => BinaryOp::NotEqual,
        (AExprKind::AexprOp, "<") => BinaryOp::LessThan,
        (AExprKind::AexprOp, "<=") => BinaryOp::LessThanOrEqual,
        (AExprKind::AexprOp, ">") => BinaryOp::GreaterThan,
        (AExprKind::AexprOp, ">=") => BinaryOp::GreaterThanOrEqual,
        (AExprKind::AexprLike, "~~") => BinaryOp::Like,
        (AExprKind::AexprLike, "!~~") => BinaryOp::NotLike,
        (AExprKind::AexprIlike, "~~*") => BinaryOp::ILike,
        (AExprKind::AexprIlike, "!~~*") => BinaryOp::NotILike,
        (_, op) => {
            return Err(WhereParseError::UnsupportedOperator {
                operator: op.to_owned(),
            });
        }
    };

    Ok(op)
}

/// Convert PostgreSQL BoolExpr (AND, OR, NOT)
fn bool_expr_convert(expr: &BoolExpr) -> Result<WhereExpr, WhereParseError> {
    let op = match expr.boolop() {
        BoolExprType::AndExpr => BinaryOp::And,
        BoolExprType::OrExpr => BinaryOp::Or,
        BoolExprType::NotExpr => {
            let [arg] = expr.args.as_slice() else {
                return Err(WhereParseError::Other {
                    error: "NOT with != 1 argument not supported".to_owned(),
                });
            };

            return Ok(WhereExpr::Unary(UnaryExpr {
                op: UnaryOp::Not,
                expr: Box::new(node_convert_to_expr(arg)?),
            }));
        }
        BoolExprType::Undefined => {
            return Err(WhereParseError::Other {
                error: "Undefined boolean expression type".to_owned(),
            });
        }
    };

    let [first, second, rest @ ..] = expr.args.as_slice() else {
        return Err(WhereParseError::Other {
            error: format!("{} with < 2 arguments not supported", op.as_ref()),
        });
    };

    // a AND b AND c becomes the left-associative ((a AND b) AND c)
    let mut result = WhereExpr::Binary(BinaryExpr {
        op,
        lexpr: Box::new(node_convert_to_expr(first)?),
        rexpr: Box::new(node_convert_to_expr(second)?),
    });

    for arg in rest {
        result = WhereExpr::Binary(BinaryExpr {
            op,
            lexpr: Box::new(result),
            rexpr: Box::new(node_convert_to_expr(arg)?),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn where_parse(sql: &str) -> Option<WhereExpr> {
        let ast = pg_query::parse(sql).unwrap();
        let QueryBody::Select(mut node) = query_body_parse(&ast).unwrap() else {
            panic!("expected plain select");
        };
        node.filters.pop().and_then(|filter| filter.expr)
    }

    fn col(name: &str) -> WhereExpr {
        WhereExpr::Column(ColumnNode {
            table: None,
            column: name.to_owned(),
        })
    }

    fn string(s: &str) -> WhereExpr {
        WhereExpr::Value(LiteralValue::String(s.to_owned()))
    }

    #[test]
    fn where_clause_simple_equality() {
        let where_clause =
            where_parse("SELECT * FROM information_schema.tables WHERE table_schema = 'ks'");

        let expected = Some(WhereExpr::Binary(BinaryExpr {
            op: BinaryOp::Equal,
            lexpr: Box::new(col("table_schema")),
            rexpr: Box::new(string("ks")),
        }));

        assert_eq!(where_clause, expected);
    }

    #[test]
    fn where_clause_in_list() {
        let where_clause =
            where_parse("SELECT * FROM information_schema.tables WHERE table_name IN ('t1', 't2')");

        let expected = Some(WhereExpr::Multi(MultiExpr {
            op: MultiOp::In,
            exprs: vec![col("table_name"), string("t1"), string("t2")],
        }));

        assert_eq!(where_clause, expected);
    }

    #[test]
    fn where_clause_row_in_list() {
        let where_clause = where_parse(
            "SELECT * FROM information_schema.tables \
             WHERE (table_schema, table_name) NOT IN (('a', 't1'), ('a', 't2'))",
        );

        let expected = Some(WhereExpr::Multi(MultiExpr {
            op: MultiOp::NotIn,
            exprs: vec![
                WhereExpr::Row(vec![col("table_schema"), col("table_name")]),
                WhereExpr::Row(vec![string("a"), string("t1")]),
                WhereExpr::Row(vec![string("a"), string("t2")]),
            ],
        }));

        assert_eq!(where_clause, expected);
    }

    #[test]
    fn where_clause_chained_and_is_left_associative() {
        let where_clause = where_parse(
            "SELECT * FROM information_schema.tables WHERE table_schema = 'x' AND table_schema = 'y' AND table_name = 'z'",
        )
        .unwrap();

        let WhereExpr::Binary(outer) = &where_clause else {
            panic!("expected binary");
        };
        assert_eq!(outer.op, BinaryOp::And);
        assert!(matches!(outer.lexpr.as_ref(), WhereExpr::Binary(inner) if inner.op == BinaryOp::And));
    }

    #[test]
    fn where_clause_function_and_cast() {
        let where_clause = where_parse(
            "SELECT * FROM information_schema.tables WHERE table_schema = database() AND table_name = 'x'::name",
        )
        .unwrap();

        assert_eq!(
            where_clause.to_sql(),
            "table_schema = database() AND table_name = 'x'::name"
        );
    }

    #[test]
    fn where_clause_parameter() {
        let where_clause =
            where_parse("SELECT * FROM information_schema.tables WHERE table_name = $2").unwrap();

        let expected = WhereExpr::Binary(BinaryExpr {
            op: BinaryOp::Equal,
            lexpr: Box::new(col("table_name")),
            rexpr: Box::new(WhereExpr::Value(LiteralValue::Parameter("$2".to_owned()))),
        });
        assert_eq!(where_clause, expected);
    }

    #[test]
    fn where_clause_unmodelled_comparison_is_opaque() {
        let where_clause = where_parse(
            "SELECT * FROM information_schema.tables WHERE table_name = ANY(ARRAY['a', 'b'])",
        )
        .unwrap();

        let WhereExpr::Opaque(sql) = &where_clause else {
            panic!("expected opaque leaf, got {where_clause:?}");
        };
        assert!(sql.starts_with("table_name = ANY"), "{sql}");
    }

    #[test]
    fn where_clause_opaque_operand_keeps_siblings() {
        let where_clause = where_parse(
            "SELECT * FROM information_schema.columns              WHERE table_name = 't1' AND ordinal_position > 1 + 1",
        )
        .unwrap();

        let WhereExpr::Binary(and) = &where_clause else {
            panic!("expected binary");
        };
        assert_eq!(and.op, BinaryOp::And);
        assert_eq!(
            *and.lexpr,
            WhereExpr::Binary(BinaryExpr {
                op: BinaryOp::Equal,
                lexpr: Box::new(col("table_name")),
                rexpr: Box::new(string("t1")),
            })
        );
        assert_eq!(
            *and.rexpr,
            WhereExpr::Binary(BinaryExpr {
                op: BinaryOp::GreaterThan,
                lexpr: Box::new(col("ordinal_position")),
                rexpr: Box::new(WhereExpr::Opaque("1 + 1".to_owned())),
            })
        );
        assert_eq!(
            where_clause.to_sql(),
            "table_name = 't1' AND ordinal_position > 1 + 1"
        );
    }

    #[test]
    fn where_clause_subquery_and_between_are_opaque() {
        let where_clause = where_parse(
            "SELECT * FROM information_schema.columns              WHERE table_schema = (SELECT current_schema())              AND ordinal_position BETWEEN 1 AND 3",
        )
        .unwrap();

        let WhereExpr::Binary(and) = &where_clause else {
            panic!("expected binary");
        };
        let WhereExpr::Binary(eq) = and.lexpr.as_ref() else {
            panic!("expected equality");
        };
        assert_eq!(*eq.lexpr, col("table_schema"));
        assert!(matches!(eq.rexpr.as_ref(), WhereExpr::Opaque(sql) if sql.contains("SELECT")));
        assert!(matches!(and.rexpr.as_ref(), WhereExpr::Opaque(sql) if sql.contains("BETWEEN")));
    }

    #[test]
    fn where_clause_float_keeps_source_text() {
        let where_clause =
            where_parse("SELECT * FROM information_schema.tables WHERE table_name = 1.50")
                .unwrap();

        let WhereExpr::Binary(eq) = &where_clause else {
            panic!("expected binary");
        };
        assert!(matches!(
            eq.rexpr.as_ref(),
            WhereExpr::Value(LiteralValue::Float { text, .. }) if text == "1.50"
        ));
        assert_eq!(where_clause.to_sql(), "table_name = 1.50");
    }

    #[test]
    fn join_quals_come_before_where() {
        let ast = pg_query::parse(
            "SELECT * FROM information_schema.tables t \
             JOIN information_schema.columns c ON c.table_name = t.table_name \
             WHERE t.table_schema = 'ks'",
        )
        .unwrap();
        let QueryBody::Select(node) = query_body_parse(&ast).unwrap() else {
            panic!("expected plain select");
        };

        assert_eq!(node.tables.len(), 2);
        assert_eq!(node.tables[0].schema.as_deref(), Some("information_schema"));
        assert_eq!(node.tables[1].alias.as_deref(), Some("c"));
        assert_eq!(
            node.filters
                .iter()
                .map(|filter| filter.source)
                .collect::<Vec<_>>(),
            vec![FilterSource::JoinOn, FilterSource::Where]
        );
    }

    #[test]
    fn union_arms_in_order() {
        let ast = pg_query::parse(
            "SELECT table_schema FROM information_schema.tables WHERE table_schema = 'a' \
             UNION ALL SELECT table_schema FROM information_schema.tables WHERE table_schema = 'b'",
        )
        .unwrap();
        let body = query_body_parse(&ast).unwrap();

        assert!(matches!(
            body,
            QueryBody::SetOp {
                op: SetOpType::Union,
                all: true,
                ..
            }
        ));
        assert_eq!(body.select_nodes().len(), 2);
        assert_eq!(body.shape(), "(SELECT UNION ALL SELECT)");
    }

    #[test]
    fn set_operation_shape_nests() {
        let ast = pg_query::parse(
            "SELECT 1 FROM pg_catalog.pg_class EXCEPT              (SELECT 1 FROM pg_catalog.pg_class INTERSECT SELECT 1 FROM pg_catalog.pg_type)",
        )
        .unwrap();
        let body = query_body_parse(&ast).unwrap();

        assert_eq!(body.shape(), "(SELECT EXCEPT (SELECT INTERSECT SELECT))");
    }

    #[test]
    fn non_select_statement_rejected() {
        let ast = pg_query::parse("DELETE FROM users WHERE id = 1").unwrap();
        assert!(matches!(
            query_body_parse(&ast),
            Err(StatementParseError::UnsupportedStatement { .. })
        ));

        let ast = pg_query::parse("SELECT 1; SELECT 2").unwrap();
        assert!(matches!(
            query_body_parse(&ast),
            Err(StatementParseError::MultipleStatements)
        ));
    }
}
