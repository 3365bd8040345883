use rootcause::Report;

use crate::query::ast::{LiteralValue, WhereExpr};

use super::static_value::{literal_text, parameter_index_parse};
use super::{
    RouteError, RouteResult, SCHEMA_NAME_PREFIX, StaticValue, SystemRoute, TABLE_NAME_PREFIX,
};

/// Routing parameters of one execution resolved to text.
///
/// `schemas[i]` is the value of `__pgschemaname{i + 1}`, `tables[i]` the value
/// of `__pgtablename{i + 1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindValues {
    pub schemas: Vec<String>,
    pub tables: Vec<String>,
}

impl BindValues {
    /// Value bound to a routing parameter name.
    pub fn get(&self, name: &str) -> Option<&str> {
        let (values, position) = if let Some(position) = name.strip_prefix(SCHEMA_NAME_PREFIX) {
            (&self.schemas, position)
        } else if let Some(position) = name.strip_prefix(TABLE_NAME_PREFIX) {
            (&self.tables, position)
        } else {
            return None;
        };

        let index = position.parse::<usize>().ok()?.checked_sub(1)?;
        values.get(index).map(String::as_str)
    }

    /// Distinct schema names in parameter order.
    pub fn schema_names(&self) -> Vec<&str> {
        names_distinct(&self.schemas)
    }

    /// Distinct table names in parameter order.
    pub fn table_names(&self) -> Vec<&str> {
        names_distinct(&self.tables)
    }
}

fn names_distinct(values: &[String]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::with_capacity(values.len());
    for value in values {
        if !names.contains(&value.as_str()) {
            names.push(value);
        }
    }
    names
}

fn static_value_resolve(value: &StaticValue, args: &[Option<String>]) -> RouteResult<String> {
    match value {
        StaticValue::Literal(literal) => Ok(literal_text(literal)),
        StaticValue::Parameter(placeholder) => {
            let index = parameter_index_parse(placeholder)?;
            match args.get(index) {
                Some(Some(arg)) => Ok(arg.clone()),
                Some(None) => Err(Report::from(RouteError::NullParameter {
                    placeholder: placeholder.clone(),
                })),
                None => Err(Report::from(RouteError::ParameterOutOfBounds {
                    index,
                    count: args.len(),
                })),
            }
        }
    }
}

/// Resolve every routing parameter of `route` against the client's bind
/// arguments (`args[0]` is `$1`; `None` is SQL NULL).
pub fn route_bind_values(route: &SystemRoute, args: &[Option<String>]) -> RouteResult<BindValues> {
    let resolve = |values: &[StaticValue]| {
        values
            .iter()
            .map(|value| static_value_resolve(value, args))
            .collect::<RouteResult<Vec<_>>>()
    };

    Ok(BindValues {
        schemas: resolve(&route.schema_params)?,
        tables: resolve(&route.table_params)?,
    })
}

/// Replace every routing parameter in `expr` with its bound value.
pub fn where_expr_route_params_substitute(
    expr: &mut WhereExpr,
    values: &BindValues,
) -> RouteResult<()> {
    match expr {
        WhereExpr::RouteParam(name) => {
            let value = values.get(name).ok_or_else(|| {
                Report::from(RouteError::UnknownRouteParam { name: name.clone() })
            })?;
            *expr = WhereExpr::Value(LiteralValue::String(value.to_owned()));
        }
        WhereExpr::Value(_) | WhereExpr::Column(_) | WhereExpr::Opaque(_) => {}
        WhereExpr::Unary(unary) => {
            where_expr_route_params_substitute(&mut unary.expr, values)?;
        }
        WhereExpr::Binary(binary) => {
            where_expr_route_params_substitute(&mut binary.lexpr, values)?;
            where_expr_route_params_substitute(&mut binary.rexpr, values)?;
        }
        WhereExpr::Multi(multi) => {
            for expr in &mut multi.exprs {
                where_expr_route_params_substitute(expr, values)?;
            }
        }
        WhereExpr::Row(elems) => {
            for elem in elems {
                where_expr_route_params_substitute(elem, values)?;
            }
        }
        WhereExpr::Function { args, .. } => {
            for arg in args {
                where_expr_route_params_substitute(arg, values)?;
            }
        }
    }

    Ok(())
}
