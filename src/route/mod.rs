mod bind;
mod planner;
mod static_value;
mod system_tables;

use error_set::error_set;
use rootcause::Report;

use crate::query::ast::WhereExpr;
use crate::query::parse::{QueryBody, TableNode};

error_set! {
    RouteError := {
        #[display("Invalid parameter placeholder: {placeholder}")]
        InvalidParameterPlaceholder { placeholder: String },
        #[display("Literal '{value}' cannot be cast to {cast}")]
        InvalidCastLiteral { value: String, cast: String },
        #[display("Parameter index {index} out of bounds (have {count} parameters)")]
        ParameterOutOfBounds { index: usize, count: usize },
        #[display("Parameter {placeholder} is NULL")]
        NullParameter { placeholder: String },
        #[display("Unknown routing parameter: {name}")]
        UnknownRouteParam { name: String },
    }
}

/// Result type with location-tracking error reports for routing operations.
pub type RouteResult<T> = Result<T, Report<RouteError>>;

/// Name prefix of routing parameters holding a schema name.
pub const SCHEMA_NAME_PREFIX: &str = "__pgschemaname";

/// Name prefix of routing parameters holding a table name.
pub const TABLE_NAME_PREFIX: &str = "__pgtablename";

/// Schemas whose relations are virtual catalog views answered by every backend.
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "pg_catalog"];

/// Route for a statement that reads only system catalog views.
///
/// `body` holds the statement's filters with schema/table operands replaced by
/// [`WhereExpr::RouteParam`] nodes. `schema_params` and `table_params` are the
/// deduplicated routing values; a value's position determines its parameter
/// name (`__pgschemaname1` is `schema_params[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct SystemRoute {
    pub body: QueryBody,
    pub schema_params: Vec<StaticValue>,
    pub table_params: Vec<StaticValue>,
}

impl SystemRoute {
    pub fn new(body: QueryBody) -> Self {
        Self {
            body,
            schema_params: Vec::new(),
            table_params: Vec::new(),
        }
    }

    /// Catalog relations read by the statement, across all set-operation arms.
    pub fn tables(&self) -> impl Iterator<Item = &TableNode> {
        self.body
            .select_nodes()
            .into_iter()
            .flat_map(|node| node.tables.iter())
    }

    /// Filters of every arm that the converter could express, rewritten.
    pub fn filters(&self) -> impl Iterator<Item = &WhereExpr> {
        self.body
            .select_nodes()
            .into_iter()
            .flat_map(|node| node.filters.iter())
            .filter_map(|filter| filter.expr.as_ref())
    }

    /// True when no predicate pinned a schema or table name, so the route
    /// must consult every destination.
    pub fn is_unrestricted(&self) -> bool {
        self.schema_params.is_empty() && self.table_params.is_empty()
    }
}

pub use bind::{BindValues, route_bind_values, where_expr_route_params_substitute};
pub use planner::system_route_plan;
pub use static_value::{StaticConversion, StaticValue, static_value_convert};
pub use system_tables::{
    ColumnKind, SystemPredicates, column_classify, system_predicates_extract, system_predicates_find,
};
