use pg_query::ParseResult;
use tracing::{debug, instrument};

use crate::query::parse::{QueryBody, TableNode, query_body_parse};
use crate::result::ReportExt;

use super::system_tables::system_predicates_find;
use super::{RouteResult, SYSTEM_SCHEMAS, SystemRoute};

fn table_is_system(table: &TableNode) -> bool {
    table.schema.as_deref().is_some_and(|schema| {
        SYSTEM_SCHEMAS
            .iter()
            .any(|system| schema.eq_ignore_ascii_case(system))
    })
}

/// Every arm reads at least one relation and all of them are catalog views.
fn query_body_is_system(body: &QueryBody) -> bool {
    body.select_nodes()
        .iter()
        .all(|node| !node.tables.is_empty() && node.tables.iter().all(table_is_system))
}

/// Plan a route for a statement that reads only system catalog views.
///
/// Returns `Ok(None)` for anything else: statements that are not a single
/// SELECT (or set operation of SELECTs), or that touch a user relation.
/// Routing predicates are pulled from every arm's JOIN conditions and WHERE
/// clause in order, each filter continuing the route's parameter numbering.
#[instrument(skip_all)]
pub fn system_route_plan(ast: &ParseResult) -> RouteResult<Option<SystemRoute>> {
    let body = match query_body_parse(ast) {
        Ok(body) => body,
        Err(e) => {
            debug!("statement not routable: {e}");
            return Ok(None);
        }
    };

    if !query_body_is_system(&body) {
        debug!("statement reads a non-catalog relation");
        return Ok(None);
    }

    let mut route = SystemRoute::new(body);
    let SystemRoute {
        body,
        schema_params,
        table_params,
    } = &mut route;

    for (arm, node) in body.select_nodes_mut().into_iter().enumerate() {
        for filter in &mut node.filters {
            let source = filter.source;
            let Some(expr) = filter.expr.as_mut() else {
                debug!("arm {arm}: {source:?} filter not convertible, no routing predicates");
                continue;
            };

            system_predicates_find(expr, schema_params, table_params)
                .attach_loc(format!("extracting routing predicates from arm {arm} {source:?} filter"))?;
        }
    }

    debug!(
        "system route planned with {} schema and {} table parameters",
        route.schema_params.len(),
        route.table_params.len()
    );

    Ok(Some(route))
}
