#![allow(dead_code)]

use std::sync::Once;

use pgroute_lib::route::{BindValues, SystemRoute, route_bind_values, system_route_plan};
use pgroute_lib::tracing_utils::SimpeFormatter;
use tracing::Level;

static TRACING_INIT: Once = Once::new();

/// Install the test subscriber once so routing decisions show up with `--nocapture`.
pub fn tracing_init() {
    TRACING_INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .event_format(SimpeFormatter)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Plan `sql`, panicking when it does not parse or does not route to the catalog.
pub fn route_plan(sql: &str) -> SystemRoute {
    tracing_init();
    let ast = pg_query::parse(sql).expect("SQL should parse");
    system_route_plan(&ast)
        .expect("plan should succeed")
        .expect("catalog query should route")
}

/// Plan `sql` and bind the given client arguments.
pub fn route_bind(sql: &str, args: &[&str]) -> (SystemRoute, BindValues) {
    let route = route_plan(sql);
    let args: Vec<Option<String>> = args.iter().map(|arg| Some((*arg).to_owned())).collect();
    let values = route_bind_values(&route, &args).expect("bind should succeed");
    (route, values)
}

/// Rewritten filters of every arm, as SQL.
pub fn filters_sql(route: &SystemRoute) -> Vec<String> {
    route.filters().map(|expr| expr.to_sql()).collect()
}

/// Query on `information_schema.tables` with the given WHERE clause.
pub fn tables_query(predicate: &str) -> String {
    format!("SELECT DISTINCT table_schema FROM information_schema.tables WHERE {predicate}")
}
