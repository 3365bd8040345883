use std::error::Error;

use pgroute_lib::query::ast::Deparse;
use pgroute_lib::route::{
    RouteResult, SCHEMA_NAME_PREFIX, StaticValue, SystemRoute, TABLE_NAME_PREFIX,
    route_bind_values, system_route_plan, where_expr_route_params_substitute,
};
use pgroute_lib::settings::Settings;
use pgroute_lib::tracing_utils::SimpeFormatter;

use tracing::{error, info};

fn route_params_print(prefix: &str, values: &[StaticValue]) {
    for (index, value) in values.iter().enumerate() {
        let mut buf = String::new();
        value.deparse(&mut buf);
        println!("  :{prefix}{} = {buf}", index + 1);
    }
}

fn route_print(route: &SystemRoute, args: &[Option<String>]) -> RouteResult<()> {
    println!("system catalog route: {}", route.body.shape());
    route_params_print(SCHEMA_NAME_PREFIX, &route.schema_params);
    route_params_print(TABLE_NAME_PREFIX, &route.table_params);
    for filter in route.filters() {
        println!("  filter: {}", filter.to_sql());
    }

    if route.is_unrestricted() {
        println!("destinations: all");
        return Ok(());
    }

    let values = route_bind_values(route, args)?;
    for filter in route.filters() {
        let mut bound = filter.clone();
        where_expr_route_params_substitute(&mut bound, &values)?;
        println!("  bound: {}", bound.to_sql());
    }
    println!("schemas: {}", values.schema_names().join(", "));
    println!("tables: {}", values.table_names().join(", "));

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_args()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(settings.log_level)
        .event_format(SimpeFormatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let ast = pg_query::parse(&settings.sql)?;

    let result = system_route_plan(&ast).and_then(|route| match route {
        Some(route) => route_print(&route, &settings.args),
        None => {
            info!("not a system catalog query");
            println!("regular route");
            Ok(())
        }
    });

    result.map_err(|report| {
        error!("{report}");
        Box::new(report.into_current_context()) as Box<dyn Error>
    })
}
