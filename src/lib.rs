pub mod query;
pub mod result;
pub mod route;
pub mod settings;
pub mod tracing_utils;
