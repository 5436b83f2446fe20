pub mod app;
pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod infra;
pub mod logging;
pub mod merge;
pub mod metrics;
pub mod normalize;
pub mod schema;
pub mod sources;
pub mod types;
