pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod gazetteer;
pub mod map_sync;
pub mod observability;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
