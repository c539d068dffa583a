pub mod app;
pub mod cache;
pub mod client;
pub mod config;
pub mod model;
pub mod selection;
pub mod source;
pub mod telemetry;
