pub mod api;
pub mod asset_factory;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod templates;
pub mod thumbnail;
