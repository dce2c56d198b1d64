pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod service;

pub use config::{AppConfig, MatchSettings, OversizePolicy};
pub use error::{ConfigError, ReconcileError};
pub use service::ReconcileService;
