//! pagewatch-core — shared types and configuration for Pagewatch.
//!
//! Holds the registry-facing data model (`HealthCheck`, `Services`), the
//! value identity used to debounce notifications (`CheckKey`), and the
//! environment-driven daemon configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{MAX_DURATION, PagewatchConfig, parse_duration};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
