//! Configuration module for modelsmith.
//!
//! Handles connection configuration, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{ConnectionError, ConnectionSpec};
pub use settings::{
    expand_env_vars, ConnectionSettings, DateTableSettings, ModelSettings, OutputSettings,
    Settings, SettingsError,
};
