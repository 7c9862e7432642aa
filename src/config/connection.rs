//! Connection description for the generated model.

use serde::{Deserialize, Serialize};

use crate::sql::Dialect;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Where the generated partitions read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub dialect: Dialect,

    /// Environment URL, e.g. `https://org.crm.dynamics.com`.
    pub environment_url: String,

    /// SQL analytics endpoint host (fabric only).
    #[serde(default)]
    pub sql_endpoint: Option<String>,

    /// Lakehouse database name (fabric only).
    #[serde(default)]
    pub database: Option<String>,
}

impl ConnectionSpec {
    /// Connection through the TDS endpoint.
    pub fn tds(environment_url: impl Into<String>) -> Self {
        Self {
            dialect: Dialect::DataverseTds,
            environment_url: normalize_url(environment_url.into()),
            sql_endpoint: None,
            database: None,
        }
    }

    /// Connection through a lakehouse SQL analytics endpoint.
    pub fn fabric(
        environment_url: impl Into<String>,
        sql_endpoint: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            dialect: Dialect::FabricLink,
            environment_url: normalize_url(environment_url.into()),
            sql_endpoint: Some(sql_endpoint.into()),
            database: Some(database.into()),
        }
    }

    /// Check the fields the chosen dialect needs.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.environment_url.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "environment_url must not be empty".to_string(),
            ));
        }
        if self.dialect == Dialect::FabricLink {
            if self.sql_endpoint.as_deref().map_or(true, |s| s.trim().is_empty()) {
                return Err(ConnectionError::InvalidConfig(
                    "fabric connections need sql_endpoint".to_string(),
                ));
            }
            if self.database.as_deref().map_or(true, |s| s.trim().is_empty()) {
                return Err(ConnectionError::InvalidConfig(
                    "fabric connections need database".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Host part of the environment URL (no scheme, no trailing slash).
    pub fn environment_host(&self) -> &str {
        self.environment_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
    }
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
