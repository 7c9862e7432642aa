//! TOML-based configuration for modelsmith.
//!
//! Supports a config file (modelsmith.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [output]
//! definition_dir = "Reports/Sales/Sales.SemanticModel/definition"
//! backup = true
//!
//! [connection]
//! dialect = "fabric"
//! environment_url = "https://org.crm.dynamics.com"
//! sql_endpoint = "${FABRIC_SQL_ENDPOINT}"
//! database = "dataverse_org"
//!
//! [model]
//! storage_mode = "dual"
//! utc_offset_minutes = -300
//!
//! [model.date_table]
//! start_year = 2020
//! end_year = 2030
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::connection::ConnectionSpec;
use crate::schema::{DateTableSpec, StorageMode};
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Unsupported storage mode: {0}")]
    UnsupportedStorageMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Where the definition tree lives.
    pub output: OutputSettings,

    /// Source connection.
    pub connection: ConnectionSettings,

    /// Model-wide generation options.
    pub model: ModelSettings,
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Semantic model `definition` folder (supports ${ENV_VAR} expansion).
    pub definition_dir: String,

    /// Snapshot the previous tree before overwriting it.
    pub backup: bool,

    /// Backup root; defaults to `<definition_dir>/../.backups`.
    pub backup_dir: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            definition_dir: "definition".to_string(),
            backup: true,
            backup_dir: None,
        }
    }
}

impl OutputSettings {
    pub fn resolved_definition_dir(&self) -> Result<PathBuf, SettingsError> {
        Ok(PathBuf::from(expand_env_vars(&self.definition_dir)?))
    }

    /// Backup root. A root inside the definition folder would be copied into
    /// every later backup, so it is rejected.
    pub fn resolved_backup_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.backup_dir {
            Some(dir) => {
                let backup = PathBuf::from(expand_env_vars(dir)?);
                let definition = self.resolved_definition_dir()?;
                if lexical(&backup).starts_with(lexical(&definition)) {
                    return Err(SettingsError::InvalidConfig(format!(
                        "backup_dir {} is inside definition_dir {}",
                        backup.display(),
                        definition.display()
                    )));
                }
                Ok(backup)
            }
            None => {
                let definition = self.resolved_definition_dir()?;
                let parent = definition
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                Ok(parent.join(".backups"))
            }
        }
    }
}

/// `.` and `..` folded away without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Dialect (tds, fabric).
    pub dialect: String,

    /// Environment URL (supports ${ENV_VAR} expansion).
    pub environment_url: String,

    /// SQL analytics endpoint (fabric).
    pub sql_endpoint: Option<String>,

    /// Lakehouse database (fabric).
    pub database: Option<String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            dialect: "tds".to_string(),
            environment_url: String::new(),
            sql_endpoint: None,
            database: None,
        }
    }
}

impl ConnectionSettings {
    /// Get the dialect.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        Dialect::from_str(&self.dialect)
            .ok_or_else(|| SettingsError::UnsupportedDialect(self.dialect.clone()))
    }

    /// Build the connection with environment variables expanded.
    pub fn resolve(&self) -> Result<ConnectionSpec, SettingsError> {
        let url = expand_env_vars(&self.environment_url)?;
        let spec = match self.dialect()? {
            Dialect::DataverseTds => ConnectionSpec::tds(url),
            Dialect::FabricLink => {
                let endpoint = self
                    .sql_endpoint
                    .as_deref()
                    .map(expand_env_vars)
                    .transpose()?
                    .unwrap_or_default();
                let database = self
                    .database
                    .as_deref()
                    .map(expand_env_vars)
                    .transpose()?
                    .unwrap_or_default();
                ConnectionSpec::fabric(url, endpoint, database)
            }
        };
        spec.validate()
            .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;
        Ok(spec)
    }
}

/// Model-wide generation options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    /// directquery, import or dual.
    pub storage_mode: String,

    /// Fixed offset for date/time values, minutes east of UTC.
    pub utc_offset_minutes: i32,

    /// Choice label language.
    pub language_code: u32,

    /// Optional generated date table.
    pub date_table: Option<DateTableSettings>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            storage_mode: "directquery".to_string(),
            utc_offset_minutes: 0,
            language_code: 1033,
            date_table: None,
        }
    }
}

impl ModelSettings {
    pub fn storage_mode(&self) -> Result<StorageMode, SettingsError> {
        StorageMode::from_str(&self.storage_mode)
            .ok_or_else(|| SettingsError::UnsupportedStorageMode(self.storage_mode.clone()))
    }

    pub fn date_table(&self) -> Result<Option<DateTableSpec>, SettingsError> {
        let Some(dt) = &self.date_table else {
            return Ok(None);
        };
        if dt.end_year < dt.start_year {
            return Err(SettingsError::InvalidConfig(format!(
                "date_table end_year {} is before start_year {}",
                dt.end_year, dt.start_year
            )));
        }
        Ok(Some(DateTableSpec {
            name: dt.name.clone(),
            start_year: dt.start_year,
            end_year: dt.end_year,
        }))
    }
}

/// Date table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DateTableSettings {
    #[serde(default = "default_date_table_name")]
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
}

fn default_date_table_name() -> String {
    "Date".to_string()
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `MODELSMITH_CONFIG`
    /// 2. `./modelsmith.toml`
    /// 3. `~/.config/modelsmith/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("MODELSMITH_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("modelsmith.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("modelsmith").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        } else {
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // Lone $
                result.push('$');
            } else {
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            }
        }
    }

    Ok(result)
}
