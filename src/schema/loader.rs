//! Load a Schema Model from an exported metadata dictionary.
//!
//! The dictionary is the JSON document written by the metadata collaborator:
//!
//! ```json
//! {
//!   "ProjectName": "Sales",
//!   "Tables": [
//!     {
//!       "LogicalName": "account",
//!       "DisplayName": "Account",
//!       "Role": "Dimension",
//!       "PrimaryIdAttribute": "accountid",
//!       "PrimaryNameAttribute": "name",
//!       "Attributes": [
//!         { "LogicalName": "name", "DisplayName": "Account Name", "AttributeType": "String" }
//!       ],
//!       "View": { "ViewId": "...", "ViewName": "Active Accounts", "FetchXml": "<fetch>...</fetch>" }
//!     }
//!   ],
//!   "Relationships": [
//!     { "SourceTable": "opportunity", "SourceAttribute": "parentaccountid", "TargetTable": "account" }
//!   ]
//! }
//! ```
//!
//! Connection and model-wide options come from [`Settings`](crate::config::Settings),
//! not from the dictionary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DateRelationship, RelationshipSpec, SchemaModel, TableSpec};
use crate::config::{ConnectionSpec, ModelSettings, SettingsError};

/// Error type for dictionary loading.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Failed to read metadata dictionary: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse metadata dictionary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model settings: {0}")]
    Settings(#[from] SettingsError),
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// A saved view whose filter becomes the table's row filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ViewEntry {
    #[serde(default)]
    pub view_id: Option<String>,
    #[serde(default)]
    pub view_name: Option<String>,
    #[serde(default)]
    pub fetch_xml: Option<String>,
}

/// One table entry: the table spec plus an optional selected view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableEntry {
    #[serde(flatten)]
    pub table: TableSpec,

    #[serde(default)]
    pub view: Option<ViewEntry>,
}

impl TableEntry {
    /// Explicit `Filter` wins over the view's filter.
    fn into_table(self) -> TableSpec {
        let mut table = self.table;
        if table.filter.is_none() {
            table.filter = self.view.and_then(|v| v.fetch_xml);
        }
        table
    }
}

/// The whole exported dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataDictionary {
    pub project_name: String,

    #[serde(default)]
    pub tables: Vec<TableEntry>,

    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,

    #[serde(default)]
    pub date_relationships: Vec<DateRelationship>,
}

impl MetadataDictionary {
    /// Parse a dictionary from JSON text.
    pub fn from_json(json: &str) -> LoaderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a dictionary file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LoaderResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Combine with connection and model settings into a Schema Model.
    pub fn into_model(
        self,
        connection: ConnectionSpec,
        settings: &ModelSettings,
    ) -> LoaderResult<SchemaModel> {
        let mut model = SchemaModel::new(self.project_name, connection);
        model.storage_mode = settings.storage_mode()?;
        model.utc_offset_minutes = settings.utc_offset_minutes;
        model.language_code = settings.language_code;
        model.date_table = settings.date_table()?;
        model.tables = self.tables.into_iter().map(TableEntry::into_table).collect();
        model.relationships = self.relationships;
        model.date_relationships = self.date_relationships;
        Ok(model)
    }
}
