//! Schema Model: an immutable description of one regeneration request.
//!
//! ```text
//! SchemaModel
//! ├── connection       dialect + endpoints
//! ├── tables[]         TableSpec → AttributeSpec[], lookup sub-column configs, expanded lookups
//! ├── relationships[]  RelationshipSpec (lookup-derived)
//! └── date_table?      DateTableSpec + DateRelationship[]
//! ```
//!
//! Pure data. Constructed by the caller (usually through [`loader`]) and never
//! mutated during a build.

pub mod attribute;
pub mod date_table;
pub mod loader;
pub mod relationship;
pub mod table;

pub use attribute::{AttributeKind, AttributeSpec, LookupColumnConfig};
pub use date_table::{DateRelationship, DateTableSpec};
pub use relationship::RelationshipSpec;
pub use table::{ExpandedLookup, TableRole, TableSpec};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::ConnectionSpec;

/// Partition storage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    #[serde(alias = "DirectQuery", alias = "directQuery")]
    DirectQuery,
    #[serde(alias = "Import")]
    Import,
    /// Fact tables stay direct query; dimensions are dual.
    #[serde(alias = "Dual")]
    Dual,
}

impl StorageMode {
    /// Partition `mode:` keyword.
    pub fn as_tmdl(&self) -> &'static str {
        match self {
            StorageMode::DirectQuery => "directQuery",
            StorageMode::Import => "import",
            StorageMode::Dual => "dual",
        }
    }

    /// Whether rows are copied into the model (anything but pure direct query).
    pub fn is_materialized(&self) -> bool {
        !matches!(self, StorageMode::DirectQuery)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "directquery" | "direct_query" | "dq" => Some(StorageMode::DirectQuery),
            "import" => Some(StorageMode::Import),
            "dual" => Some(StorageMode::Dual),
            _ => None,
        }
    }
}

/// One regeneration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub project_name: String,
    pub connection: ConnectionSpec,
    pub storage_mode: StorageMode,
    /// Fixed offset applied to date/time values, in minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Label language for choice metadata joins.
    pub language_code: u32,
    pub tables: Vec<TableSpec>,
    pub relationships: Vec<RelationshipSpec>,
    pub date_table: Option<DateTableSpec>,
    pub date_relationships: Vec<DateRelationship>,
}

impl SchemaModel {
    pub fn new(project_name: impl Into<String>, connection: ConnectionSpec) -> Self {
        Self {
            project_name: project_name.into(),
            connection,
            storage_mode: StorageMode::default(),
            utc_offset_minutes: 0,
            language_code: 1033,
            tables: Vec::new(),
            relationships: Vec::new(),
            date_table: None,
            date_relationships: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableSpec) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipSpec) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Find a table by logical name (case-insensitive).
    pub fn table(&self, logical_name: &str) -> Option<&TableSpec> {
        self.tables
            .iter()
            .find(|t| t.logical_name.eq_ignore_ascii_case(logical_name))
    }

    /// Reference attributes on `table` that some relationship depends on.
    ///
    /// Their id sub-column is always emitted, whatever the configuration says.
    pub fn required_lookup_attributes(&self, table: &TableSpec) -> BTreeSet<String> {
        self.relationships
            .iter()
            .filter(|r| r.source_table.eq_ignore_ascii_case(&table.logical_name))
            .map(|r| r.source_attribute.to_ascii_lowercase())
            .collect()
    }
}
