//! Table descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attribute::{AttributeSpec, LookupColumnConfig};
use super::StorageMode;

/// Role of a table in the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TableRole {
    Fact,
    #[default]
    Dimension,
}

/// Additional columns pulled from a lookup's target table through a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpandedLookup {
    /// Lookup attribute on this table.
    pub lookup_attribute: String,

    /// Target table logical name (the join never uses the display name).
    pub target_table: String,

    /// Target primary id column; defaults to `<target_table>id`.
    #[serde(default)]
    pub target_primary_id: Option<String>,

    pub columns: Vec<AttributeSpec>,
}

impl ExpandedLookup {
    pub fn target_key(&self) -> String {
        self.target_primary_id
            .clone()
            .unwrap_or_else(|| format!("{}id", self.target_table))
    }

    /// Alias used for the joined target in the partition query.
    pub fn join_alias(&self) -> String {
        format!("x_{}", self.lookup_attribute)
    }
}

/// One table to emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableSpec {
    pub logical_name: String,

    pub display_name: String,

    #[serde(default)]
    pub role: TableRole,

    pub primary_id_attribute: String,

    #[serde(default)]
    pub primary_name_attribute: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,

    /// Sub-column configuration keyed by reference attribute logical name.
    #[serde(default)]
    pub lookup_columns: BTreeMap<String, LookupColumnConfig>,

    #[serde(default)]
    pub expanded_lookups: Vec<ExpandedLookup>,

    /// Row filter in the filter language.
    #[serde(default)]
    pub filter: Option<String>,

    /// SQL predicate ANDed with the translated row filter.
    #[serde(default)]
    pub baseline_filter: Option<String>,

    /// Per-table storage mode override.
    #[serde(default)]
    pub storage_mode: Option<StorageMode>,
}

impl TableSpec {
    pub fn new(
        logical_name: impl Into<String>,
        display_name: impl Into<String>,
        role: TableRole,
    ) -> Self {
        let logical_name = logical_name.into();
        let primary_id_attribute = format!("{logical_name}id");
        Self {
            logical_name,
            display_name: display_name.into(),
            role,
            primary_id_attribute,
            primary_name_attribute: None,
            attributes: Vec::new(),
            lookup_columns: BTreeMap::new(),
            expanded_lookups: Vec::new(),
            filter: None,
            baseline_filter: None,
            storage_mode: None,
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_lookup_config(mut self, attribute: impl Into<String>, cfg: LookupColumnConfig) -> Self {
        self.lookup_columns.insert(attribute.into(), cfg);
        self
    }

    pub fn attribute(&self, logical_name: &str) -> Option<&AttributeSpec> {
        self.attributes
            .iter()
            .find(|a| a.logical_name.eq_ignore_ascii_case(logical_name))
    }

    pub fn is_fact(&self) -> bool {
        self.role == TableRole::Fact
    }

    /// Effective storage mode given the model-wide default.
    pub fn effective_storage_mode(&self, model_default: StorageMode) -> StorageMode {
        if let Some(mode) = self.storage_mode {
            return mode;
        }
        match model_default {
            StorageMode::Dual if self.is_fact() => StorageMode::DirectQuery,
            other => other,
        }
    }
}
