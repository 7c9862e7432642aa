//! Lookup-derived relationships.

use serde::{Deserialize, Serialize};

/// One lookup-derived link from a source table's attribute to a target table's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationshipSpec {
    pub source_table: String,
    pub source_attribute: String,
    pub target_table: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Dimension to parent-dimension link.
    #[serde(default)]
    pub is_snowflake: bool,

    /// Rendered with bidirectional cross-filtering.
    #[serde(default)]
    pub is_reverse: bool,

    #[serde(default)]
    pub assume_referential_integrity: bool,
}

fn default_true() -> bool {
    true
}

impl RelationshipSpec {
    pub fn new(
        source_table: impl Into<String>,
        source_attribute: impl Into<String>,
        target_table: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_attribute: source_attribute.into(),
            target_table: target_table.into(),
            is_active: true,
            is_snowflake: false,
            is_reverse: false,
            assume_referential_integrity: false,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn snowflake(mut self) -> Self {
        self.is_snowflake = true;
        self
    }

    /// The (source, target) pair that may carry at most one active relationship.
    pub fn pair(&self) -> (String, String) {
        (
            self.source_table.to_ascii_lowercase(),
            self.target_table.to_ascii_lowercase(),
        )
    }
}
