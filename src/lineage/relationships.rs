//! Relationship identifiers and the previous relationship blocks.

use std::collections::HashMap;

use super::table::new_identifier;
use crate::tmdl::{RelationshipBlock, TmdlDocument};

/// Annotation marking a block the generator owns.
pub const GENERATED_BY: &str = "GeneratedBy";

/// Value of [`GENERATED_BY`].
pub const GENERATOR_NAME: &str = "modelsmith";

/// Annotation carrying the logical (rename-proof) key of a managed block.
pub const SOURCE_KEY: &str = "SourceKey";

/// Previous relationships keyed by canonical key.
#[derive(Debug, Clone, Default)]
pub struct RelationshipLineage {
    ids: HashMap<String, String>,
    blocks: Vec<RelationshipBlock>,
}

impl RelationshipLineage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_document(doc: &TmdlDocument) -> Self {
        let mut ids = HashMap::new();
        for block in &doc.relationships {
            if let Some(key) = block.canonical_key() {
                ids.entry(key).or_insert_with(|| block.id.clone());
            }
            if let Some(logical) = block.annotation(SOURCE_KEY) {
                ids.entry(logical_key(logical))
                    .or_insert_with(|| block.id.clone());
            }
        }
        Self {
            ids,
            blocks: doc.relationships.clone(),
        }
    }

    /// Identifier for the canonical key, else the logical key, else a fresh one.
    pub fn resolve(&self, key: &str, logical: Option<&str>) -> String {
        self.ids
            .get(key)
            .or_else(|| logical.and_then(|l| self.ids.get(&logical_key(l))))
            .cloned()
            .unwrap_or_else(new_identifier)
    }

    /// Previous blocks in file order.
    pub fn previous(&self) -> &[RelationshipBlock] {
        &self.blocks
    }
}

fn logical_key(logical: &str) -> String {
    format!("logical:{}", logical.to_ascii_lowercase())
}

/// Whether the block carries the generator's ownership annotation.
pub fn is_generated(block: &RelationshipBlock) -> bool {
    block.annotation(GENERATED_BY) == Some(GENERATOR_NAME)
}
