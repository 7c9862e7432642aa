//! Lineage Store: identifiers and user text recovered from the previous output.
//!
//! Built once per build from the previous [`DefinitionTree`] and read-only
//! afterwards, so table rendering can share it across threads. A missing
//! previous tree is not an error; every lookup then mints a fresh identifier.
//!
//! Lookup keys:
//!
//! | Key | Bound to |
//! |-----|----------|
//! | `table` | table lineage tag |
//! | `col:<name>` | column by current name |
//! | `logicalcol:<logical>` | column by `SourceLogicalName` annotation |
//! | `measure:<name>` | measure |
//! | `expr:<name>` | shared expression |
//!
//! Relationships are keyed by `From.col→To.col`.

pub mod relationships;
pub mod table;

pub use relationships::{is_generated, RelationshipLineage, GENERATED_BY, GENERATOR_NAME, SOURCE_KEY};
pub use table::{
    column_key, logical_column_key, measure_key, new_identifier, ColumnMetadata, TableLineage,
    SOURCE_LOGICAL_NAME, SUMMARIZATION_SET_BY, TABLE_KEY,
};

use std::collections::HashMap;

use tracing::debug;

use crate::build::paths::{EXPRESSIONS_FILE, RELATIONSHIPS_FILE};
use crate::build::tree::DefinitionTree;
use crate::tmdl::{parse_document, ExpressionBlock};

/// Marker used for the connection parameter table.
pub const PARAMETER_MARKER: &str = "@parameter";

/// Marker used for the generated date table.
pub const DATE_MARKER: &str = "@date";

/// One table file from the previous output.
#[derive(Debug, Clone)]
pub struct PreviousTable {
    pub path: String,
    /// Logical name from the `// source:` comment.
    pub marker: Option<String>,
    pub name: String,
    pub columns: Vec<String>,
    lineage: TableLineage,
}

impl PreviousTable {
    pub fn lineage(&self) -> &TableLineage {
        &self.lineage
    }
}

/// Snapshot of the previous output.
#[derive(Debug, Clone, Default)]
pub struct LineageStore {
    tables: Vec<PreviousTable>,
    relationships: RelationshipLineage,
    expressions: Vec<ExpressionBlock>,
    expression_ids: HashMap<String, String>,
    empty: TableLineage,
}

impl LineageStore {
    /// First build: nothing to preserve.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(tree: &DefinitionTree) -> Self {
        let mut store = Self::default();

        for (path, text) in tree.table_files() {
            let doc = parse_document(text);
            let Some(block) = doc.tables.first() else {
                debug!(path, "no table block, skipped");
                continue;
            };
            store.tables.push(PreviousTable {
                path: path.to_string(),
                marker: doc.source_marker.clone(),
                name: block.name.clone(),
                columns: block.columns.iter().map(|c| c.name.clone()).collect(),
                lineage: TableLineage::from_block(block),
            });
        }

        if let Some(text) = tree.get(RELATIONSHIPS_FILE) {
            store.relationships = RelationshipLineage::from_document(&parse_document(text));
        }

        if let Some(text) = tree.get(EXPRESSIONS_FILE) {
            let doc = parse_document(text);
            for expr in &doc.expressions {
                if let Some(tag) = &expr.lineage_tag {
                    store
                        .expression_ids
                        .entry(expression_key(&expr.name))
                        .or_insert_with(|| tag.clone());
                }
            }
            store.expressions = doc.expressions;
        }

        debug!(
            tables = store.tables.len(),
            relationships = store.relationships.previous().len(),
            "lineage loaded"
        );
        store
    }

    /// The previous file that describes table `logical`, if any.
    ///
    /// A file whose `source:` marker names `logical` wins, which lets a
    /// renamed table keep its identifiers. Failing that, a file with the same
    /// display name is used unless its marker names some other table.
    pub fn previous_table(&self, logical: &str, display: &str) -> Option<&PreviousTable> {
        self.tables
            .iter()
            .find(|t| {
                t.marker
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case(logical))
            })
            .or_else(|| {
                self.tables.iter().find(|t| {
                    t.name == display
                        && t.marker
                            .as_deref()
                            .map_or(true, |m| m.eq_ignore_ascii_case(logical))
                })
            })
    }

    /// Lineage for table `logical` currently displayed as `display`.
    pub fn table(&self, logical: &str, display: &str) -> &TableLineage {
        self.previous_table(logical, display)
            .map(|t| &t.lineage)
            .unwrap_or(&self.empty)
    }

    /// Every previous table file.
    pub fn previous_tables(&self) -> &[PreviousTable] {
        &self.tables
    }

    pub fn relationships(&self) -> &RelationshipLineage {
        &self.relationships
    }

    /// Identifier for a shared expression.
    pub fn resolve_expression(&self, name: &str) -> String {
        self.expression_ids
            .get(&expression_key(name))
            .cloned()
            .unwrap_or_else(new_identifier)
    }

    /// Previous expression blocks in file order.
    pub fn previous_expressions(&self) -> &[ExpressionBlock] {
        &self.expressions
    }
}

fn expression_key(name: &str) -> String {
    format!("expr:{name}")
}
