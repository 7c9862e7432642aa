//! Structural view of a definition tree, for comparison.

use std::collections::{BTreeMap, BTreeSet};

use crate::build::paths::{is_table_file, RELATIONSHIPS_FILE};
use crate::build::tree::DefinitionTree;
use crate::tmdl::parse_document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSnapshot {
    pub data_type: Option<String>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    pub columns: BTreeMap<String, ColumnSnapshot>,
    /// Measure name → expression.
    pub measures: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSnapshot {
    pub from: (String, String),
    pub to: (String, String),
    pub is_active: bool,
    pub cross_filter_both: bool,
}

/// Tables, relationships and expressions of one tree, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSnapshot {
    pub tables: BTreeMap<String, TableSnapshot>,
    pub relationships: BTreeMap<String, RelationshipSnapshot>,
    pub expressions: BTreeSet<String>,
}

impl ModelSnapshot {
    pub fn from_tree(tree: &DefinitionTree) -> Self {
        let mut snapshot = Self::default();

        for (rel, text) in tree.files() {
            let doc = parse_document(text);
            if is_table_file(rel) {
                for table in doc.tables {
                    let entry = snapshot.tables.entry(table.name).or_default();
                    for column in table.columns {
                        entry.columns.insert(
                            column.name,
                            ColumnSnapshot {
                                data_type: column.data_type,
                                is_hidden: column.is_hidden,
                            },
                        );
                    }
                    for measure in table.measures {
                        entry.measures.insert(measure.name, measure.expression);
                    }
                }
            } else if rel == RELATIONSHIPS_FILE {
                for block in doc.relationships {
                    let Some(key) = block.canonical_key() else {
                        continue;
                    };
                    let (Some(from), Some(to)) = (block.from_column, block.to_column) else {
                        continue;
                    };
                    snapshot.relationships.insert(
                        key,
                        RelationshipSnapshot {
                            from,
                            to,
                            is_active: block.is_active,
                            cross_filter_both: block.cross_filter_both,
                        },
                    );
                }
            }
            snapshot
                .expressions
                .extend(doc.expressions.into_iter().map(|e| e.name));
        }

        snapshot
    }

    /// All measure expressions with the table that owns them.
    pub fn measure_expressions(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.tables.iter().flat_map(|(table, snap)| {
            snap.measures
                .iter()
                .map(move |(name, expr)| (table.as_str(), name.as_str(), expr.as_str()))
        })
    }
}
