//! Identifiers and preserved text recovered from one previous table file.

use std::collections::HashMap;

use uuid::Uuid;

use crate::tmdl::{MeasureBlock, TableBlock};

/// Annotation carrying a column's logical sub-column name.
pub const SOURCE_LOGICAL_NAME: &str = "SourceLogicalName";

/// Annotation recording who chose the column's aggregation.
pub const SUMMARIZATION_SET_BY: &str = "SummarizationSetBy";

/// Tool-owned annotations; never copied as user annotations.
const TOOL_ANNOTATIONS: &[&str] = &[SOURCE_LOGICAL_NAME, SUMMARIZATION_SET_BY];

/// Key for the table's own identifier.
pub const TABLE_KEY: &str = "table";

/// `col:<name>`
pub fn column_key(name: &str) -> String {
    format!("col:{name}")
}

/// `logicalcol:<logical>`, case-insensitive.
pub fn logical_column_key(logical: &str) -> String {
    format!("logicalcol:{}", logical.to_ascii_lowercase())
}

/// `measure:<name>`
pub fn measure_key(name: &str) -> String {
    format!("measure:{name}")
}

/// Mint a fresh identifier.
pub fn new_identifier() -> String {
    Uuid::new_v4().to_string()
}

/// Preserved per-column text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub description: Option<String>,
    pub format_string: Option<String>,
    pub summarize_by: Option<String>,
    /// User annotations in file order.
    pub annotations: Vec<(String, String)>,
}

/// Everything recovered from one previous table block.
#[derive(Debug, Clone, Default)]
pub struct TableLineage {
    display_name: Option<String>,
    ids: HashMap<String, String>,
    columns: HashMap<String, ColumnMetadata>,
    measures: Vec<MeasureBlock>,
}

impl TableLineage {
    /// Lineage with nothing recorded; every lookup mints.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_block(block: &TableBlock) -> Self {
        let mut lineage = Self {
            display_name: Some(block.name.clone()),
            ..Self::default()
        };
        if let Some(tag) = &block.lineage_tag {
            lineage.ids.insert(TABLE_KEY.to_string(), tag.clone());
        }

        for column in &block.columns {
            let logical = column.annotation(SOURCE_LOGICAL_NAME);
            if let Some(tag) = &column.lineage_tag {
                lineage.ids.insert(column_key(&column.name), tag.clone());
                if let Some(logical) = logical {
                    lineage
                        .ids
                        .entry(logical_column_key(logical))
                        .or_insert_with(|| tag.clone());
                }
            }

            let metadata = ColumnMetadata {
                description: column.description.clone(),
                format_string: column.format_string.clone(),
                summarize_by: column.summarize_by.clone(),
                annotations: column
                    .annotations
                    .iter()
                    .filter(|(k, _)| !TOOL_ANNOTATIONS.contains(&k.as_str()))
                    .cloned()
                    .collect(),
            };
            let source = column.source_column.as_deref().unwrap_or(&column.name);
            lineage
                .columns
                .insert(source.to_string(), metadata.clone());
            if let Some(logical) = logical {
                lineage
                    .columns
                    .entry(logical_column_key(logical))
                    .or_insert(metadata);
            }
        }

        for measure in &block.measures {
            if let Some(tag) = &measure.lineage_tag {
                lineage.ids.insert(measure_key(&measure.name), tag.clone());
            }
        }
        lineage.measures = block.measures.clone();
        lineage
    }

    /// Table name in the previous file, if there was one.
    pub fn previous_display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Stored identifier for `key`, without minting.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    /// Identifier for `key`, else for `fallback`, else a fresh one.
    pub fn resolve(&self, key: &str, fallback: Option<&str>) -> String {
        self.lookup(key)
            .or_else(|| fallback.and_then(|f| self.lookup(f)))
            .map(str::to_string)
            .unwrap_or_else(new_identifier)
    }

    /// Preserved metadata by source column text, else by logical name.
    pub fn column_metadata(&self, source_column: &str, logical: Option<&str>) -> Option<&ColumnMetadata> {
        self.columns
            .get(source_column)
            .or_else(|| logical.and_then(|l| self.columns.get(&logical_column_key(l))))
    }

    /// Previous measures not in `excluded`, first occurrence of each name.
    ///
    /// Names compare case-insensitively, as DAX does.
    pub fn user_measures(&self, excluded: &[String]) -> Vec<&MeasureBlock> {
        let mut seen: Vec<String> = excluded.iter().map(|n| n.to_lowercase()).collect();
        let mut out = Vec::new();
        for measure in &self.measures {
            let name = measure.name.to_lowercase();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            out.push(measure);
        }
        out
    }
}
