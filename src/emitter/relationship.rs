//! Relationship rendering: tool-managed blocks, then preserved user blocks.
//!
//! A previous block is preserved when
//! - the generator does not produce its key this run,
//! - it does not carry the `GeneratedBy` annotation,
//! - it does not point into the generated date table,
//! - both endpoint columns exist in this run's tables.
//!
//! A block failing only the last check is reported as repaired.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::lineage::{is_generated, RelationshipLineage, GENERATED_BY, GENERATOR_NAME, SOURCE_KEY};
use crate::schema::SchemaModel;
use crate::tmdl::format::quote_name;
use crate::tmdl::{canonical_relationship_key, IndentWriter};

/// Comment written above every preserved user block.
pub const PRESERVED_MARKER: &str = "// preserved: user relationship";

/// Key column of the generated date table.
pub const DATE_KEY_COLUMN: &str = "Date";

/// Rendered column names per table, case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    tables: HashMap<String, HashSet<String>>,
}

impl ColumnIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table<S: AsRef<str>>(&mut self, table: &str, columns: &[S]) {
        let entry = self.tables.entry(table.to_lowercase()).or_default();
        entry.extend(columns.iter().map(|c| c.as_ref().to_lowercase()));
    }

    pub fn contains(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(&table.to_lowercase())
            .is_some_and(|cols| cols.contains(&column.to_lowercase()))
    }

    fn missing(&self, table: &str, column: &str) -> Option<String> {
        if self.contains(table, column) {
            None
        } else {
            Some(format!("column {table}.{column} no longer exists"))
        }
    }
}

/// A relationship dropped because an endpoint is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairedRelationship {
    pub key: String,
    pub reason: String,
}

/// Result of rendering `relationships.tmdl`.
#[derive(Debug, Clone, Default)]
pub struct RelationshipOutput {
    pub text: String,
    /// Keys of tool-managed blocks written.
    pub produced: Vec<String>,
    /// Keys of user blocks carried over.
    pub preserved: Vec<String>,
    pub repaired: Vec<RepairedRelationship>,
}

#[derive(Debug, Clone)]
struct Planned {
    from_table: String,
    from_column: String,
    to_table: String,
    to_column: String,
    is_active: bool,
    both_directions: bool,
    rely_on_integrity: bool,
    date_part_only: bool,
    source_key: String,
}

impl Planned {
    fn key(&self) -> String {
        canonical_relationship_key(
            &self.from_table,
            &self.from_column,
            &self.to_table,
            &self.to_column,
        )
    }
}

fn plan(model: &SchemaModel, repaired: &mut Vec<RepairedRelationship>) -> Vec<Planned> {
    let mut planned = Vec::new();

    for rel in &model.relationships {
        let (Some(source), Some(target)) = (model.table(&rel.source_table), model.table(&rel.target_table))
        else {
            repaired.push(RepairedRelationship {
                key: format!("{}.{}→{}", rel.source_table, rel.source_attribute, rel.target_table),
                reason: "endpoint table is not part of the model".to_string(),
            });
            continue;
        };
        let from_column = source
            .attribute(&rel.source_attribute)
            .map_or(rel.source_attribute.clone(), |a| a.logical_name.clone());
        planned.push(Planned {
            from_table: source.display_name.clone(),
            from_column,
            to_table: target.display_name.clone(),
            to_column: target.primary_id_attribute.clone(),
            is_active: rel.is_active,
            both_directions: rel.is_reverse,
            rely_on_integrity: rel.assume_referential_integrity,
            date_part_only: false,
            source_key: format!(
                "{}.{}→{}",
                source.logical_name, rel.source_attribute, target.logical_name
            )
            .to_ascii_lowercase(),
        });
    }

    if let Some(date) = &model.date_table {
        for rel in &model.date_relationships {
            let Some(table) = model.table(&rel.table) else {
                repaired.push(RepairedRelationship {
                    key: format!("{}.{}→{}", rel.table, rel.attribute, date.name),
                    reason: "table is not part of the model".to_string(),
                });
                continue;
            };
            let from_column = table
                .attribute(&rel.attribute)
                .map_or(rel.attribute.clone(), |a| a.display_name.clone());
            planned.push(Planned {
                from_table: table.display_name.clone(),
                from_column,
                to_table: date.name.clone(),
                to_column: DATE_KEY_COLUMN.to_string(),
                is_active: rel.is_active,
                both_directions: false,
                rely_on_integrity: false,
                date_part_only: true,
                source_key: format!("{}.{}→@date", table.logical_name, rel.attribute)
                    .to_ascii_lowercase(),
            });
        }
    }

    planned
}

fn write_block(w: &mut IndentWriter, rel: &Planned, id: &str) {
    w.write_line(&format!("relationship {id}"));
    w.indent();
    if rel.rely_on_integrity {
        w.write_line("relyOnReferentialIntegrity");
    }
    if !rel.is_active {
        w.write_property("isActive", "false");
    }
    if rel.both_directions {
        w.write_property("crossFilteringBehavior", "bothDirections");
    }
    if rel.date_part_only {
        w.write_property("joinOnDateBehavior", "datePartOnly");
    }
    w.write_property(
        "fromColumn",
        &format!("{}.{}", quote_name(&rel.from_table), quote_name(&rel.from_column)),
    );
    w.write_property(
        "toColumn",
        &format!("{}.{}", quote_name(&rel.to_table), quote_name(&rel.to_column)),
    );
    w.blank_line();
    w.write_line(&format!("annotation {GENERATED_BY} = {GENERATOR_NAME}"));
    w.write_line(&format!("annotation {SOURCE_KEY} = {}", rel.source_key));
    w.dedent();
}

/// Render every relationship block.
pub fn render_relationships(
    model: &SchemaModel,
    lineage: &RelationshipLineage,
    index: &ColumnIndex,
) -> RelationshipOutput {
    let mut out = RelationshipOutput::default();
    let mut w = IndentWriter::new();
    let mut written: HashSet<String> = HashSet::new();

    for rel in plan(model, &mut out.repaired) {
        let key = rel.key();
        if let Some(reason) = index
            .missing(&rel.from_table, &rel.from_column)
            .or_else(|| index.missing(&rel.to_table, &rel.to_column))
        {
            warn!(relationship = %key, %reason, "dropping generated relationship");
            out.repaired.push(RepairedRelationship { key, reason });
            continue;
        }
        if !written.insert(key.clone()) {
            continue;
        }
        let id = lineage.resolve(&key, Some(rel.source_key.as_str()));
        w.blank_line();
        write_block(&mut w, &rel, &id);
        out.produced.push(key);
    }

    let date_table = model.date_table.as_ref().map(|d| d.name.to_lowercase());
    for block in lineage.previous() {
        let Some(key) = block.canonical_key() else {
            continue;
        };
        if written.contains(&key) || is_generated(block) {
            continue;
        }
        let Some(((from_table, from_column), (to_table, to_column))) =
            block.from_column.as_ref().zip(block.to_column.as_ref())
        else {
            continue;
        };
        if date_table
            .as_deref()
            .is_some_and(|d| to_table.to_lowercase() == d)
        {
            debug!(relationship = %key, "dropping user relationship into the date table");
            continue;
        }
        if let Some(reason) = index
            .missing(from_table, from_column)
            .or_else(|| index.missing(to_table, to_column))
        {
            warn!(relationship = %key, %reason, "dropping user relationship");
            out.repaired.push(RepairedRelationship { key, reason });
            continue;
        }

        written.insert(key.clone());
        w.blank_line();
        for comment in block.comments.iter().filter(|c| c.as_str() != PRESERVED_MARKER) {
            w.write_line(comment);
        }
        w.write_line(PRESERVED_MARKER);
        w.write_raw(&block.raw);
        out.preserved.push(key);
    }

    out.text = w.into_string();
    out
}
