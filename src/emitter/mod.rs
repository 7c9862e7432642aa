//! Definition tree generation.
//!
//! Every generator is a pure function from the Schema Model and the shared
//! [`LineageStore`] snapshot to owned text:
//!
//! ```text
//! SchemaModel ─┬─> table::render_table (per table, parallel) ─┐
//!              ├─> date_table / connection artifacts ──────────┼─> DefinitionTree
//! LineageStore ┴─> relationship::render_relationships ────────┘
//! ```
//!
//! Relationships are rendered last because the repair pass needs every
//! table's final column set.

pub mod column;
pub mod connection;
pub mod date_table;
pub mod measure;
pub mod partition;
pub mod relationship;
pub mod table;

pub use relationship::{ColumnIndex, RepairedRelationship, PRESERVED_MARKER};

use tracing::{debug, info};

use crate::build::paths::{PathError, EXPRESSIONS_FILE, RELATIONSHIPS_FILE};
use crate::build::tree::DefinitionTree;
use crate::lineage::LineageStore;
use crate::schema::{SchemaModel, TableSpec};
use crate::sql::Dialect;

/// Error type for generation.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Unsafe output name: {0}")]
    Path(#[from] PathError),

    #[error("Two tables would be written to {0}")]
    DuplicatePath(String),
}

pub type EmitResult<T> = Result<T, EmitError>;

/// One rendered table file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    pub logical_name: String,
    pub display_name: String,
    /// Tree-relative path.
    pub path: String,
    pub text: String,
    /// Final column names, for the repair pass.
    pub columns: Vec<String>,
    /// Unsupported filter constructs, one line each.
    pub notices: Vec<String>,
}

/// Everything one generation run produces.
#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
    pub tree: DefinitionTree,
    /// Previous table files without a `source:` marker, carried over verbatim.
    pub carried_over: Vec<String>,
    /// Previous generated table files this run no longer produces.
    pub stale: Vec<String>,
    pub produced_relationships: Vec<String>,
    pub preserved_relationships: Vec<String>,
    pub repaired: Vec<RepairedRelationship>,
    pub notices: Vec<String>,
}

fn render_tables(
    model: &SchemaModel,
    lineage: &LineageStore,
    tables: &[&TableSpec],
) -> EmitResult<Vec<RenderedTable>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        tables
            .par_iter()
            .map(|t| table::render_table(model, lineage, t))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        tables
            .iter()
            .map(|t| table::render_table(model, lineage, t))
            .collect()
    }
}

/// Render the full definition tree.
///
/// `previous` must be the tree `lineage` was loaded from.
pub fn render_model(
    model: &SchemaModel,
    previous: &DefinitionTree,
    lineage: &LineageStore,
) -> EmitResult<ModelOutput> {
    let mut tables: Vec<&TableSpec> = model.tables.iter().collect();
    tables.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    let mut rendered = render_tables(model, lineage, &tables)?;
    if let Some(date) = &model.date_table {
        rendered.push(date_table::render_date_table(date, lineage)?);
    }
    if model.connection.dialect == Dialect::DataverseTds {
        rendered.push(connection::render_parameter_table(model, lineage)?);
    }

    let mut out = ModelOutput::default();
    let mut index = ColumnIndex::new();
    for table in rendered {
        if out.tree.contains(&table.path) {
            return Err(EmitError::DuplicatePath(table.path));
        }
        index.add_table(&table.display_name, &table.columns);
        out.notices.extend(table.notices);
        out.tree.insert(table.path, table.text);
    }

    for prev in lineage.previous_tables() {
        if out.tree.contains(&prev.path) {
            continue;
        }
        if prev.marker.is_some() {
            out.stale.push(prev.path.clone());
        } else if let Some(text) = previous.get(&prev.path) {
            debug!(path = %prev.path, "carrying over user table");
            index.add_table(&prev.name, &prev.columns);
            out.tree.insert(prev.path.clone(), text);
            out.carried_over.push(prev.path.clone());
        }
    }

    let relationships = relationship::render_relationships(model, lineage.relationships(), &index);
    out.tree.insert(RELATIONSHIPS_FILE, relationships.text);
    out.produced_relationships = relationships.produced;
    out.preserved_relationships = relationships.preserved;
    out.repaired = relationships.repaired;

    if let Some(text) = connection::render_expressions(model, lineage) {
        out.tree.insert(EXPRESSIONS_FILE, text);
    }

    info!(
        files = out.tree.len(),
        relationships = out.produced_relationships.len(),
        preserved = out.preserved_relationships.len(),
        repaired = out.repaired.len(),
        "model rendered"
    );
    Ok(out)
}
