//! Change analysis between a previous and a newly rendered definition tree.
//!
//! Comparison is structural: tables, columns, measures, relationships and
//! expressions are matched by name, so reordering or whitespace never shows
//! up as a change.

pub mod analyze;
pub mod snapshot;

pub use analyze::{analyze_changes, annotate_repairs, has_breaking};
pub use snapshot::ModelSnapshot;

use serde::Serialize;

/// Kind of model object a change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    Table,
    Column,
    Measure,
    Relationship,
    Expression,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Measure => "measure",
            ObjectKind::Relationship => "relationship",
            ObjectKind::Expression => "expression",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Impact {
    Breaking,
    NonBreaking,
}

/// One entry of the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub object_kind: ObjectKind,
    /// `Table`, `Table.column`, `Table.[measure]` or the relationship key.
    pub object_name: String,
    pub change_type: ChangeType,
    pub impact: Impact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ChangeRecord {
    pub fn new(
        object_kind: ObjectKind,
        object_name: impl Into<String>,
        change_type: ChangeType,
        impact: Impact,
    ) -> Self {
        Self {
            object_kind,
            object_name: object_name.into(),
            change_type,
            impact,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_breaking(&self) -> bool {
        self.impact == Impact::Breaking
    }
}

impl std::fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = match self.change_type {
            ChangeType::Added => '+',
            ChangeType::Removed => '-',
            ChangeType::Modified => '~',
        };
        write!(f, "{} {} {}", sign, self.object_kind, self.object_name)?;
        if self.is_breaking() {
            write!(f, " [breaking]")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}
