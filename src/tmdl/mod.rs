//! TMDL text: formatting helpers for writing and a lightweight reader for
//! previously generated files.

pub mod document;
pub mod format;

pub use document::{
    canonical_relationship_key, parse_document, ColumnBlock, ExpressionBlock, MeasureBlock,
    RelationshipBlock, TableBlock, TmdlDocument, SOURCE_MARKER,
};
pub use format::{quote_name, IndentWriter};
