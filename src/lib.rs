//! # Modelsmith
//!
//! Generates stable, mergeable TMDL semantic model definitions from
//! relational schema metadata.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Metadata dictionary (JSON) + modelsmith.toml      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema::loader]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     SchemaModel                          │
//! │  (tables, attributes, relationships, date table)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validation]
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  previous definition     │──>│      LineageStore        │
//! │  tree (tmdl reader)      │   │  (identifiers, metadata) │
//! └──────────────────────────┘   └──────────────────────────┘
//!                          │
//!                          ▼ [emitter + fetchxml + sql]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 new DefinitionTree                       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [diff]  preview, then [build] apply
//! ┌─────────────────────────────────────────────────────────┐
//! │          tables/*.tmdl, relationships.tmdl, ...          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod build;
pub mod config;
pub mod diff;
pub mod emitter;
pub mod fetchxml;
pub mod lineage;
pub mod schema;
pub mod sql;
pub mod tmdl;
pub mod validation;

pub use build::{Analyzed, ApplyReport, BuildError, BuildOptions, Builder};
pub use diff::ChangeRecord;
pub use schema::SchemaModel;
