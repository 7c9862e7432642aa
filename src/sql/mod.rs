//! SQL generation module.
//!
//! - [`query`] - SELECT query builder used for partition queries
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod query;

// Re-export commonly used types at the sql module level
pub use dialect::{ChoiceLabel, Dialect, SqlDialect};
pub use query::{Join, Query, SelectExpr};
