//! SQL dialect definitions and formatting rules.
//!
//! Two back ends serve the same source system with different conventions:
//!
//! | Concern | `tds` | `fabric` |
//! |---------|-------|----------|
//! | Table reference | `account` | `[dbo].[account]` |
//! | Column reference | `Base.name` | `Base.[name]` |
//! | Choice labels | `<attr>name` virtual column | joins to label metadata tables |
//! | Multi-select labels | `stringmap` | `OptionsetMetadata` / `GlobalOptionsetMetadata` |
//! | Current user | `CURRENT_USER` | not available |
//! | M connector | `CommonDataService.Database` | `Sql.Database` |
//!
//! # Usage
//!
//! ```ignore
//! use modelsmith::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::FabricLink;
//! let col = dialect.column_ref("Base", "name"); // Base.[name]
//! ```

mod fabric;
pub mod helpers;
mod tds;

pub use fabric::FabricLink;
pub use tds::DataverseTds;

use serde::{Deserialize, Serialize};

use crate::schema::AttributeSpec;

/// Label resolution for a single-valued choice column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceLabel {
    /// Expression selecting the label.
    pub expr: String,
    /// Join clause the expression depends on, if any.
    pub join: Option<String>,
}

/// SQL dialect trait - defines how dialect-specific SQL is rendered.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier used as a column alias.
    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    /// Quote a string literal; non-ASCII text gets the `N'...'` prefix.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_tsql(s)
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Reference a source table by logical name.
    fn table_ref(&self, table: &str) -> String;

    /// Reference a column through a table alias.
    fn column_ref(&self, alias: &str, column: &str) -> String;

    /// Reference the display-name companion column of a lookup.
    fn lookup_name_ref(&self, alias: &str, attribute: &str) -> String {
        self.column_ref(alias, &format!("{attribute}name"))
    }

    // =========================================================================
    // Choice labels
    // =========================================================================

    /// Label expression (and join) for a Picklist/State/Status column.
    fn choice_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> ChoiceLabel;

    /// Correlated sub-select joining a multi-select value's labels with `; `.
    ///
    /// The stored value is split on `;`, never `,`.
    fn multi_select_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> String;

    // =========================================================================
    // Identity
    // =========================================================================

    /// Native "current user" construct, if the back end has one.
    fn current_user(&self) -> Option<&'static str> {
        None
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Power Query expression that opens the connection.
    fn connector_source(&self) -> &'static str;
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// Dataverse TDS endpoint.
    #[default]
    #[serde(rename = "tds", alias = "DataverseTds")]
    DataverseTds,
    /// Fabric Link lakehouse SQL analytics endpoint.
    #[serde(rename = "fabric", alias = "FabricLink")]
    FabricLink,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DataverseTds => &DataverseTds,
            Dialect::FabricLink => &FabricLink,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tds" | "dataverse" | "dataversetds" => Some(Dialect::DataverseTds),
            "fabric" | "fabriclink" | "lakehouse" => Some(Dialect::FabricLink),
            _ => None,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn table_ref(&self, table: &str) -> String {
        self.dialect().table_ref(table)
    }

    fn column_ref(&self, alias: &str, column: &str) -> String {
        self.dialect().column_ref(alias, column)
    }

    fn lookup_name_ref(&self, alias: &str, attribute: &str) -> String {
        self.dialect().lookup_name_ref(alias, attribute)
    }

    fn choice_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> ChoiceLabel {
        self.dialect()
            .choice_label(alias, table, attribute, language_code)
    }

    fn multi_select_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> String {
        self.dialect()
            .multi_select_label(alias, table, attribute, language_code)
    }

    fn current_user(&self) -> Option<&'static str> {
        self.dialect().current_user()
    }

    fn connector_source(&self) -> &'static str {
        self.dialect().connector_source()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
