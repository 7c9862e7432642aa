//! Dataverse TDS endpoint dialect.
//!
//! The TDS endpoint is a read-only T-SQL surface over the live environment:
//! - Bare logical table and column names
//! - `<attr>name` virtual columns carry lookup display names and choice labels
//! - Multi-select labels come from the `stringmap` table
//! - `CURRENT_USER` resolves to the calling user's id

use super::helpers;
use super::{ChoiceLabel, SqlDialect};
use crate::schema::AttributeSpec;

/// Dataverse TDS endpoint dialect.
#[derive(Debug, Clone, Copy)]
pub struct DataverseTds;

impl SqlDialect for DataverseTds {
    fn name(&self) -> &'static str {
        "tds"
    }

    fn table_ref(&self, table: &str) -> String {
        helpers::quote_bracket_if_needed(table)
    }

    fn column_ref(&self, alias: &str, column: &str) -> String {
        format!("{alias}.{}", helpers::quote_bracket_if_needed(column))
    }

    fn choice_label(
        &self,
        alias: &str,
        _table: &str,
        attribute: &AttributeSpec,
        _language_code: u32,
    ) -> ChoiceLabel {
        ChoiceLabel {
            expr: self.lookup_name_ref(alias, &attribute.logical_name),
            join: None,
        }
    }

    fn multi_select_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> String {
        let on = format!(
            "sm.objecttypecode = {} AND sm.attributename = {} AND sm.attributevalue = TRY_CAST(v.value AS INT) AND sm.langid = {language_code}",
            self.quote_string(table),
            self.quote_string(&attribute.logical_name),
        );
        helpers::multi_select_subquery(
            &self.column_ref(alias, &attribute.logical_name),
            "stringmap AS sm",
            "sm.value",
            &on,
        )
    }

    fn current_user(&self) -> Option<&'static str> {
        Some("CURRENT_USER")
    }

    fn connector_source(&self) -> &'static str {
        "CommonDataService.Database(DataverseURL)"
    }
}
