//! Fabric Link lakehouse dialect.
//!
//! Tables are replicated into a lakehouse and queried through its SQL
//! analytics endpoint. Virtual label columns do not exist there, so choice
//! labels are joined from the replicated metadata tables.

use super::helpers;
use super::{ChoiceLabel, SqlDialect};
use crate::schema::{AttributeKind, AttributeSpec};

/// Fabric Link lakehouse dialect.
#[derive(Debug, Clone, Copy)]
pub struct FabricLink;

const SCHEMA: &str = "dbo";

impl FabricLink {
    fn metadata_table(&self, name: &str) -> String {
        format!(
            "{}.{}",
            helpers::quote_bracket(SCHEMA),
            helpers::quote_bracket(name)
        )
    }
}

impl SqlDialect for FabricLink {
    fn name(&self) -> &'static str {
        "fabric"
    }

    fn table_ref(&self, table: &str) -> String {
        format!(
            "{}.{}",
            helpers::quote_bracket(SCHEMA),
            helpers::quote_bracket(table)
        )
    }

    fn column_ref(&self, alias: &str, column: &str) -> String {
        format!("{alias}.{}", helpers::quote_bracket(column))
    }

    fn choice_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> ChoiceLabel {
        let label_alias = if alias == crate::fetchxml::BASE_ALIAS {
            format!("cl_{}", attribute.logical_name)
        } else {
            format!("cl_{alias}_{}", attribute.logical_name)
        };
        let source = self.column_ref(alias, &attribute.logical_name);
        let entity = self.quote_string(table);

        let (metadata, key_predicate) = match attribute.kind {
            AttributeKind::State => (
                "StateMetadata",
                format!(
                    "{la}.[EntityName] = {entity} AND {la}.[State] = {source}",
                    la = label_alias
                ),
            ),
            AttributeKind::Status => (
                "StatusMetadata",
                format!(
                    "{la}.[EntityName] = {entity} AND {la}.[Status] = {source}",
                    la = label_alias
                ),
            ),
            _ if attribute.is_global_option_set => (
                "GlobalOptionsetMetadata",
                format!(
                    "{la}.[OptionSetName] = {set} AND {la}.[Option] = {source}",
                    la = label_alias,
                    set = self.quote_string(attribute.choice_set_key()),
                ),
            ),
            _ => (
                "OptionsetMetadata",
                format!(
                    "{la}.[EntityName] = {entity} AND {la}.[OptionSetName] = {set} AND {la}.[Option] = {source}",
                    la = label_alias,
                    set = self.quote_string(attribute.choice_set_key()),
                ),
            ),
        };

        ChoiceLabel {
            expr: format!("{label_alias}.[LocalizedLabel]"),
            join: Some(format!(
                "LEFT JOIN {} AS {label_alias} ON {key_predicate} AND {label_alias}.[LocalizedLabelLanguageCode] = {language_code}",
                self.metadata_table(metadata)
            )),
        }
    }

    fn multi_select_label(
        &self,
        alias: &str,
        table: &str,
        attribute: &AttributeSpec,
        language_code: u32,
    ) -> String {
        let set = self.quote_string(attribute.choice_set_key());
        let (metadata, scope) = if attribute.is_global_option_set {
            ("GlobalOptionsetMetadata", format!("m.[OptionSetName] = {set}"))
        } else {
            (
                "OptionsetMetadata",
                format!(
                    "m.[EntityName] = {} AND m.[OptionSetName] = {set}",
                    self.quote_string(table)
                ),
            )
        };
        let on = format!(
            "{scope} AND m.[Option] = TRY_CAST(v.value AS INT) AND m.[LocalizedLabelLanguageCode] = {language_code}"
        );
        helpers::multi_select_subquery(
            &self.column_ref(alias, &attribute.logical_name),
            &format!("{} AS m", self.metadata_table(metadata)),
            "m.[LocalizedLabel]",
            &on,
        )
    }

    fn connector_source(&self) -> &'static str {
        "Sql.Database(FabricSQLEndpoint, FabricLakehouse)"
    }
}
