//! Dialect-specific connection artifacts.
//!
//! `tds` reads the environment host from a hidden single-row parameter
//! table; `fabric` declares endpoint and database as shared expressions.

use crate::build::paths::table_file;
use crate::lineage::{column_key, LineageStore, PARAMETER_MARKER, TABLE_KEY};
use crate::schema::SchemaModel;
use crate::sql::Dialect;
use crate::tmdl::format::{m_string, quote_name};
use crate::tmdl::IndentWriter;

use super::{EmitResult, RenderedTable};

/// Hidden parameter table used by the `tds` connector.
pub const PARAMETER_TABLE: &str = "DataverseURL";

/// Shared expression holding the SQL endpoint host.
pub const ENDPOINT_EXPRESSION: &str = "FabricSQLEndpoint";

/// Shared expression holding the lakehouse database name.
pub const DATABASE_EXPRESSION: &str = "FabricLakehouse";

fn parameter_query(value: &str) -> String {
    format!(
        "{} meta [IsParameterQuery=true, Type=\"Text\", IsParameterQueryRequired=true]",
        m_string(value)
    )
}

/// `tables/DataverseURL.tmdl`.
pub fn render_parameter_table(
    model: &SchemaModel,
    lineage: &LineageStore,
) -> EmitResult<RenderedTable> {
    let previous = lineage.table(PARAMETER_MARKER, PARAMETER_TABLE);
    let name = quote_name(PARAMETER_TABLE);

    let mut w = IndentWriter::new();
    w.write_comment(&format!("source: {PARAMETER_MARKER}"));
    w.write_line(&format!("table {name}"));
    w.indent();
    w.write_line("isHidden");
    w.write_property("lineageTag", &previous.resolve(TABLE_KEY, None));
    w.blank_line();

    w.write_line(&format!("column {name}"));
    w.indent();
    w.write_property("dataType", "string");
    w.write_line("isHidden");
    w.write_property("lineageTag", &previous.resolve(&column_key(PARAMETER_TABLE), None));
    w.write_property("summarizeBy", "none");
    w.write_property("sourceColumn", PARAMETER_TABLE);
    w.blank_line();
    w.write_line("annotation SummarizationSetBy = Automatic");
    w.dedent();
    w.blank_line();

    w.write_line(&format!("partition {name} = m"));
    w.indent();
    w.write_property("mode", "import");
    w.write_line(&format!(
        "source = {}",
        parameter_query(model.connection.environment_host())
    ));
    w.dedent();
    w.blank_line();

    w.write_line("annotation PBI_ResultType = Text");
    w.write_line("annotation PBI_NavigationStepName = Navigation");

    Ok(RenderedTable {
        logical_name: PARAMETER_MARKER.to_string(),
        display_name: PARAMETER_TABLE.to_string(),
        path: table_file(PARAMETER_TABLE)?,
        text: w.into_string(),
        columns: vec![PARAMETER_TABLE.to_string()],
        notices: Vec::new(),
    })
}

fn write_expression(w: &mut IndentWriter, name: &str, value: &str, lineage_tag: &str) {
    w.write_line(&format!(
        "expression {} = {}",
        quote_name(name),
        parameter_query(value)
    ));
    w.indent();
    w.write_property("lineageTag", lineage_tag);
    w.blank_line();
    w.write_line("annotation PBI_ResultType = Text");
    w.dedent();
}

/// `expressions.tmdl`: managed expressions for `fabric`, then any user
/// expressions from the previous file. `None` when there is nothing to write.
pub fn render_expressions(model: &SchemaModel, lineage: &LineageStore) -> Option<String> {
    let mut w = IndentWriter::new();
    let managed = [ENDPOINT_EXPRESSION, DATABASE_EXPRESSION];

    if model.connection.dialect == Dialect::FabricLink {
        let endpoint = model.connection.sql_endpoint.as_deref().unwrap_or_default();
        let database = model.connection.database.as_deref().unwrap_or_default();
        for (name, value) in [(ENDPOINT_EXPRESSION, endpoint), (DATABASE_EXPRESSION, database)] {
            w.blank_line();
            write_expression(&mut w, name, value, &lineage.resolve_expression(name));
        }
    }

    for expr in lineage.previous_expressions() {
        if managed.contains(&expr.name.as_str()) {
            continue;
        }
        w.blank_line();
        w.write_raw(&expr.raw);
    }

    let text = w.into_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
