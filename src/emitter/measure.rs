//! Auto-generated measures.
//!
//! Fact tables get a row count and a record link. Both are rebuilt on every
//! run and never treated as user content.

use crate::schema::{SchemaModel, TableSpec};
use crate::tmdl::format::{dax_column_ref, dax_string, quote_name, quote_table_ref};
use crate::tmdl::IndentWriter;

/// A measure the generator owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoMeasure {
    pub name: String,
    pub expression: String,
    pub format_string: Option<&'static str>,
    pub data_category: Option<&'static str>,
}

pub fn count_measure_name(display: &str) -> String {
    format!("{display} Count")
}

pub fn link_measure_name(display: &str) -> String {
    format!("Link to {display}")
}

/// Names of the auto measures for a table shown as `display`, in emit order.
pub fn auto_measure_names(display: &str) -> Vec<String> {
    vec![count_measure_name(display), link_measure_name(display)]
}

/// Auto measures for `table`; empty for dimensions.
pub fn auto_measures(model: &SchemaModel, table: &TableSpec) -> Vec<AutoMeasure> {
    if !table.is_fact() {
        return Vec::new();
    }
    let display = &table.display_name;
    let url = format!(
        "{}/main.aspx?pagetype=entityrecord&etn={}&id=",
        model.connection.environment_url.trim_end_matches('/'),
        table.logical_name
    );
    vec![
        AutoMeasure {
            name: count_measure_name(display),
            expression: format!("COUNTROWS({})", quote_table_ref(display)),
            format_string: Some("0"),
            data_category: None,
        },
        AutoMeasure {
            name: link_measure_name(display),
            expression: format!(
                "{} & SELECTEDVALUE({})",
                dax_string(&url),
                dax_column_ref(display, &table.primary_id_attribute)
            ),
            format_string: None,
            data_category: Some("WebUrl"),
        },
    ]
}

/// Write one auto measure at the writer's current level.
pub fn write_auto_measure(w: &mut IndentWriter, measure: &AutoMeasure, lineage_tag: &str) {
    w.write_line(&format!(
        "measure {} = {}",
        quote_name(&measure.name),
        measure.expression
    ));
    w.indent();
    if let Some(format) = measure.format_string {
        w.write_property("formatString", format);
    }
    w.write_property("lineageTag", lineage_tag);
    if let Some(category) = measure.data_category {
        w.write_property("dataCategory", category);
    }
    w.dedent();
}
