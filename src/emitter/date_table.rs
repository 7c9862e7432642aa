//! Generated calendar table.

use crate::build::paths::table_file;
use crate::lineage::{column_key, LineageStore, DATE_MARKER, TABLE_KEY};
use crate::schema::DateTableSpec;
use crate::tmdl::format::quote_name;
use crate::tmdl::IndentWriter;

use super::relationship::DATE_KEY_COLUMN;
use super::{EmitResult, RenderedTable};

struct DateColumn {
    name: &'static str,
    data_type: &'static str,
    format_string: Option<&'static str>,
    /// DAX expression added to the calendar, `None` for the key.
    expression: Option<&'static str>,
    sort_by: Option<&'static str>,
}

const COLUMNS: &[DateColumn] = &[
    DateColumn {
        name: DATE_KEY_COLUMN,
        data_type: "dateTime",
        format_string: Some("Short Date"),
        expression: None,
        sort_by: None,
    },
    DateColumn {
        name: "Year",
        data_type: "int64",
        format_string: Some("0"),
        expression: Some("YEAR([Date])"),
        sort_by: None,
    },
    DateColumn {
        name: "Quarter",
        data_type: "string",
        format_string: None,
        expression: Some("\"Q\" & QUARTER([Date])"),
        sort_by: None,
    },
    DateColumn {
        name: "Month Number",
        data_type: "int64",
        format_string: Some("0"),
        expression: Some("MONTH([Date])"),
        sort_by: None,
    },
    DateColumn {
        name: "Month",
        data_type: "string",
        format_string: None,
        expression: Some("FORMAT([Date], \"MMMM\")"),
        sort_by: Some("Month Number"),
    },
    DateColumn {
        name: "Day",
        data_type: "int64",
        format_string: Some("0"),
        expression: Some("DAY([Date])"),
        sort_by: None,
    },
];

/// Render the calendar table described by `spec`.
pub fn render_date_table(spec: &DateTableSpec, lineage: &LineageStore) -> EmitResult<RenderedTable> {
    let path = table_file(&spec.name)?;
    let previous = lineage.table(DATE_MARKER, &spec.name);

    let mut w = IndentWriter::new();
    w.write_comment(&format!("source: {DATE_MARKER}"));
    w.write_line(&format!("table {}", quote_name(&spec.name)));
    w.indent();
    w.write_property("lineageTag", &previous.resolve(TABLE_KEY, None));
    w.write_property("dataCategory", "Time");
    w.blank_line();

    for column in COLUMNS {
        w.write_line(&format!("column {}", quote_name(column.name)));
        w.indent();
        w.write_property("dataType", column.data_type);
        if column.expression.is_none() {
            w.write_line("isKey");
        }
        if let Some(format) = column.format_string {
            w.write_property("formatString", format);
        }
        w.write_property("lineageTag", &previous.resolve(&column_key(column.name), None));
        w.write_property("summarizeBy", "none");
        w.write_property("sourceColumn", &format!("[{}]", column.name));
        if let Some(sort_by) = column.sort_by {
            w.write_property("sortByColumn", &quote_name(sort_by));
        }
        w.blank_line();
        w.write_line("annotation SummarizationSetBy = Automatic");
        w.dedent();
        w.blank_line();
    }

    for measure in previous.user_measures(&[]) {
        w.write_raw(&measure.raw);
        w.blank_line();
    }

    w.write_line(&format!("partition {} = calculated", quote_name(&spec.name)));
    w.indent();
    w.write_property("mode", "import");
    w.write_line("source =");
    w.indent();
    w.indent();
    w.write_line("ADDCOLUMNS(");
    w.write_line(&format!(
        "    CALENDAR(DATE({}, 1, 1), DATE({}, 12, 31)),",
        spec.start_year, spec.end_year
    ));
    let added: Vec<&DateColumn> = COLUMNS.iter().filter(|c| c.expression.is_some()).collect();
    for (i, column) in added.iter().enumerate() {
        let sep = if i + 1 == added.len() { "" } else { "," };
        w.write_line(&format!(
            "    \"{}\", {}{sep}",
            column.name,
            column.expression.unwrap_or_default()
        ));
    }
    w.write_line(")");
    w.dedent();
    w.dedent();
    w.dedent();
    w.blank_line();
    w.write_line("annotation PBI_ResultType = Table");

    Ok(RenderedTable {
        logical_name: DATE_MARKER.to_string(),
        display_name: spec.name.clone(),
        path,
        text: w.into_string(),
        columns: COLUMNS.iter().map(|c| c.name.to_string()).collect(),
        notices: Vec::new(),
    })
}
