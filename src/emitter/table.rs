//! Table file rendering.

use tracing::debug;

use crate::build::paths::table_file;
use crate::fetchxml::{translate, TranslateOptions};
use crate::lineage::{
    column_key, logical_column_key, measure_key, LineageStore, TableLineage, SOURCE_LOGICAL_NAME,
    SUMMARIZATION_SET_BY, TABLE_KEY,
};
use crate::schema::{SchemaModel, TableSpec};
use crate::tmdl::format::quote_name;
use crate::tmdl::IndentWriter;

use super::column::{plan_columns, ColumnPlan};
use super::measure::{auto_measure_names, auto_measures, write_auto_measure};
use super::partition::{build_query, write_partition};
use super::{EmitResult, RenderedTable};

/// Render one table file.
pub fn render_table(
    model: &SchemaModel,
    lineage: &LineageStore,
    table: &TableSpec,
) -> EmitResult<RenderedTable> {
    let path = table_file(&table.display_name)?;
    let previous = lineage.table(&table.logical_name, &table.display_name);
    let dialect = model.connection.dialect;
    let mode = table.effective_storage_mode(model.storage_mode);

    let options = TranslateOptions::new(dialect)
        .materialized(mode.is_materialized())
        .with_utc_offset(model.utc_offset_minutes);
    let translation = translate(table.filter.as_deref().unwrap_or(""), &options);
    let notices: Vec<String> = translation
        .unsupported
        .iter()
        .map(|u| format!("{}: {u}", table.display_name))
        .collect();

    let planned = plan_columns(model, table);
    let sql = build_query(
        dialect,
        table,
        &planned,
        translation.and_with(table.baseline_filter.as_deref()),
    )
    .to_sql(dialect);

    let mut w = IndentWriter::new();
    w.write_comment(&format!("source: {}", table.logical_name));
    w.write_line(&format!("table {}", quote_name(&table.display_name)));
    w.indent();
    w.write_property("lineageTag", &previous.resolve(TABLE_KEY, None));
    w.blank_line();

    let old_auto_names = previous
        .previous_display_name()
        .map(auto_measure_names)
        .unwrap_or_default();
    for (i, measure) in auto_measures(model, table).iter().enumerate() {
        let fallback = old_auto_names.get(i).map(|n| measure_key(n));
        let tag = previous.resolve(&measure_key(&measure.name), fallback.as_deref());
        write_auto_measure(&mut w, measure, &tag);
        w.blank_line();
    }

    for column in &planned.columns {
        write_column(&mut w, column, previous);
        w.blank_line();
    }

    let mut excluded = auto_measure_names(&table.display_name);
    excluded.extend(old_auto_names);
    let user_measures = previous.user_measures(&excluded);
    for measure in &user_measures {
        w.write_raw(&measure.raw);
        w.blank_line();
    }

    write_partition(&mut w, &table.display_name, mode, dialect, &sql);
    w.blank_line();
    w.write_line("annotation PBI_ResultType = Table");

    debug!(
        table = %table.display_name,
        columns = planned.columns.len(),
        user_measures = user_measures.len(),
        "rendered table"
    );

    Ok(RenderedTable {
        logical_name: table.logical_name.clone(),
        display_name: table.display_name.clone(),
        path,
        text: w.into_string(),
        columns: planned.names(),
        notices,
    })
}

/// Write one column block, merging preserved metadata.
pub(crate) fn write_column(w: &mut IndentWriter, column: &ColumnPlan, lineage: &TableLineage) {
    let preserved = lineage.column_metadata(&column.name, Some(column.logical.as_str()));

    let description = column
        .description
        .clone()
        .or_else(|| preserved.and_then(|m| m.description.clone()));
    if let Some(description) = description {
        w.write_description(&description);
    }

    w.write_line(&format!("column {}", quote_name(&column.name)));
    w.indent();
    w.write_property("dataType", column.data_type.as_tmdl());
    if column.hidden {
        w.write_line("isHidden");
    }

    let format = column
        .format_override
        .clone()
        .or_else(|| preserved.and_then(|m| m.format_string.clone()))
        .or_else(|| column.format_string.clone());
    if let Some(format) = format {
        w.write_property("formatString", &format);
    }

    let tag = lineage.resolve(
        &column_key(&column.name),
        Some(logical_column_key(&column.logical).as_str()),
    );
    w.write_property("lineageTag", &tag);

    let default_summarize = column.summarize.as_tmdl();
    let summarize = preserved
        .and_then(|m| m.summarize_by.as_deref())
        .unwrap_or(default_summarize);
    w.write_property("summarizeBy", summarize);
    w.write_property("sourceColumn", &column.name);
    w.blank_line();

    w.write_line(&format!("annotation {SOURCE_LOGICAL_NAME} = {}", column.logical));
    let set_by = if summarize == default_summarize {
        "Automatic"
    } else {
        "User"
    };
    w.write_line(&format!("annotation {SUMMARIZATION_SET_BY} = {set_by}"));
    if let Some(meta) = preserved {
        for (name, value) in &meta.annotations {
            w.write_line(&format!("annotation {} = {value}", quote_name(name)));
        }
    }
    w.dedent();
}
