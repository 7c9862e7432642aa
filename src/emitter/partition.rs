//! Partition query and its Power Query wrapper.

use crate::fetchxml::BASE_ALIAS;
use crate::schema::{StorageMode, TableSpec};
use crate::sql::{Dialect, Query, SelectExpr, SqlDialect};
use crate::tmdl::format::{m_string, quote_name};
use crate::tmdl::IndentWriter;

use super::column::PlannedColumns;

/// The native query behind a table's partition.
pub fn build_query(
    dialect: Dialect,
    table: &TableSpec,
    planned: &PlannedColumns,
    where_clause: Option<String>,
) -> Query {
    let mut query = Query::new().from(format!(
        "{} AS {BASE_ALIAS}",
        dialect.table_ref(&table.logical_name)
    ));
    for column in &planned.columns {
        query = query.column(SelectExpr::new(column.sql.as_str()).with_alias(&column.name));
    }
    for join in &planned.lookup_joins {
        query = query.left_join(join.table.as_str(), join.on.as_str());
    }
    for join in planned.columns.iter().filter_map(|c| c.join.as_deref()) {
        query = query.raw_join(join);
    }
    if let Some(clause) = where_clause {
        query = query.filter(clause);
    }
    query
}

/// Write an M partition at the writer's current level.
pub fn write_partition(
    w: &mut IndentWriter,
    name: &str,
    mode: StorageMode,
    dialect: Dialect,
    sql: &str,
) {
    w.write_line(&format!("partition {} = m", quote_name(name)));
    w.indent();
    w.write_property("mode", mode.as_tmdl());
    w.write_line("source =");
    w.indent();
    w.indent();
    w.write_line("let");
    w.write_line(&format!("    Source = {},", dialect.connector_source()));
    w.write_line(&format!(
        "    Query = Value.NativeQuery(Source, {}, null, [EnableFolding=true])",
        m_string(sql)
    ));
    w.write_line("in");
    w.write_line("    Query");
    w.dedent();
    w.dedent();
    w.dedent();
}
