//! Column planning: which physical columns a table produces and how each is
//! selected.
//!
//! | Kind | Columns |
//! |------|---------|
//! | primary key | `<logical>`, hidden |
//! | plain | display name, typed per kind |
//! | Picklist / State / Status | display name, label resolved per dialect |
//! | MultiSelectPicklist | display name, labels joined with `; ` |
//! | Lookup / Owner / Customer | id `<logical>`, name, `<Display> Type`, `<Display> Phonetic Name` per config |
//! | expanded lookup | `<Lookup Display> <Column Display>` through `LEFT JOIN ... AS x_<lookup>` |
//!
//! Companion attributes whose `AttributeOf` names an attribute of the same
//! table are folded into their owner, wherever they appear in the list.

use std::collections::HashSet;

use crate::fetchxml::BASE_ALIAS;
use crate::schema::{AttributeKind, AttributeSpec, LookupColumnConfig, SchemaModel, TableSpec};
use crate::sql::{Dialect, Join, SqlDialect};

const MONEY_FORMAT: &str = r"\$#,0.00;(\$#,0.00);\$#,0.00";

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Int64,
    Decimal,
    Double,
    DateTime,
    Boolean,
}

impl DataType {
    pub fn as_tmdl(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int64 => "int64",
            DataType::Decimal => "decimal",
            DataType::Double => "double",
            DataType::DateTime => "dateTime",
            DataType::Boolean => "boolean",
        }
    }
}

/// Default aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summarize {
    None,
    Sum,
}

impl Summarize {
    pub fn as_tmdl(&self) -> &'static str {
        match self {
            Summarize::None => "none",
            Summarize::Sum => "sum",
        }
    }
}

/// One physical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    /// Column name; also the SQL alias and `sourceColumn`.
    pub name: String,
    /// Logical sub-column name, written as `SourceLogicalName`.
    pub logical: String,
    pub data_type: DataType,
    pub hidden: bool,
    /// Default format string for the type.
    pub format_string: Option<String>,
    pub summarize: Summarize,
    /// Select expression.
    pub sql: String,
    /// Join the select expression depends on.
    pub join: Option<String>,
    /// Caller-supplied description, wins over a preserved one.
    pub description: Option<String>,
    /// Caller-supplied format string, wins over a preserved one.
    pub format_override: Option<String>,
}

impl ColumnPlan {
    fn new(name: impl Into<String>, logical: impl Into<String>, data_type: DataType, sql: String) -> Self {
        Self {
            name: name.into(),
            logical: logical.into(),
            data_type,
            hidden: false,
            format_string: None,
            summarize: Summarize::None,
            sql,
            join: None,
            description: None,
            format_override: None,
        }
    }

    fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    fn numeric(mut self, format: Option<&str>) -> Self {
        self.format_string = format.map(str::to_string);
        self.summarize = Summarize::Sum;
        self
    }

    fn overrides_from(mut self, attr: &AttributeSpec) -> Self {
        self.description = attr.description.clone();
        self.format_override = attr.format_string.clone();
        self
    }
}

/// Columns of one table plus the lookup joins they need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannedColumns {
    pub columns: Vec<ColumnPlan>,
    pub lookup_joins: Vec<Join>,
}

impl PlannedColumns {
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Where values are selected from.
#[derive(Debug, Clone, Copy)]
struct Source<'a> {
    dialect: Dialect,
    table: &'a str,
    alias: &'a str,
    language_code: u32,
    utc_offset_minutes: i32,
}

impl Source<'_> {
    fn column(&self, name: &str) -> String {
        self.dialect.column_ref(self.alias, name)
    }
}

/// Plan every column of `table`.
pub fn plan_columns(model: &SchemaModel, table: &TableSpec) -> PlannedColumns {
    let source = Source {
        dialect: model.connection.dialect,
        table: &table.logical_name,
        alias: BASE_ALIAS,
        language_code: model.language_code,
        utc_offset_minutes: model.utc_offset_minutes,
    };
    let mut out = PlannedColumns::default();

    let pk = &table.primary_id_attribute;
    let pk_hidden = lookup_config(table, pk).map_or(true, |c| c.id_hidden);
    let mut pk_column = ColumnPlan::new(pk.as_str(), pk.as_str(), DataType::String, source.column(pk))
        .hidden(pk_hidden);
    if let Some(attr) = table.attribute(pk) {
        pk_column = pk_column.overrides_from(attr);
    }
    out.columns.push(pk_column);

    let owners: HashSet<String> = table
        .attributes
        .iter()
        .map(|a| a.logical_name.to_ascii_lowercase())
        .collect();
    let required = model.required_lookup_attributes(table);

    for attr in &table.attributes {
        if attr.logical_name.eq_ignore_ascii_case(pk) || attr.kind.is_skipped() {
            continue;
        }
        let folded = attr.attribute_of.as_deref().is_some_and(|owner| {
            !owner.eq_ignore_ascii_case(&attr.logical_name)
                && owners.contains(&owner.to_ascii_lowercase())
        });
        if folded {
            continue;
        }

        if attr.kind.is_reference() {
            let mut config = lookup_config(table, &attr.logical_name).unwrap_or_default();
            if required.contains(&attr.logical_name.to_ascii_lowercase()) {
                config = config.with_required_id();
            }
            reference_columns(&source, attr, config, &mut out.columns);
        } else {
            out.columns.push(
                value_column(&source, attr, attr.display_name.as_str(), attr.logical_name.as_str())
                    .overrides_from(attr),
            );
        }
    }

    for expanded in &table.expanded_lookups {
        let alias = expanded.join_alias();
        let lookup_display = table
            .attribute(&expanded.lookup_attribute)
            .map_or(expanded.lookup_attribute.as_str(), |a| a.display_name.as_str());

        out.lookup_joins.push(Join {
            table: format!("{} AS {alias}", source.dialect.table_ref(&expanded.target_table)),
            on: format!(
                "{} = {}",
                source.dialect.column_ref(&alias, &expanded.target_key()),
                source.column(&expanded.lookup_attribute)
            ),
        });

        let joined = Source {
            table: &expanded.target_table,
            alias: &alias,
            ..source
        };
        for attr in expanded.columns.iter().filter(|a| !a.kind.is_skipped()) {
            out.columns.push(
                value_column(
                    &joined,
                    attr,
                    format!("{lookup_display} {}", attr.display_name),
                    format!("{}.{}", expanded.lookup_attribute, attr.logical_name),
                )
                .overrides_from(attr),
            );
        }
    }

    dedupe_names(&mut out.columns);
    out
}

fn lookup_config(table: &TableSpec, attribute: &str) -> Option<LookupColumnConfig> {
    table.lookup_columns.get(attribute).copied().or_else(|| {
        table
            .lookup_columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(attribute))
            .map(|(_, v)| *v)
    })
}

fn reference_columns(
    source: &Source<'_>,
    attr: &AttributeSpec,
    config: LookupColumnConfig,
    out: &mut Vec<ColumnPlan>,
) {
    let logical = &attr.logical_name;
    if config.include_id {
        out.push(
            ColumnPlan::new(logical.as_str(), logical.as_str(), DataType::String, source.column(logical))
                .hidden(config.id_hidden),
        );
    }
    if config.include_name {
        out.push(
            ColumnPlan::new(
                attr.display_name.as_str(),
                format!("{logical}name"),
                DataType::String,
                source.dialect.lookup_name_ref(source.alias, logical),
            )
            .hidden(config.name_hidden)
            .overrides_from(attr),
        );
    }
    if attr.kind.is_polymorphic() {
        if config.include_type {
            let sub = format!("{logical}type");
            out.push(ColumnPlan::new(
                format!("{} Type", attr.display_name),
                sub.as_str(),
                DataType::String,
                source.column(&sub),
            ));
        }
        if config.include_phonetic {
            let sub = format!("{logical}yominame");
            out.push(ColumnPlan::new(
                format!("{} Phonetic Name", attr.display_name),
                sub.as_str(),
                DataType::String,
                source.column(&sub),
            ));
        }
    }
}

fn value_column(
    source: &Source<'_>,
    attr: &AttributeSpec,
    name: impl Into<String>,
    logical: impl Into<String>,
) -> ColumnPlan {
    let column = source.column(&attr.logical_name);
    match attr.kind {
        AttributeKind::Picklist | AttributeKind::State | AttributeKind::Status => {
            let label = source.dialect.choice_label(
                source.alias,
                source.table,
                attr,
                source.language_code,
            );
            let mut plan = ColumnPlan::new(name, logical, DataType::String, label.expr);
            plan.join = label.join;
            plan
        }
        AttributeKind::MultiSelectPicklist => ColumnPlan::new(
            name,
            logical,
            DataType::String,
            source.dialect.multi_select_label(
                source.alias,
                source.table,
                attr,
                source.language_code,
            ),
        ),
        AttributeKind::Lookup | AttributeKind::Owner | AttributeKind::Customer => ColumnPlan::new(
            name,
            logical,
            DataType::String,
            source.dialect.lookup_name_ref(source.alias, &attr.logical_name),
        ),
        AttributeKind::DateTime => {
            let sql = if source.utc_offset_minutes == 0 {
                column
            } else {
                format!("DATEADD(minute, {}, {column})", source.utc_offset_minutes)
            };
            let mut plan = ColumnPlan::new(name, logical, DataType::DateTime, sql);
            plan.format_string = Some("General Date".to_string());
            plan
        }
        AttributeKind::Integer | AttributeKind::BigInt => {
            ColumnPlan::new(name, logical, DataType::Int64, column).numeric(Some("0"))
        }
        AttributeKind::Decimal => {
            ColumnPlan::new(name, logical, DataType::Decimal, column).numeric(Some("#,0.00"))
        }
        AttributeKind::Money => {
            ColumnPlan::new(name, logical, DataType::Decimal, column).numeric(Some(MONEY_FORMAT))
        }
        AttributeKind::Double => ColumnPlan::new(name, logical, DataType::Double, column).numeric(None),
        AttributeKind::Boolean => ColumnPlan::new(name, logical, DataType::Boolean, column),
        AttributeKind::String
        | AttributeKind::Memo
        | AttributeKind::Uniqueidentifier
        | AttributeKind::Virtual
        | AttributeKind::EntityName
        | AttributeKind::Other => ColumnPlan::new(name, logical, DataType::String, column),
    }
}

/// Column names are case-insensitive; a clash gets ` (<logical>)` appended.
fn dedupe_names(columns: &mut [ColumnPlan]) {
    let mut taken: HashSet<String> = HashSet::new();
    for column in columns.iter_mut() {
        if !taken.insert(column.name.to_lowercase()) {
            let base = format!("{} ({})", column.name, column.logical);
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.to_lowercase()) {
                candidate = format!("{base} {n}");
                n += 1;
            }
            column.name = candidate;
        }
    }
}
