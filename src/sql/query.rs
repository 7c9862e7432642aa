//! Query builder - construct partition SELECT statements with a fluent API.
//!
//! Expressions are already-rendered SQL text; the builder only owns layout
//! (one select item per line, joins after FROM, predicates ANDed).

use super::dialect::{Dialect, SqlDialect};

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: String,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expr, dialect.quote_identifier(alias)),
            None => self.expr.clone(),
        }
    }
}

// =============================================================================
// Joins
// =============================================================================

/// A LEFT JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Rendered table reference including its alias.
    pub table: String,
    pub on: String,
}

impl Join {
    pub fn to_sql(&self) -> String {
        format!("LEFT JOIN {} ON {}", self.table, self.on)
    }
}

// =============================================================================
// Query
// =============================================================================

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    /// Rendered FROM item including its alias.
    pub from: Option<String>,
    pub joins: Vec<Join>,
    /// Raw clauses joined verbatim (pre-rendered LEFT JOIN ... ON ...).
    pub raw_joins: Vec<String>,
    pub where_clause: Vec<String>,
}

impl Query {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item to the SELECT list.
    pub fn column(mut self, expr: SelectExpr) -> Self {
        self.select.push(expr);
        self
    }

    /// Set the FROM table.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Add a LEFT JOIN.
    pub fn left_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            table: table.into(),
            on: on.into(),
        });
        self
    }

    /// Add a pre-rendered join clause; identical clauses are kept once.
    pub fn raw_join(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        if !self.raw_joins.contains(&clause) {
            self.raw_joins.push(clause);
        }
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    ///
    /// Conditions containing a top-level OR must arrive parenthesized.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        if !condition.trim().is_empty() {
            self.where_clause.push(condition);
        }
        self
    }

    /// Render the query, one select item per line.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = String::from("SELECT");
        let items: Vec<String> = self.select.iter().map(|s| s.to_sql(dialect)).collect();
        if items.is_empty() {
            sql.push_str(" *");
        } else {
            sql.push('\n');
            sql.push_str(
                &items
                    .iter()
                    .map(|i| format!("    {i}"))
                    .collect::<Vec<_>>()
                    .join(",\n"),
            );
        }
        if let Some(from) = &self.from {
            sql.push_str("\nFROM ");
            sql.push_str(from);
        }
        for join in &self.joins {
            sql.push('\n');
            sql.push_str(&join.to_sql());
        }
        for join in &self.raw_joins {
            sql.push('\n');
            sql.push_str(join);
        }
        if !self.where_clause.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&self.where_clause.join(" AND "));
        }
        sql
    }
}
