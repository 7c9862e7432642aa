//! Render a condition tree as a SQL boolean expression.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::ast::{BoolOp, Condition, Filter, FilterDocument, FilterItem, LinkEntity, LinkType};
use super::operator::{DateUnit, Operator, ValueShape};
use super::{TranslateOptions, UnsupportedFeature, UnsupportedKind};
use crate::sql::dialect::helpers;
use crate::sql::SqlDialect;

static GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{?([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\}?$")
        .unwrap()
});

/// A rendered boolean expression and its top-level connective.
///
/// `op` is `None` for atoms (single predicates or already-parenthesized
/// expressions) and the joining operator for multi-part groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fragment {
    pub sql: String,
    pub op: Option<BoolOp>,
}

impl Fragment {
    fn atom(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            op: None,
        }
    }

    /// Text safe to place under `parent`.
    fn under(&self, parent: BoolOp) -> String {
        match self.op {
            Some(op) if op != parent => format!("({})", self.sql),
            _ => self.sql.clone(),
        }
    }
}

/// Join fragments; a single fragment passes through unchanged.
pub(crate) fn join(op: BoolOp, parts: Vec<Fragment>) -> Option<Fragment> {
    match parts.len() {
        0 => None,
        1 => parts.into_iter().next(),
        _ => Some(Fragment {
            sql: parts
                .iter()
                .map(|p| p.under(op))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op.keyword())),
            op: Some(op),
        }),
    }
}

/// A literal value classified for quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    Integer(i64),
    Guid(String),
    Text(String),
}

impl Literal {
    fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        // Only canonical text: `007` or `+5` stay strings
        if let Ok(n) = trimmed.parse::<i64>() {
            if n.to_string() == trimmed {
                return Literal::Integer(n);
            }
        }
        if let Some(caps) = GUID.captures(trimmed) {
            return Literal::Guid(caps[1].to_string());
        }
        Literal::Text(raw.to_string())
    }

    fn render(&self, dialect: &dyn SqlDialect) -> String {
        match self {
            Literal::Integer(n) => n.to_string(),
            Literal::Guid(g) => dialect.quote_string(g),
            Literal::Text(s) => dialect.quote_string(s),
        }
    }
}

pub(crate) struct Translator<'a> {
    options: &'a TranslateOptions,
    unsupported: Vec<UnsupportedFeature>,
    link_counter: usize,
}

impl<'a> Translator<'a> {
    pub fn new(options: &'a TranslateOptions) -> Self {
        Self {
            options,
            unsupported: Vec::new(),
            link_counter: 0,
        }
    }

    pub fn into_unsupported(self) -> Vec<UnsupportedFeature> {
        self.unsupported
    }

    fn flag(&mut self, kind: UnsupportedKind, detail: String) {
        self.unsupported.push(UnsupportedFeature::new(kind, detail));
    }

    pub fn document(&mut self, doc: &FilterDocument) -> Option<Fragment> {
        let alias = self.options.alias.clone();
        let mut parts = Vec::new();
        for filter in &doc.filters {
            parts.extend(self.filter(filter, &alias));
        }
        for link in &doc.links {
            parts.extend(self.link(link, &alias));
        }
        join(BoolOp::And, parts)
    }

    fn filter(&mut self, filter: &Filter, alias: &str) -> Option<Fragment> {
        let mut parts = Vec::new();
        for item in &filter.items {
            let rendered = match item {
                FilterItem::Condition(c) => self.condition(c, alias),
                FilterItem::Filter(f) => self.filter(f, alias),
                FilterItem::Link(l) => self.link(l, alias),
            };
            parts.extend(rendered);
        }
        join(filter.op, parts)
    }

    fn link(&mut self, link: &LinkEntity, parent_alias: &str) -> Option<Fragment> {
        let negated = match &link.link_type {
            LinkType::Inner | LinkType::Exists | LinkType::In | LinkType::Any => false,
            LinkType::NotAny => true,
            LinkType::Outer => {
                if link.has_conditions() {
                    self.flag(
                        UnsupportedKind::LinkType,
                        format!(
                            "outer link to '{}' with a filter cannot restrict rows; filter dropped",
                            link.name
                        ),
                    );
                }
                return None;
            }
            LinkType::All | LinkType::NotAll | LinkType::Other(_) => {
                let name = match &link.link_type {
                    LinkType::All => "all",
                    LinkType::NotAll => "not all",
                    LinkType::Other(s) => s.as_str(),
                    _ => "",
                };
                self.flag(
                    UnsupportedKind::LinkType,
                    format!("link-type '{name}' to '{}' is not supported", link.name),
                );
                return None;
            }
        };

        let (Some(from), Some(to)) = (&link.from, &link.to) else {
            self.flag(
                UnsupportedKind::Malformed,
                format!("link to '{}' needs both from and to columns", link.name),
            );
            return None;
        };

        self.link_counter += 1;
        let alias = link
            .alias
            .clone()
            .filter(|a| helpers::is_plain_identifier(a))
            .unwrap_or_else(|| {
                format!("l{}_{}", self.link_counter, helpers::sanitize_identifier(&link.name))
            });

        let dialect = self.options.dialect;
        let mut parts = vec![Fragment::atom(format!(
            "{} = {}",
            dialect.column_ref(&alias, from),
            dialect.column_ref(parent_alias, to)
        ))];
        for filter in &link.filters {
            parts.extend(self.filter(filter, &alias));
        }
        for nested in &link.links {
            parts.extend(self.link(nested, &alias));
        }

        let body = join(BoolOp::And, parts)
            .map(|f| f.sql)
            .unwrap_or_default();
        let exists = format!(
            "EXISTS (SELECT 1 FROM {} AS {alias} WHERE {body})",
            dialect.table_ref(&link.name)
        );
        Some(Fragment::atom(if negated {
            format!("NOT {exists}")
        } else {
            exists
        }))
    }

    fn condition(&mut self, c: &Condition, alias: &str) -> Option<Fragment> {
        if let Some(entity) = &c.entity_name {
            if !entity.eq_ignore_ascii_case(alias) {
                self.flag(
                    UnsupportedKind::CrossEntityCondition,
                    format!(
                        "condition on '{entity}.{}' must be placed inside its link-entity",
                        c.attribute
                    ),
                );
                return None;
            }
        }

        if !self.values_fit(c) {
            return None;
        }

        let dialect = self.options.dialect;
        let col = dialect.column_ref(alias, &c.attribute);
        let lit = |i: usize| Literal::classify(&c.values[i]).render(&dialect);

        let sql = match c.operator {
            Operator::Eq => format!("{col} = {}", lit(0)),
            Operator::Ne => format!("{col} <> {}", lit(0)),
            Operator::Gt => format!("{col} > {}", lit(0)),
            Operator::Ge => format!("{col} >= {}", lit(0)),
            Operator::Lt => format!("{col} < {}", lit(0)),
            Operator::Le => format!("{col} <= {}", lit(0)),
            Operator::Null => format!("{col} IS NULL"),
            Operator::NotNull => format!("{col} IS NOT NULL"),
            Operator::Like => format!("{col} LIKE {}", dialect.quote_string(&c.values[0])),
            Operator::NotLike => format!("{col} NOT LIKE {}", dialect.quote_string(&c.values[0])),
            Operator::BeginsWith => format!("{col} LIKE {}", self.pattern(c, false, true)),
            Operator::NotBeginWith => format!("{col} NOT LIKE {}", self.pattern(c, false, true)),
            Operator::EndsWith => format!("{col} LIKE {}", self.pattern(c, true, false)),
            Operator::NotEndWith => format!("{col} NOT LIKE {}", self.pattern(c, true, false)),
            Operator::In => format!("{col} IN ({})", self.list(c)),
            Operator::NotIn => format!("{col} NOT IN ({})", self.list(c)),
            Operator::Between => format!("({col} BETWEEN {} AND {})", lit(0), lit(1)),
            Operator::NotBetween => format!("({col} NOT BETWEEN {} AND {})", lit(0), lit(1)),
            Operator::On | Operator::OnOrBefore | Operator::OnOrAfter => {
                let date = self.date_value(c)?;
                let cmp = match c.operator {
                    Operator::OnOrBefore => "<=",
                    Operator::OnOrAfter => ">=",
                    _ => "=",
                };
                format!(
                    "CAST({} AS DATE) {cmp} '{}'",
                    self.local(&col),
                    date.format("%Y-%m-%d")
                )
            }
            Operator::Today => self.day_offset(&col, 0),
            Operator::Yesterday => self.day_offset(&col, -1),
            Operator::Tomorrow => self.day_offset(&col, 1),
            Operator::This(p) => self.period_offset(&col, p.unit(), 0),
            Operator::Last(p) => self.period_offset(&col, p.unit(), -1),
            Operator::Next(p) => self.period_offset(&col, p.unit(), 1),
            Operator::LastX(unit) => {
                let n = self.count(c)?;
                self.last_range(&col, unit, n)
            }
            Operator::NextX(unit) => {
                let n = self.count(c)?;
                self.next_range(&col, unit, n)
            }
            Operator::LastSevenDays => self.last_range(&col, DateUnit::Day, 7),
            Operator::NextSevenDays => self.next_range(&col, DateUnit::Day, 7),
            Operator::OlderThanX(unit) => {
                let n = self.count(c)?;
                format!(
                    "{} < DATEADD({}, -{n}, {})",
                    self.local(&col),
                    unit.datepart(),
                    self.now()
                )
            }
            Operator::EqUserId
            | Operator::NeUserId
            | Operator::EqUserTeams
            | Operator::EqUserOrUserTeams => self.user_identity(c, &col)?,
        };
        Some(Fragment::atom(sql))
    }

    fn values_fit(&mut self, c: &Condition) -> bool {
        let ok = match c.operator.value_shape() {
            ValueShape::None => true,
            ValueShape::Single | ValueShape::Count | ValueShape::Date => !c.values.is_empty(),
            ValueShape::List => !c.values.is_empty(),
            ValueShape::Pair => c.values.len() == 2,
        };
        if !ok {
            self.flag(
                UnsupportedKind::InvalidValue,
                format!(
                    "operator '{}' on attribute '{}' has the wrong number of values ({})",
                    c.operator,
                    c.attribute,
                    c.values.len()
                ),
            );
        }
        ok
    }

    fn pattern(&self, c: &Condition, leading: bool, trailing: bool) -> String {
        let mut p = String::new();
        if leading {
            p.push('%');
        }
        p.push_str(&helpers::escape_like(&c.values[0]));
        if trailing {
            p.push('%');
        }
        self.options.dialect.quote_string(&p)
    }

    fn list(&self, c: &Condition) -> String {
        c.values
            .iter()
            .map(|v| Literal::classify(v).render(&self.options.dialect))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn count(&mut self, c: &Condition) -> Option<u32> {
        match c.values[0].trim().parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.flag(
                    UnsupportedKind::InvalidValue,
                    format!(
                        "operator '{}' on attribute '{}' needs a whole number, got '{}'",
                        c.operator, c.attribute, c.values[0]
                    ),
                );
                None
            }
        }
    }

    fn date_value(&mut self, c: &Condition) -> Option<NaiveDate> {
        let raw = c.values[0].trim();
        let day = raw.get(..10).unwrap_or(raw);
        let rest_ok = raw.len() == day.len() || matches!(raw.as_bytes().get(10), Some(b'T' | b' '));
        match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            Ok(d) if rest_ok => Some(d),
            _ => {
                self.flag(
                    UnsupportedKind::InvalidValue,
                    format!(
                        "operator '{}' on attribute '{}' needs a yyyy-mm-dd date, got '{raw}'",
                        c.operator, c.attribute
                    ),
                );
                None
            }
        }
    }

    /// Shift a UTC expression into the table's fixed offset.
    fn local(&self, expr: &str) -> String {
        match self.options.utc_offset_minutes {
            0 => expr.to_string(),
            off => format!("DATEADD(minute, {off}, {expr})"),
        }
    }

    fn now(&self) -> String {
        self.local("GETUTCDATE()")
    }

    fn day_offset(&self, col: &str, days: i32) -> String {
        let today = match days {
            0 => self.now(),
            d => format!("DATEADD(day, {d}, {})", self.now()),
        };
        format!("CAST({} AS DATE) = CAST({today} AS DATE)", self.local(col))
    }

    fn period_offset(&self, col: &str, unit: DateUnit, delta: i32) -> String {
        format!(
            "DATEDIFF({}, {}, {}) = {delta}",
            unit.datepart(),
            self.now(),
            self.local(col)
        )
    }

    fn last_range(&self, col: &str, unit: DateUnit, n: u32) -> String {
        let local = self.local(col);
        let now = self.now();
        format!(
            "({local} >= DATEADD({}, -{n}, {now}) AND {local} <= {now})",
            unit.datepart()
        )
    }

    fn next_range(&self, col: &str, unit: DateUnit, n: u32) -> String {
        let local = self.local(col);
        let now = self.now();
        format!(
            "({local} >= {now} AND {local} <= DATEADD({}, {n}, {now}))",
            unit.datepart()
        )
    }

    fn user_identity(&mut self, c: &Condition, col: &str) -> Option<String> {
        let dialect = self.options.dialect;
        let current = match (dialect.current_user(), self.options.materialized) {
            (Some(cu), false) => cu,
            (Some(_), true) => {
                self.flag(
                    UnsupportedKind::UserIdentity,
                    format!(
                        "operator '{}' on attribute '{}' needs a live-query table; imported rows have no caller",
                        c.operator, c.attribute
                    ),
                );
                return None;
            }
            (None, _) => {
                self.flag(
                    UnsupportedKind::UserIdentity,
                    format!(
                        "operator '{}' on attribute '{}' is not available on the {} dialect",
                        c.operator,
                        c.attribute,
                        dialect.name()
                    ),
                );
                return None;
            }
        };

        let teams = format!(
            "SELECT {} FROM {} AS tm WHERE {} = {current}",
            dialect.column_ref("tm", "teamid"),
            dialect.table_ref("teammembership"),
            dialect.column_ref("tm", "systemuserid"),
        );
        let sql = match c.operator {
            Operator::EqUserId => format!("{col} = {current}"),
            Operator::NeUserId => format!("{col} <> {current}"),
            Operator::EqUserTeams => format!("{col} IN ({teams})"),
            _ => format!("({col} = {current} OR {col} IN ({teams}))"),
        };
        Some(sql)
    }
}
