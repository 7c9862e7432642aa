//! Condition tree for the filter language.

use super::operator::Operator;

/// Boolean connective of a filter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
        }
    }
}

/// A `condition` leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    /// Alias of a linked entity the condition targets, if any.
    pub entity_name: Option<String>,
    pub operator: Operator,
    /// The `value` attribute or the `<value>` children, in order.
    pub values: Vec<String>,
}

/// One child of a filter group.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    Condition(Condition),
    Filter(Filter),
    /// `any` / `not any` style links placed directly inside a filter.
    Link(LinkEntity),
}

/// A `filter` group.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub op: BoolOp,
    pub items: Vec<FilterItem>,
}

impl Filter {
    pub fn new(op: BoolOp) -> Self {
        Self {
            op,
            items: Vec::new(),
        }
    }
}

/// How a linked entity constrains the parent rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkType {
    Inner,
    Outer,
    Exists,
    In,
    Any,
    NotAny,
    All,
    NotAll,
    Other(String),
}

impl LinkType {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()) {
            None => LinkType::Inner,
            Some(v) => match v.as_str() {
                "" | "inner" => LinkType::Inner,
                "outer" => LinkType::Outer,
                "exists" => LinkType::Exists,
                "in" => LinkType::In,
                "any" => LinkType::Any,
                "not any" => LinkType::NotAny,
                "all" => LinkType::All,
                "not all" => LinkType::NotAll,
                _ => LinkType::Other(v),
            },
        }
    }
}

/// A correlated `link-entity`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntity {
    /// Linked table logical name.
    pub name: String,
    /// Column on the linked table.
    pub from: Option<String>,
    /// Column on the parent.
    pub to: Option<String>,
    pub alias: Option<String>,
    pub link_type: LinkType,
    pub filters: Vec<Filter>,
    pub links: Vec<LinkEntity>,
}

impl LinkEntity {
    /// Whether the link restricts rows at all.
    pub fn has_conditions(&self) -> bool {
        !self.filters.is_empty() || self.links.iter().any(LinkEntity::has_conditions)
    }
}

/// A parsed filter document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterDocument {
    /// `entity name` when the document is a full fetch.
    pub entity: Option<String>,
    /// Top-level groups; ANDed together.
    pub filters: Vec<Filter>,
    pub links: Vec<LinkEntity>,
}

impl FilterDocument {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.links.is_empty()
    }
}
