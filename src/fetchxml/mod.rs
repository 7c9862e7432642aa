//! Filter-language translator.
//!
//! Compiles a FetchXML-style filter document into a SQL boolean expression
//! for one of the supported dialects:
//!
//! ```text
//! XML → parser (condition tree) → translate (SQL fragment) → Translation
//! ```
//!
//! Translation never fails. Unknown operators, identity operators on a target
//! that cannot evaluate them and unsupported link shapes are dropped and
//! reported in [`Translation::unsupported`]; a document that is not
//! well-formed yields no clause at all.
//!
//! # Example
//!
//! ```ignore
//! use modelsmith::fetchxml::{translate, TranslateOptions};
//! use modelsmith::sql::Dialect;
//!
//! let xml = r#"<filter><condition attribute="name" operator="eq" value="O'Brien"/></filter>"#;
//! let t = translate(xml, &TranslateOptions::new(Dialect::DataverseTds));
//! assert_eq!(t.clause.as_deref(), Some("Base.name = 'O''Brien'"));
//! ```

pub mod ast;
pub mod operator;
pub mod parser;
mod translate;

use std::fmt;

use serde::Serialize;

use crate::sql::Dialect;
use ast::BoolOp;

pub use operator::Operator;
pub use parser::{parse, FilterParseError};

/// Main table alias used in partition queries.
pub const BASE_ALIAS: &str = "Base";

/// Category of a construct the translator could not render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnsupportedKind {
    UnknownOperator,
    UserIdentity,
    LinkType,
    CrossEntityCondition,
    ColumnComparison,
    FilterType,
    InvalidValue,
    Malformed,
}

/// One dropped construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsupportedFeature {
    pub kind: UnsupportedKind,
    pub detail: String,
}

impl UnsupportedFeature {
    pub fn new(kind: UnsupportedKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Options for translation.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,

    /// Whether the table is imported rather than live-queried.
    pub materialized: bool,

    /// Fixed offset applied to date/time comparisons, minutes east of UTC.
    pub utc_offset_minutes: i32,

    /// Alias of the filtered table.
    pub alias: String,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

impl TranslateOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            materialized: false,
            utc_offset_minutes: 0,
            alias: BASE_ALIAS.to_string(),
        }
    }

    pub fn materialized(mut self, materialized: bool) -> Self {
        self.materialized = materialized;
        self
    }

    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }
}

/// Result of translating one filter document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    /// The boolean expression, without a `WHERE` keyword.
    pub clause: Option<String>,

    pub fully_supported: bool,

    pub unsupported: Vec<UnsupportedFeature>,

    #[serde(skip)]
    top_level_or: bool,
}

impl Translation {
    fn empty() -> Self {
        Self {
            clause: None,
            fully_supported: true,
            unsupported: Vec::new(),
            top_level_or: false,
        }
    }

    /// AND the clause with a caller-supplied baseline predicate.
    ///
    /// Either side is parenthesized when it could bind looser than `AND`.
    pub fn and_with(&self, baseline: Option<&str>) -> Option<String> {
        let baseline = baseline.map(str::trim).filter(|b| !b.is_empty());
        match (baseline, &self.clause) {
            (None, None) => None,
            (Some(b), None) => Some(b.to_string()),
            (None, Some(c)) => Some(c.clone()),
            (Some(b), Some(c)) => {
                let c = if self.top_level_or {
                    format!("({c})")
                } else {
                    c.clone()
                };
                Some(format!("({b}) AND {c}"))
            }
        }
    }
}

/// Translate a filter document.
pub fn translate(xml: &str, options: &TranslateOptions) -> Translation {
    if xml.trim().is_empty() {
        return Translation::empty();
    }

    let parsed = match parser::parse(xml) {
        Ok(p) => p,
        Err(e) => {
            return Translation {
                clause: None,
                fully_supported: false,
                unsupported: vec![UnsupportedFeature::new(
                    UnsupportedKind::Malformed,
                    format!("filter ignored: {e}"),
                )],
                top_level_or: false,
            };
        }
    };

    let mut translator = translate::Translator::new(options);
    let fragment = translator.document(&parsed.document);

    let mut unsupported = parsed.unsupported;
    unsupported.extend(translator.into_unsupported());

    Translation {
        top_level_or: fragment.as_ref().and_then(|f| f.op) == Some(BoolOp::Or),
        clause: fragment.map(|f| f.sql),
        fully_supported: unsupported.is_empty(),
        unsupported,
    }
}
