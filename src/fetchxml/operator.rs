//! The closed set of condition operators.
//!
//! Every variant has exactly one render arm in the translator; adding a
//! variant without a render case fails to compile.

use std::fmt;

/// Calendar unit used by relative date operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl DateUnit {
    /// `DATEADD`/`DATEDIFF` datepart keyword.
    pub fn datepart(&self) -> &'static str {
        match self {
            DateUnit::Hour => "hour",
            DateUnit::Day => "day",
            DateUnit::Week => "week",
            DateUnit::Month => "month",
            DateUnit::Year => "year",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            DateUnit::Hour => "hours",
            DateUnit::Day => "days",
            DateUnit::Week => "weeks",
            DateUnit::Month => "months",
            DateUnit::Year => "years",
        }
    }
}

/// Whole calendar period relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn unit(&self) -> DateUnit {
        match self {
            Period::Week => DateUnit::Week,
            Period::Month => DateUnit::Month,
            Period::Year => DateUnit::Year,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

/// A condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Comparison
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,

    // Null checks
    Null,
    NotNull,

    // Strings
    Like,
    NotLike,
    BeginsWith,
    NotBeginWith,
    EndsWith,
    NotEndWith,

    // Lists and ranges
    In,
    NotIn,
    Between,
    NotBetween,

    // Absolute dates
    On,
    OnOrBefore,
    OnOrAfter,

    // Relative days
    Today,
    Yesterday,
    Tomorrow,

    // Relative periods
    This(Period),
    Last(Period),
    Next(Period),

    // Relative counts
    LastX(DateUnit),
    NextX(DateUnit),
    OlderThanX(DateUnit),
    LastSevenDays,
    NextSevenDays,

    // User identity
    EqUserId,
    NeUserId,
    EqUserTeams,
    EqUserOrUserTeams,
}

/// What a condition's value must look like for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    None,
    Single,
    List,
    Pair,
    Count,
    Date,
}

impl Operator {
    /// Parse an operator name; `None` for anything outside the known set.
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Operator::Eq,
            "ne" | "neq" => Operator::Ne,
            "gt" => Operator::Gt,
            "ge" => Operator::Ge,
            "lt" => Operator::Lt,
            "le" => Operator::Le,
            "null" => Operator::Null,
            "not-null" => Operator::NotNull,
            "like" => Operator::Like,
            "not-like" => Operator::NotLike,
            "begins-with" => Operator::BeginsWith,
            "not-begin-with" => Operator::NotBeginWith,
            "ends-with" => Operator::EndsWith,
            "not-end-with" => Operator::NotEndWith,
            "in" => Operator::In,
            "not-in" => Operator::NotIn,
            "between" => Operator::Between,
            "not-between" => Operator::NotBetween,
            "on" => Operator::On,
            "on-or-before" => Operator::OnOrBefore,
            "on-or-after" => Operator::OnOrAfter,
            "today" => Operator::Today,
            "yesterday" => Operator::Yesterday,
            "tomorrow" => Operator::Tomorrow,
            "this-week" => Operator::This(Period::Week),
            "this-month" => Operator::This(Period::Month),
            "this-year" => Operator::This(Period::Year),
            "last-week" => Operator::Last(Period::Week),
            "last-month" => Operator::Last(Period::Month),
            "last-year" => Operator::Last(Period::Year),
            "next-week" => Operator::Next(Period::Week),
            "next-month" => Operator::Next(Period::Month),
            "next-year" => Operator::Next(Period::Year),
            "last-x-hours" => Operator::LastX(DateUnit::Hour),
            "last-x-days" => Operator::LastX(DateUnit::Day),
            "last-x-weeks" => Operator::LastX(DateUnit::Week),
            "last-x-months" => Operator::LastX(DateUnit::Month),
            "last-x-years" => Operator::LastX(DateUnit::Year),
            "next-x-hours" => Operator::NextX(DateUnit::Hour),
            "next-x-days" => Operator::NextX(DateUnit::Day),
            "next-x-weeks" => Operator::NextX(DateUnit::Week),
            "next-x-months" => Operator::NextX(DateUnit::Month),
            "next-x-years" => Operator::NextX(DateUnit::Year),
            "olderthan-x-hours" => Operator::OlderThanX(DateUnit::Hour),
            "olderthan-x-days" => Operator::OlderThanX(DateUnit::Day),
            "olderthan-x-weeks" => Operator::OlderThanX(DateUnit::Week),
            "olderthan-x-months" => Operator::OlderThanX(DateUnit::Month),
            "olderthan-x-years" => Operator::OlderThanX(DateUnit::Year),
            "last-seven-days" => Operator::LastSevenDays,
            "next-seven-days" => Operator::NextSevenDays,
            "eq-userid" => Operator::EqUserId,
            "ne-userid" => Operator::NeUserId,
            "eq-userteams" => Operator::EqUserTeams,
            "eq-useroruserteams" => Operator::EqUserOrUserTeams,
            _ => return None,
        };
        Some(op)
    }

    pub fn value_shape(&self) -> ValueShape {
        match self {
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le
            | Operator::Like
            | Operator::NotLike
            | Operator::BeginsWith
            | Operator::NotBeginWith
            | Operator::EndsWith
            | Operator::NotEndWith => ValueShape::Single,
            Operator::In | Operator::NotIn => ValueShape::List,
            Operator::Between | Operator::NotBetween => ValueShape::Pair,
            Operator::On | Operator::OnOrBefore | Operator::OnOrAfter => ValueShape::Date,
            Operator::LastX(_) | Operator::NextX(_) | Operator::OlderThanX(_) => ValueShape::Count,
            Operator::Null
            | Operator::NotNull
            | Operator::Today
            | Operator::Yesterday
            | Operator::Tomorrow
            | Operator::This(_)
            | Operator::Last(_)
            | Operator::Next(_)
            | Operator::LastSevenDays
            | Operator::NextSevenDays
            | Operator::EqUserId
            | Operator::NeUserId
            | Operator::EqUserTeams
            | Operator::EqUserOrUserTeams => ValueShape::None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Null => "null",
            Operator::NotNull => "not-null",
            Operator::Like => "like",
            Operator::NotLike => "not-like",
            Operator::BeginsWith => "begins-with",
            Operator::NotBeginWith => "not-begin-with",
            Operator::EndsWith => "ends-with",
            Operator::NotEndWith => "not-end-with",
            Operator::In => "in",
            Operator::NotIn => "not-in",
            Operator::Between => "between",
            Operator::NotBetween => "not-between",
            Operator::On => "on",
            Operator::OnOrBefore => "on-or-before",
            Operator::OnOrAfter => "on-or-after",
            Operator::Today => "today",
            Operator::Yesterday => "yesterday",
            Operator::Tomorrow => "tomorrow",
            Operator::This(p) => return write!(f, "this-{}", p.name()),
            Operator::Last(p) => return write!(f, "last-{}", p.name()),
            Operator::Next(p) => return write!(f, "next-{}", p.name()),
            Operator::LastX(u) => return write!(f, "last-x-{}", u.suffix()),
            Operator::NextX(u) => return write!(f, "next-x-{}", u.suffix()),
            Operator::OlderThanX(u) => return write!(f, "olderthan-x-{}", u.suffix()),
            Operator::LastSevenDays => "last-seven-days",
            Operator::NextSevenDays => "next-seven-days",
            Operator::EqUserId => "eq-userid",
            Operator::NeUserId => "ne-userid",
            Operator::EqUserTeams => "eq-userteams",
            Operator::EqUserOrUserTeams => "eq-useroruserteams",
        };
        f.write_str(name)
    }
}
