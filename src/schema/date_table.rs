use serde::{Deserialize, Serialize};

/// A generated calendar table owned by the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateTableSpec {
    #[serde(default = "default_name")]
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
}

fn default_name() -> String {
    "Date".to_string()
}

impl DateTableSpec {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            name: default_name(),
            start_year,
            end_year,
        }
    }
}

/// A fact date column bound to the date table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateRelationship {
    pub table: String,
    pub attribute: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
