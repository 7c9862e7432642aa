//! Attribute (column) descriptions.

use serde::{Deserialize, Serialize};

/// Attribute kind as reported by the metadata provider.
///
/// Unknown provider strings deserialize to [`AttributeKind::Other`] so a new
/// provider type never fails a build; such attributes are skipped on emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    String,
    Memo,
    Integer,
    BigInt,
    Decimal,
    Double,
    Money,
    Boolean,
    DateTime,
    Picklist,
    State,
    Status,
    #[serde(alias = "MultiSelectChoice")]
    MultiSelectPicklist,
    Lookup,
    Owner,
    Customer,
    Uniqueidentifier,
    Virtual,
    EntityName,
    #[serde(other)]
    Other,
}

impl AttributeKind {
    /// Kinds that reference another table and therefore carry id/name sub-columns.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            AttributeKind::Lookup | AttributeKind::Owner | AttributeKind::Customer
        )
    }

    /// Polymorphic references (more than one possible target table).
    pub fn is_polymorphic(&self) -> bool {
        matches!(self, AttributeKind::Owner | AttributeKind::Customer)
    }

    /// Single-valued coded choices whose label is resolved through metadata.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            AttributeKind::Picklist | AttributeKind::State | AttributeKind::Status
        )
    }

    /// Kinds that never produce a column of their own.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            AttributeKind::Virtual | AttributeKind::EntityName | AttributeKind::Other
        )
    }
}

/// One column on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeSpec {
    pub logical_name: String,

    pub display_name: String,

    #[serde(rename = "AttributeType")]
    pub kind: AttributeKind,

    /// Target tables for relationship-bearing kinds.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Owning attribute for virtual companions such as `owneridname`.
    #[serde(default)]
    pub attribute_of: Option<String>,

    /// Choice set name; required for global choice sets.
    #[serde(default)]
    pub option_set_name: Option<String>,

    #[serde(default)]
    pub is_global_option_set: bool,

    /// Caller-supplied description; overrides a preserved one.
    #[serde(default)]
    pub description: Option<String>,

    /// Caller-supplied format string; overrides a preserved one.
    #[serde(default)]
    pub format_string: Option<String>,
}

impl AttributeSpec {
    pub fn new(
        logical_name: impl Into<String>,
        display_name: impl Into<String>,
        kind: AttributeKind,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            display_name: display_name.into(),
            kind,
            targets: Vec::new(),
            attribute_of: None,
            option_set_name: None,
            is_global_option_set: false,
            description: None,
            format_string: None,
        }
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribute_of(mut self, owner: impl Into<String>) -> Self {
        self.attribute_of = Some(owner.into());
        self
    }

    pub fn with_global_option_set(mut self, name: impl Into<String>) -> Self {
        self.option_set_name = Some(name.into());
        self.is_global_option_set = true;
        self
    }

    /// Name of the choice set used for label lookups.
    ///
    /// Table-scoped sets are keyed by the attribute's own name, global sets by
    /// the shared set name.
    pub fn choice_set_key(&self) -> &str {
        if self.is_global_option_set {
            self.option_set_name
                .as_deref()
                .unwrap_or(self.logical_name.as_str())
        } else {
            self.logical_name.as_str()
        }
    }
}

/// Which physical sub-columns a reference attribute produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LookupColumnConfig {
    pub include_id: bool,
    pub id_hidden: bool,
    pub include_name: bool,
    pub name_hidden: bool,
    /// Polymorphic targets only: the `<attr>type` column.
    pub include_type: bool,
    /// Polymorphic targets only: the `<attr>yominame` column.
    pub include_phonetic: bool,
}

impl Default for LookupColumnConfig {
    fn default() -> Self {
        Self::name_only()
    }
}

impl LookupColumnConfig {
    /// Display name visible, id excluded.
    pub fn name_only() -> Self {
        Self {
            include_id: false,
            id_hidden: true,
            include_name: true,
            name_hidden: false,
            include_type: false,
            include_phonetic: false,
        }
    }

    /// Default for attributes a relationship depends on: hidden id plus visible name.
    pub fn relationship_key() -> Self {
        Self {
            include_id: true,
            id_hidden: true,
            ..Self::name_only()
        }
    }

    /// Force the hidden id sub-column on, keeping every other choice.
    pub fn with_required_id(mut self) -> Self {
        if !self.include_id {
            self.include_id = true;
            self.id_hidden = true;
        }
        self
    }
}
