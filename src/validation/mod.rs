//! Validation of Schema Models.
//!
//! Collects every problem instead of stopping at the first. Any error makes
//! `apply` fail before a single file is written.

use std::collections::{BTreeMap, HashSet};

use crate::build::paths::validate_file_name;
use crate::emitter::connection::PARAMETER_TABLE;
use crate::schema::{AttributeKind, SchemaModel, TableRole};
use crate::sql::Dialect;

/// Validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Duplicate name detected.
    DuplicateName { entity_type: String, name: String },
    /// Reference to undefined entity.
    UndefinedReference {
        entity_type: String,
        entity_name: String,
        reference_type: String,
        reference_name: String,
    },
    /// Reference to an entity of the wrong shape.
    InvalidReference {
        entity_type: String,
        entity_name: String,
        issue: String,
    },
    /// Not exactly one active relationship between a table pair.
    ActiveRelationshipConflict {
        source_table: String,
        target_table: String,
        active: usize,
    },
    /// Name that cannot be used as a file name.
    UnsafeName { name: String, issue: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::DuplicateName { entity_type, name } => {
                write!(f, "Duplicate {} name: '{}'", entity_type, name)
            }
            ValidationError::UndefinedReference {
                entity_type,
                entity_name,
                reference_type,
                reference_name,
            } => {
                write!(
                    f,
                    "{} '{}' references undefined {} '{}'",
                    entity_type, entity_name, reference_type, reference_name
                )
            }
            ValidationError::InvalidReference {
                entity_type,
                entity_name,
                issue,
            } => {
                write!(f, "{} '{}' is invalid: {}", entity_type, entity_name, issue)
            }
            ValidationError::ActiveRelationshipConflict {
                source_table,
                target_table,
                active,
            } => {
                write!(
                    f,
                    "Relationships from '{}' to '{}' must have exactly one active, found {}",
                    source_table, target_table, active
                )
            }
            ValidationError::UnsafeName { name, issue } => {
                write!(f, "Unsafe name '{}': {}", name, issue)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a Schema Model.
pub fn validate(model: &SchemaModel) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_unique_names(model, &mut errors);
    validate_relationships(model, &mut errors);
    validate_active_relationships(model, &mut errors);
    validate_expanded_lookups(model, &mut errors);
    validate_date_table(model, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_names(model: &SchemaModel, errors: &mut Vec<ValidationError>) {
    let mut seen_logical = HashSet::new();
    let mut seen_display = HashSet::new();

    // Generated tables share the folder with model tables
    if model.connection.dialect == Dialect::DataverseTds {
        seen_display.insert(PARAMETER_TABLE.to_lowercase());
    }
    if let Some(date) = &model.date_table {
        if !seen_display.insert(date.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateName {
                entity_type: "Table".to_string(),
                name: date.name.clone(),
            });
        }
        if let Err(e) = validate_file_name(&date.name) {
            errors.push(ValidationError::UnsafeName {
                name: date.name.clone(),
                issue: e.to_string(),
            });
        }
    }

    for table in &model.tables {
        if !seen_logical.insert(table.logical_name.to_lowercase()) {
            errors.push(ValidationError::DuplicateName {
                entity_type: "Table".to_string(),
                name: table.logical_name.clone(),
            });
        }
        if !seen_display.insert(table.display_name.to_lowercase()) {
            errors.push(ValidationError::DuplicateName {
                entity_type: "Table display".to_string(),
                name: table.display_name.clone(),
            });
        }
        if let Err(e) = validate_file_name(&table.display_name) {
            errors.push(ValidationError::UnsafeName {
                name: table.display_name.clone(),
                issue: e.to_string(),
            });
        }
    }
}

fn validate_relationships(model: &SchemaModel, errors: &mut Vec<ValidationError>) {
    for rel in &model.relationships {
        let name = format!("{}.{}", rel.source_table, rel.source_attribute);

        let Some(source) = model.table(&rel.source_table) else {
            errors.push(ValidationError::UndefinedReference {
                entity_type: "Relationship".to_string(),
                entity_name: name,
                reference_type: "table".to_string(),
                reference_name: rel.source_table.clone(),
            });
            continue;
        };
        let target = model.table(&rel.target_table);
        if target.is_none() {
            errors.push(ValidationError::UndefinedReference {
                entity_type: "Relationship".to_string(),
                entity_name: name.clone(),
                reference_type: "table".to_string(),
                reference_name: rel.target_table.clone(),
            });
        }

        match source.attribute(&rel.source_attribute) {
            None => errors.push(ValidationError::UndefinedReference {
                entity_type: "Relationship".to_string(),
                entity_name: name.clone(),
                reference_type: "attribute".to_string(),
                reference_name: rel.source_attribute.clone(),
            }),
            Some(attr) if !attr.kind.is_reference() => {
                errors.push(ValidationError::InvalidReference {
                    entity_type: "Relationship".to_string(),
                    entity_name: name.clone(),
                    issue: format!("attribute kind {:?} is not a lookup", attr.kind),
                })
            }
            Some(_) => {}
        }

        if rel.is_snowflake && source.role != TableRole::Dimension {
            errors.push(ValidationError::InvalidReference {
                entity_type: "Relationship".to_string(),
                entity_name: name,
                issue: "snowflake relationships must start from a dimension".to_string(),
            });
        }
    }
}

fn validate_active_relationships(model: &SchemaModel, errors: &mut Vec<ValidationError>) {
    let mut pairs: BTreeMap<(String, String), (usize, usize)> = BTreeMap::new();
    for rel in &model.relationships {
        let entry = pairs.entry(rel.pair()).or_default();
        entry.0 += 1;
        if rel.is_active {
            entry.1 += 1;
        }
    }
    for ((source, target), (total, active)) in pairs {
        if active > 1 || (total > 1 && active == 0) {
            errors.push(ValidationError::ActiveRelationshipConflict {
                source_table: source,
                target_table: target,
                active,
            });
        }
    }
}

fn validate_expanded_lookups(model: &SchemaModel, errors: &mut Vec<ValidationError>) {
    for table in &model.tables {
        for expanded in &table.expanded_lookups {
            let name = format!("{}.{}", table.logical_name, expanded.lookup_attribute);
            match table.attribute(&expanded.lookup_attribute) {
                None => errors.push(ValidationError::UndefinedReference {
                    entity_type: "Expanded lookup".to_string(),
                    entity_name: name,
                    reference_type: "attribute".to_string(),
                    reference_name: expanded.lookup_attribute.clone(),
                }),
                Some(attr) if !attr.kind.is_reference() => {
                    errors.push(ValidationError::InvalidReference {
                        entity_type: "Expanded lookup".to_string(),
                        entity_name: name,
                        issue: format!("attribute kind {:?} is not a lookup", attr.kind),
                    })
                }
                Some(_) => {}
            }
        }
    }
}

fn validate_date_table(model: &SchemaModel, errors: &mut Vec<ValidationError>) {
    let Some(date) = &model.date_table else {
        if let Some(rel) = model.date_relationships.first() {
            errors.push(ValidationError::UndefinedReference {
                entity_type: "Date relationship".to_string(),
                entity_name: format!("{}.{}", rel.table, rel.attribute),
                reference_type: "date table".to_string(),
                reference_name: "(none configured)".to_string(),
            });
        }
        return;
    };

    if date.end_year < date.start_year {
        errors.push(ValidationError::InvalidReference {
            entity_type: "Date table".to_string(),
            entity_name: date.name.clone(),
            issue: format!("end year {} is before start year {}", date.end_year, date.start_year),
        });
    }

    let mut active_per_table: BTreeMap<String, usize> = BTreeMap::new();
    for rel in &model.date_relationships {
        let name = format!("{}.{}", rel.table, rel.attribute);
        let Some(table) = model.table(&rel.table) else {
            errors.push(ValidationError::UndefinedReference {
                entity_type: "Date relationship".to_string(),
                entity_name: name,
                reference_type: "table".to_string(),
                reference_name: rel.table.clone(),
            });
            continue;
        };
        match table.attribute(&rel.attribute) {
            None => errors.push(ValidationError::UndefinedReference {
                entity_type: "Date relationship".to_string(),
                entity_name: name,
                reference_type: "attribute".to_string(),
                reference_name: rel.attribute.clone(),
            }),
            Some(attr) if attr.kind != AttributeKind::DateTime => {
                errors.push(ValidationError::InvalidReference {
                    entity_type: "Date relationship".to_string(),
                    entity_name: name,
                    issue: format!("attribute kind {:?} is not DateTime", attr.kind),
                })
            }
            Some(_) => {}
        }
        if rel.is_active {
            *active_per_table
                .entry(table.logical_name.to_lowercase())
                .or_default() += 1;
        }
    }

    for (table, active) in active_per_table {
        if active > 1 {
            errors.push(ValidationError::ActiveRelationshipConflict {
                source_table: table,
                target_table: date.name.clone(),
                active,
            });
        }
    }
}
