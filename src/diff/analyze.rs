//! Change classification.

use crate::build::tree::DefinitionTree;
use crate::emitter::RepairedRelationship;

use super::snapshot::{ModelSnapshot, RelationshipSnapshot, TableSnapshot};
use super::{ChangeRecord, ChangeType, Impact, ObjectKind};

/// Compare two trees. Output is ordered by table name, then relationships,
/// then expressions.
pub fn analyze_changes(previous: &DefinitionTree, next: &DefinitionTree) -> Vec<ChangeRecord> {
    let before = ModelSnapshot::from_tree(previous);
    let after = ModelSnapshot::from_tree(next);
    let mut changes = Vec::new();

    let names: std::collections::BTreeSet<&String> =
        before.tables.keys().chain(after.tables.keys()).collect();
    for name in names {
        match (before.tables.get(name), after.tables.get(name)) {
            (None, Some(_)) => changes.push(ChangeRecord::new(
                ObjectKind::Table,
                name.as_str(),
                ChangeType::Added,
                Impact::NonBreaking,
            )),
            (Some(_), None) => {
                let impact = if table_referenced(&before, &after, name) {
                    Impact::Breaking
                } else {
                    Impact::NonBreaking
                };
                changes.push(ChangeRecord::new(
                    ObjectKind::Table,
                    name.as_str(),
                    ChangeType::Removed,
                    impact,
                ));
            }
            (Some(old), Some(new)) => {
                compare_columns(&before, &after, name, old, new, &mut changes);
                compare_measures(&after, name, old, new, &mut changes);
            }
            (None, None) => {}
        }
    }

    compare_relationships(&before, &after, &mut changes);

    for name in before.expressions.difference(&after.expressions) {
        changes.push(ChangeRecord::new(
            ObjectKind::Expression,
            name.as_str(),
            ChangeType::Removed,
            Impact::NonBreaking,
        ));
    }
    for name in after.expressions.difference(&before.expressions) {
        changes.push(ChangeRecord::new(
            ObjectKind::Expression,
            name.as_str(),
            ChangeType::Added,
            Impact::NonBreaking,
        ));
    }

    changes
}

/// Attach repair reasons to the matching relationship removals.
pub fn annotate_repairs(changes: &mut [ChangeRecord], repaired: &[RepairedRelationship]) {
    for change in changes.iter_mut().filter(|c| {
        c.object_kind == ObjectKind::Relationship && c.change_type == ChangeType::Removed
    }) {
        if let Some(repair) = repaired.iter().find(|r| r.key == change.object_name) {
            change.detail = Some(format!("repaired: {}", repair.reason));
        }
    }
}

pub fn has_breaking(changes: &[ChangeRecord]) -> bool {
    changes.iter().any(ChangeRecord::is_breaking)
}

fn compare_columns(
    before: &ModelSnapshot,
    after: &ModelSnapshot,
    table: &str,
    old: &TableSnapshot,
    new: &TableSnapshot,
    changes: &mut Vec<ChangeRecord>,
) {
    for (name, col) in &old.columns {
        let object_name = format!("{table}.{name}");
        match new.columns.get(name) {
            None => {
                let impact = if column_referenced(before, after, table, name) {
                    Impact::Breaking
                } else {
                    Impact::NonBreaking
                };
                changes.push(ChangeRecord::new(
                    ObjectKind::Column,
                    object_name,
                    ChangeType::Removed,
                    impact,
                ));
            }
            Some(next) if next.data_type != col.data_type => {
                changes.push(
                    ChangeRecord::new(
                        ObjectKind::Column,
                        object_name,
                        ChangeType::Modified,
                        Impact::Breaking,
                    )
                    .with_detail(format!(
                        "dataType {} → {}",
                        col.data_type.as_deref().unwrap_or("?"),
                        next.data_type.as_deref().unwrap_or("?")
                    )),
                );
            }
            Some(next) if next.is_hidden != col.is_hidden => {
                let detail = if next.is_hidden { "now hidden" } else { "now visible" };
                changes.push(
                    ChangeRecord::new(
                        ObjectKind::Column,
                        object_name,
                        ChangeType::Modified,
                        Impact::NonBreaking,
                    )
                    .with_detail(detail),
                );
            }
            Some(_) => {}
        }
    }
    for name in new.columns.keys().filter(|n| !old.columns.contains_key(*n)) {
        changes.push(ChangeRecord::new(
            ObjectKind::Column,
            format!("{table}.{name}"),
            ChangeType::Added,
            Impact::NonBreaking,
        ));
    }
}

fn compare_measures(
    after: &ModelSnapshot,
    table: &str,
    old: &TableSnapshot,
    new: &TableSnapshot,
    changes: &mut Vec<ChangeRecord>,
) {
    for (name, expr) in &old.measures {
        let object_name = format!("{table}.[{name}]");
        match new.measures.get(name) {
            None => {
                let referenced = after
                    .measure_expressions()
                    .any(|(_, _, e)| mentions_measure(e, name));
                let impact = if referenced {
                    Impact::Breaking
                } else {
                    Impact::NonBreaking
                };
                changes.push(ChangeRecord::new(
                    ObjectKind::Measure,
                    object_name,
                    ChangeType::Removed,
                    impact,
                ));
            }
            Some(next) if next != expr => changes.push(ChangeRecord::new(
                ObjectKind::Measure,
                object_name,
                ChangeType::Modified,
                Impact::NonBreaking,
            )),
            Some(_) => {}
        }
    }
    for name in new.measures.keys().filter(|n| !old.measures.contains_key(*n)) {
        changes.push(ChangeRecord::new(
            ObjectKind::Measure,
            format!("{table}.[{name}]"),
            ChangeType::Added,
            Impact::NonBreaking,
        ));
    }
}

fn compare_relationships(
    before: &ModelSnapshot,
    after: &ModelSnapshot,
    changes: &mut Vec<ChangeRecord>,
) {
    for (key, old) in &before.relationships {
        match after.relationships.get(key) {
            None => {
                let impact = if old.is_active {
                    Impact::Breaking
                } else {
                    Impact::NonBreaking
                };
                changes.push(ChangeRecord::new(
                    ObjectKind::Relationship,
                    key.as_str(),
                    ChangeType::Removed,
                    impact,
                ));
            }
            Some(new) if new.is_active != old.is_active => {
                let (impact, detail) = if old.is_active {
                    (Impact::Breaking, "deactivated")
                } else {
                    (Impact::NonBreaking, "activated")
                };
                changes.push(
                    ChangeRecord::new(
                        ObjectKind::Relationship,
                        key.as_str(),
                        ChangeType::Modified,
                        impact,
                    )
                    .with_detail(detail),
                );
            }
            Some(new) if new.cross_filter_both != old.cross_filter_both => {
                let detail = if new.cross_filter_both {
                    "cross-filter both directions"
                } else {
                    "cross-filter single direction"
                };
                changes.push(
                    ChangeRecord::new(
                        ObjectKind::Relationship,
                        key.as_str(),
                        ChangeType::Modified,
                        Impact::NonBreaking,
                    )
                    .with_detail(detail),
                );
            }
            Some(_) => {}
        }
    }
    for key in after
        .relationships
        .keys()
        .filter(|k| !before.relationships.contains_key(*k))
    {
        changes.push(ChangeRecord::new(
            ObjectKind::Relationship,
            key.as_str(),
            ChangeType::Added,
            Impact::NonBreaking,
        ));
    }
}

fn touches_table(rel: &RelationshipSnapshot, table: &str) -> bool {
    rel.from.0.eq_ignore_ascii_case(table) || rel.to.0.eq_ignore_ascii_case(table)
}

fn touches_column(rel: &RelationshipSnapshot, table: &str, column: &str) -> bool {
    [&rel.from, &rel.to]
        .iter()
        .any(|(t, c)| t.eq_ignore_ascii_case(table) && c.eq_ignore_ascii_case(column))
}

fn table_referenced(before: &ModelSnapshot, after: &ModelSnapshot, table: &str) -> bool {
    before.relationships.values().any(|r| touches_table(r, table))
        || after
            .measure_expressions()
            .any(|(owner, _, e)| !owner.eq_ignore_ascii_case(table) && mentions_table(e, table))
}

fn column_referenced(before: &ModelSnapshot, after: &ModelSnapshot, table: &str, column: &str) -> bool {
    before
        .relationships
        .values()
        .any(|r| touches_column(r, table, column))
        || after
            .measure_expressions()
            .any(|(_, _, e)| mentions_column(e, table, column))
}

/// Quoted `'Table'` or bare `Table` outside string literals and `[...]`.
/// A bare name followed by `(` is a function call.
fn mentions_table(expr: &str, table: &str) -> bool {
    let table = table.to_lowercase();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '"' => i = read_delimited(&chars, i + 1, '"').1,
            '[' => i = read_delimited(&chars, i + 1, ']').1,
            '\'' => {
                let (name, next) = read_delimited(&chars, i + 1, '\'');
                if name.to_lowercase() == table {
                    return true;
                }
                i = next;
            }
            c if is_identifier_char(c) => {
                let start = i;
                while i < chars.len() && (is_identifier_char(chars[i]) || chars[i] == '.') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let call = chars[i..].iter().find(|c| !c.is_whitespace()) == Some(&'(');
                if !call && word.to_lowercase() == table {
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    false
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Text up to the closing delimiter, with doubled delimiters unescaped, and
/// the index just past it.
fn read_delimited(chars: &[char], mut i: usize, close: char) -> (String, usize) {
    let mut text = String::new();
    while i < chars.len() {
        if chars[i] == close {
            if chars.get(i + 1) == Some(&close) {
                text.push(close);
                i += 2;
                continue;
            }
            return (text, i + 1);
        }
        text.push(chars[i]);
        i += 1;
    }
    (text, i)
}

fn mentions_column(expr: &str, table: &str, column: &str) -> bool {
    let expr = expr.to_lowercase();
    let table = table.to_lowercase();
    let column = column.to_lowercase();
    expr.contains(&format!("'{table}'[{column}]")) || expr.contains(&format!("{table}[{column}]"))
}

/// `[name]` not directly preceded by a table reference.
fn mentions_measure(expr: &str, name: &str) -> bool {
    let expr = expr.to_lowercase();
    let needle = format!("[{}]", name.to_lowercase());
    expr.match_indices(&needle).any(|(i, _)| {
        expr[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '\'' || c == ']'))
    })
}
