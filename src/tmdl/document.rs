//! Indentation-based reader for previously generated TMDL files.
//!
//! Recovers only what regeneration needs: object names, lineage tags,
//! column properties and annotations, measure and relationship blocks as raw
//! text, and the leading `// source:` marker. Anything else is skipped.

use super::format::{normalize_newlines, split_name, split_qualified};

/// Leading marker comment naming a table file's logical source.
pub const SOURCE_MARKER: &str = "// source:";

/// A `column` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnBlock {
    pub name: String,
    /// Text from `///` lines directly above the block.
    pub description: Option<String>,
    pub data_type: Option<String>,
    pub is_hidden: bool,
    pub format_string: Option<String>,
    pub lineage_tag: Option<String>,
    pub summarize_by: Option<String>,
    pub source_column: Option<String>,
    pub annotations: Vec<(String, String)>,
}

impl ColumnBlock {
    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A `measure` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeasureBlock {
    pub name: String,
    /// Everything after `=`, including continuation lines.
    pub expression: String,
    pub lineage_tag: Option<String>,
    /// The block as written, `///` lines included, trailing blanks removed.
    pub raw: String,
}

/// A `table` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableBlock {
    pub name: String,
    pub lineage_tag: Option<String>,
    pub columns: Vec<ColumnBlock>,
    pub measures: Vec<MeasureBlock>,
}

/// A `relationship` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipBlock {
    pub id: String,
    pub from_column: Option<(String, String)>,
    pub to_column: Option<(String, String)>,
    pub is_active: bool,
    pub cross_filter_both: bool,
    pub annotations: Vec<(String, String)>,
    /// `//` comment lines directly above the block.
    pub comments: Vec<String>,
    /// The block body as written, comments above it excluded.
    pub raw: String,
}

impl RelationshipBlock {
    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `From.col→To.col` with unquoted names.
    pub fn canonical_key(&self) -> Option<String> {
        let (ft, fc) = self.from_column.as_ref()?;
        let (tt, tc) = self.to_column.as_ref()?;
        Some(canonical_relationship_key(ft, fc, tt, tc))
    }
}

/// An `expression` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpressionBlock {
    pub name: String,
    pub lineage_tag: Option<String>,
    pub raw: String,
}

/// Everything recovered from one file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TmdlDocument {
    /// Logical name from a leading `// source:` comment.
    pub source_marker: Option<String>,
    pub tables: Vec<TableBlock>,
    pub relationships: Vec<RelationshipBlock>,
    pub expressions: Vec<ExpressionBlock>,
}

/// Canonical relationship key shared by reader and generator.
pub fn canonical_relationship_key(
    from_table: &str,
    from_column: &str,
    to_table: &str,
    to_column: &str,
) -> String {
    format!("{from_table}.{from_column}→{to_table}.{to_column}")
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// End index (exclusive) of the block starting at `start`.
///
/// Trailing blank lines are not part of the block.
fn block_end(lines: &[&str], start: usize, start_indent: usize) -> usize {
    let mut end = start + 1;
    let mut last_content = start + 1;
    while end < lines.len() {
        let line = lines[end];
        if line.trim().is_empty() {
            end += 1;
            continue;
        }
        if indent_of(line) <= start_indent {
            break;
        }
        end += 1;
        last_content = end;
    }
    last_content
}

fn property<'a>(trimmed: &'a str, key: &str) -> Option<&'a str> {
    trimmed
        .strip_prefix(key)
        .and_then(|r| r.strip_prefix(':'))
        .map(str::trim)
}

fn annotation(trimmed: &str) -> Option<(String, String)> {
    let rest = trimmed.strip_prefix("annotation ")?;
    let (name, rest) = split_name(rest);
    let value = rest.trim_start().strip_prefix('=')?.trim();
    Some((name, value.to_string()))
}

/// Parse one file.
pub fn parse_document(text: &str) -> TmdlDocument {
    let text = normalize_newlines(text);
    let lines: Vec<&str> = text.lines().collect();
    let mut doc = TmdlDocument::default();

    let mut comments: Vec<String> = Vec::new();
    let mut seen_content = false;
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let trimmed = line.trim();
        if trimmed.is_empty() {
            idx += 1;
            continue;
        }
        let indent = indent_of(line);

        if trimmed.starts_with("//") && !trimmed.starts_with("///") {
            if !seen_content && doc.source_marker.is_none() && comments.is_empty() {
                if let Some(name) = source_marker(line, lines.get(idx + 1).copied()) {
                    doc.source_marker = Some(name);
                    idx += 1;
                    continue;
                }
            }
            comments.push(trimmed.to_string());
            idx += 1;
            continue;
        }
        if trimmed.starts_with("///") {
            idx += 1;
            continue;
        }

        seen_content = true;
        let end = block_end(&lines, idx, indent);
        let block = &lines[idx..end];

        if let Some(rest) = trimmed.strip_prefix("table ") {
            doc.tables.push(parse_table(rest, block));
        } else if let Some(rest) = trimmed.strip_prefix("relationship ") {
            let mut rel = parse_relationship(rest, block);
            rel.comments = std::mem::take(&mut comments);
            doc.relationships.push(rel);
        } else if let Some(rest) = trimmed.strip_prefix("expression ") {
            doc.expressions.push(parse_expression(rest, block));
        }
        comments.clear();
        idx = end;
    }
    doc
}

/// `// source: <name>` exactly as the emitters write it: unindented, one
/// token, directly above the `table` line.
fn source_marker(line: &str, next: Option<&str>) -> Option<String> {
    let name = line.strip_prefix(SOURCE_MARKER)?.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    next.filter(|n| n.starts_with("table "))?;
    Some(name.to_string())
}

fn parse_table(header: &str, block: &[&str]) -> TableBlock {
    let (name, _) = split_name(header);
    let mut table = TableBlock {
        name,
        ..TableBlock::default()
    };
    let Some(first_child) = block.iter().skip(1).find(|l| !l.trim().is_empty()) else {
        return table;
    };
    let child_indent = indent_of(first_child);

    let mut doc_lines: Vec<&str> = Vec::new();
    let mut idx = 1;
    while idx < block.len() {
        let line = block[idx];
        let trimmed = line.trim();
        if trimmed.is_empty() {
            idx += 1;
            continue;
        }
        let indent = indent_of(line);
        if indent != child_indent {
            idx += 1;
            continue;
        }
        if trimmed.starts_with("///") {
            doc_lines.push(line);
            idx += 1;
            continue;
        }

        let end = block_end(block, idx, indent);
        let child = &block[idx..end];

        if let Some(tag) = property(trimmed, "lineageTag") {
            table.lineage_tag = Some(tag.to_string());
        } else if let Some(rest) = trimmed.strip_prefix("column ") {
            let mut column = parse_column(rest, child);
            column.description = description_from(&doc_lines);
            table.columns.push(column);
        } else if let Some(rest) = trimmed.strip_prefix("measure ") {
            let mut measure = parse_measure(rest, child);
            if !doc_lines.is_empty() {
                let mut raw = doc_lines.join("\n");
                raw.push('\n');
                raw.push_str(&measure.raw);
                measure.raw = raw;
            }
            table.measures.push(measure);
        }
        doc_lines.clear();
        idx = end;
    }
    table
}

fn description_from(doc_lines: &[&str]) -> Option<String> {
    if doc_lines.is_empty() {
        return None;
    }
    let text = doc_lines
        .iter()
        .map(|l| {
            let t = l.trim().trim_start_matches("///");
            t.strip_prefix(' ').unwrap_or(t)
        })
        .collect::<Vec<_>>()
        .join("\n");
    Some(text)
}

fn parse_column(header: &str, block: &[&str]) -> ColumnBlock {
    let (name, _) = split_name(header);
    let mut column = ColumnBlock {
        name,
        ..ColumnBlock::default()
    };
    for line in block.iter().skip(1) {
        let t = line.trim();
        if t == "isHidden" || property(t, "isHidden") == Some("true") {
            column.is_hidden = true;
        } else if let Some(v) = property(t, "dataType") {
            column.data_type = Some(v.to_string());
        } else if let Some(v) = property(t, "formatString") {
            column.format_string = Some(v.to_string());
        } else if let Some(v) = property(t, "lineageTag") {
            column.lineage_tag = Some(v.to_string());
        } else if let Some(v) = property(t, "summarizeBy") {
            column.summarize_by = Some(v.to_string());
        } else if let Some(v) = property(t, "sourceColumn") {
            column.source_column = Some(v.to_string());
        } else if let Some(pair) = annotation(t) {
            column.annotations.push(pair);
        }
    }
    column
}

fn parse_measure(header: &str, block: &[&str]) -> MeasureBlock {
    let (name, rest) = split_name(header);
    let mut expression = rest
        .trim_start()
        .strip_prefix('=')
        .unwrap_or("")
        .trim()
        .to_string();
    let mut lineage_tag = None;
    let header_indent = block.first().map_or(0, |l| indent_of(l));
    let mut in_properties = false;
    for line in block.iter().skip(1) {
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        if let Some(v) = property(t, "lineageTag") {
            lineage_tag = Some(v.to_string());
            in_properties = true;
        } else if !in_properties
            && indent_of(line) > header_indent + 1
            && !t.contains(": ")
        {
            if !expression.is_empty() {
                expression.push('\n');
            }
            expression.push_str(t);
        } else {
            in_properties = true;
        }
    }
    MeasureBlock {
        name,
        expression,
        lineage_tag,
        raw: block.join("\n"),
    }
}

fn parse_relationship(header: &str, block: &[&str]) -> RelationshipBlock {
    let mut rel = RelationshipBlock {
        id: header.trim().to_string(),
        is_active: true,
        raw: block.join("\n"),
        ..RelationshipBlock::default()
    };
    for line in block.iter().skip(1) {
        let t = line.trim();
        if let Some(v) = property(t, "fromColumn") {
            rel.from_column = split_qualified(v);
        } else if let Some(v) = property(t, "toColumn") {
            rel.to_column = split_qualified(v);
        } else if let Some(v) = property(t, "isActive") {
            rel.is_active = v != "false";
        } else if let Some(v) = property(t, "crossFilteringBehavior") {
            rel.cross_filter_both = v == "bothDirections";
        } else if let Some(pair) = annotation(t) {
            rel.annotations.push(pair);
        }
    }
    rel
}

fn parse_expression(header: &str, block: &[&str]) -> ExpressionBlock {
    let (name, _) = split_name(header);
    let lineage_tag = block
        .iter()
        .skip(1)
        .find_map(|l| property(l.trim(), "lineageTag"))
        .map(str::to_string);
    ExpressionBlock {
        name,
        lineage_tag,
        raw: block.join("\n"),
    }
}
