//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with square brackets.
/// Used by: both dialects (T-SQL family)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Whether an identifier can be written bare.
pub fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_identifier(ident: &str) -> String {
    ident
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Bare identifier when safe, bracketed otherwise.
/// Used by: tds, whose endpoint accepts bare logical names
pub fn quote_bracket_if_needed(ident: &str) -> String {
    if is_plain_identifier(ident) {
        ident.to_string()
    } else {
        quote_bracket(ident)
    }
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with N prefix for Unicode.
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

/// `N'...'` for non-ASCII text, plain `'...'` otherwise.
pub fn quote_string_tsql(s: &str) -> String {
    if s.is_ascii() {
        quote_string_single(s)
    } else {
        quote_string_unicode(s)
    }
}

// =============================================================================
// LIKE patterns
// =============================================================================

/// Escape `%`, `_` and `[` so a value matches literally inside a LIKE pattern.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' => out.push_str("[[]"),
            '%' => out.push_str("[%]"),
            '_' => out.push_str("[_]"),
            other => out.push(other),
        }
    }
    out
}

// =============================================================================
// Choice labels
// =============================================================================

/// Correlated sub-select aggregating the labels of a semicolon-encoded
/// multi-select value.
///
/// `source` is the raw column reference. `on` joins `label_table` and refers
/// to `v.value` as the option code.
pub fn multi_select_subquery(source: &str, label_table: &str, label_column: &str, on: &str) -> String {
    format!(
        "(SELECT STRING_AGG({label_column}, '; ') FROM STRING_SPLIT(CAST({source} AS NVARCHAR(4000)), ';') AS v JOIN {label_table} ON {on})"
    )
}
