//! TMDL formatting utilities.
//!
//! Provides name quoting, string escaping for the embedded DAX and M
//! languages, newline normalization, and indentation management.

/// Check if a name can be written bare.
///
/// Bare names start with a letter or underscore, followed by letters,
/// digits, or underscores.
#[must_use]
pub fn is_bare_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an object name if needed.
///
/// Returns the name as-is if it is bare, otherwise wraps it in single quotes
/// with embedded quotes doubled: `'O''Brien Accounts'`.
#[must_use]
pub fn quote_name(name: &str) -> String {
    if is_bare_name(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Always single-quote a table name, as DAX table references require.
#[must_use]
pub fn quote_table_ref(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// `'Table'[Column]` reference for DAX expressions.
#[must_use]
pub fn dax_column_ref(table: &str, column: &str) -> String {
    format!("{}[{}]", quote_table_ref(table), column.replace(']', "]]"))
}

/// Quote a DAX string literal.
#[must_use]
pub fn dax_string(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Escape text for a Power Query (M) string literal.
///
/// Quotes are doubled and control characters use `#(lf)`-style escapes, so a
/// multi-line SQL statement fits on one line.
#[must_use]
pub fn m_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\"\""),
            '\n' => out.push_str("#(lf)"),
            '\r' => out.push_str("#(cr)"),
            '\t' => out.push_str("#(tab)"),
            '#' => out.push_str("#(#)"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Split a leading (possibly quoted) name off `s`.
///
/// Returns the unquoted name and the remainder after it.
#[must_use]
pub fn split_name(s: &str) -> (String, &str) {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if let Some(&(_, '\'')) = chars.peek() {
                    name.push('\'');
                    chars.next();
                    continue;
                }
                return (name, &rest[i + 1..]);
            }
            name.push(c);
        }
        (name, "")
    } else {
        let end = s
            .find(|c: char| c.is_whitespace() || c == '=' || c == '.' || c == ':')
            .unwrap_or(s.len());
        (s[..end].to_string(), &s[end..])
    }
}

/// Split a `Table.Column` reference with either part optionally quoted.
#[must_use]
pub fn split_qualified(s: &str) -> Option<(String, String)> {
    let (table, rest) = split_name(s);
    let rest = rest.strip_prefix('.')?;
    let (column, tail) = split_name(rest);
    if table.is_empty() || column.is_empty() || !tail.trim().is_empty() {
        return None;
    }
    Some((table, column))
}

/// Normalize text read from disk: strip a BOM, convert CRLF/CR to LF.
#[must_use]
pub fn normalize_newlines(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Convert LF text to the CRLF form written to disk.
#[must_use]
pub fn to_crlf(text: &str) -> String {
    normalize_newlines(text).replace('\n', "\r\n")
}

/// A writer that manages tab indentation for TMDL output.
#[derive(Debug, Default)]
pub struct IndentWriter {
    buffer: String,
    current_indent: usize,
}

impl IndentWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increase indentation level.
    pub fn indent(&mut self) {
        self.current_indent += 1;
    }

    /// Decrease indentation level.
    pub fn dedent(&mut self) {
        self.current_indent = self.current_indent.saturating_sub(1);
    }

    /// Write a complete line (with newline at end).
    pub fn write_line(&mut self, s: &str) {
        for _ in 0..self.current_indent {
            self.buffer.push('\t');
        }
        self.buffer.push_str(s);
        self.buffer.push('\n');
    }

    /// Write `key: value` at the current level.
    pub fn write_property(&mut self, key: &str, value: &str) {
        self.write_line(&format!("{key}: {value}"));
    }

    /// Write pre-indented text verbatim, one line at a time.
    pub fn write_raw(&mut self, text: &str) {
        for line in text.lines() {
            self.buffer.push_str(line);
            self.buffer.push('\n');
        }
    }

    /// Write a blank line; consecutive blank lines collapse into one.
    pub fn blank_line(&mut self) {
        if !self.buffer.is_empty() && !self.buffer.ends_with("\n\n") {
            self.buffer.push('\n');
        }
    }

    /// Write a `//` comment line.
    pub fn write_comment(&mut self, comment: &str) {
        self.write_line(&format!("// {comment}"));
    }

    /// Write `///` description lines.
    pub fn write_description(&mut self, description: &str) {
        for line in description.lines() {
            self.write_line(&format!("/// {line}"));
        }
    }

    /// Consume the writer and return the final string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }
}
