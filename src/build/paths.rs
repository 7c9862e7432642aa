//! Output layout and path-safety checks.
//!
//! All paths inside a definition tree are relative and `/`-separated.

/// Folder holding one file per table.
pub const TABLES_DIR: &str = "tables";

/// File holding every relationship block.
pub const RELATIONSHIPS_FILE: &str = "relationships.tmdl";

/// File holding shared M expressions.
pub const EXPRESSIONS_FILE: &str = "expressions.tmdl";

/// Extension of every definition file.
pub const TMDL_EXTENSION: &str = ".tmdl";

/// A caller-supplied name that cannot be used as a file name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Empty name cannot be used as a file name")]
    Empty,

    #[error("Name '{0}' would escape the output directory")]
    Traversal(String),

    #[error("Name '{name}' contains the reserved character {ch:?}")]
    ReservedCharacter { name: String, ch: char },

    #[error("Name '{0}' ends with a space or dot")]
    TrailingDotOrSpace(String),
}

const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Check a name before it is substituted into a file path.
pub fn validate_file_name(name: &str) -> Result<(), PathError> {
    if name.trim().is_empty() {
        return Err(PathError::Empty);
    }
    if name == "." || name == ".." || name.contains("..") {
        return Err(PathError::Traversal(name.to_string()));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| RESERVED.contains(c) || c.is_control())
    {
        return Err(PathError::ReservedCharacter {
            name: name.to_string(),
            ch,
        });
    }
    if name.ends_with('.') || name.ends_with(' ') {
        return Err(PathError::TrailingDotOrSpace(name.to_string()));
    }
    Ok(())
}

/// `tables/<name>.tmdl`, after checking the name.
pub fn table_file(display_name: &str) -> Result<String, PathError> {
    validate_file_name(display_name)?;
    Ok(format!("{TABLES_DIR}/{display_name}{TMDL_EXTENSION}"))
}

/// Whether a tree-relative path is a table file.
pub fn is_table_file(rel: &str) -> bool {
    rel.strip_prefix(TABLES_DIR)
        .and_then(|r| r.strip_prefix('/'))
        .is_some_and(|r| !r.contains('/') && r.ends_with(TMDL_EXTENSION))
}
