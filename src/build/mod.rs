//! Build orchestration.
//!
//! ```text
//! Builder ──analyze()──> Analyzed ──apply()───> ApplyReport
//!                            └─────abandon()──> (nothing written)
//! ```
//!
//! `analyze` only reads. `apply` consumes the analysis, so a build can be
//! applied at most once; re-running from a fresh `analyze` is always safe
//! because generation is idempotent over the previous tree.

pub mod fingerprint;
pub mod paths;
pub mod report;
pub mod store;
pub mod tree;

pub use fingerprint::compute_hash;
pub use report::{CollectingReporter, ReportLevel, Reporter, TracingReporter};
pub use store::{FileStore, LocalFileStore};
pub use tree::DefinitionTree;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::diff::{analyze_changes, annotate_repairs, ChangeRecord};
use crate::emitter::{render_model, EmitError, ModelOutput, RepairedRelationship};
use crate::lineage::LineageStore;
use crate::schema::SchemaModel;
use crate::validation::{validate, ValidationError};
use paths::{EXPRESSIONS_FILE, TABLES_DIR};

/// Error type for builds.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup failed, nothing was written: {0}")]
    Backup(std::io::Error),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("Schema model has {} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("Failed to fingerprint schema model: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Options for [`Builder`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Copy the previous tree before overwriting anything.
    pub backup: bool,
    /// Parent folder for timestamped backups; `<definition>/../.backups` when unset.
    pub backup_dir: Option<PathBuf>,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backup(mut self, enabled: bool) -> Self {
        self.backup = enabled;
        self
    }

    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }
}

/// Idle build: a Schema Model and the folder it regenerates.
pub struct Builder {
    model: SchemaModel,
    definition_dir: PathBuf,
    options: BuildOptions,
    store: Arc<dyn FileStore>,
}

impl Builder {
    pub fn new(model: SchemaModel, definition_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            definition_dir: definition_dir.into(),
            options: BuildOptions::default(),
            store: Arc::new(LocalFileStore),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.store = store;
        self
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    pub fn definition_dir(&self) -> &Path {
        &self.definition_dir
    }

    /// Read the previous tree and render the new one. Writes nothing.
    ///
    /// Validation errors do not fail analysis; they are kept for the preview
    /// and make [`Analyzed::apply`] refuse to write. Rendering errors (unsafe
    /// names, colliding paths) are fatal.
    pub fn analyze(&self, reporter: &dyn Reporter) -> BuildResult<Analyzed<'_>> {
        let previous = DefinitionTree::load(self.store.as_ref(), &self.definition_dir)?;
        reporter.info(&format!(
            "Read {} existing definition file(s) from {}",
            previous.len(),
            self.definition_dir.display()
        ));

        // Read phase completes before any table renders
        let lineage = LineageStore::load(&previous);

        let validation_errors = validate(&self.model).err().unwrap_or_default();
        for error in &validation_errors {
            reporter.warn(&error.to_string());
        }

        let output = match render_model(&self.model, &previous, &lineage) {
            Ok(output) => output,
            Err(_) if !validation_errors.is_empty() => {
                return Err(BuildError::Validation(validation_errors));
            }
            Err(e) => return Err(e.into()),
        };
        for notice in &output.notices {
            reporter.warn(notice);
        }
        for repair in &output.repaired {
            reporter.warn(&format!("Dropped relationship {}: {}", repair.key, repair.reason));
        }

        let mut changes = analyze_changes(&previous, &output.tree);
        annotate_repairs(&mut changes, &output.repaired);
        let fingerprint = compute_hash(&self.model)?;

        info!(
            changes = changes.len(),
            validation_errors = validation_errors.len(),
            %fingerprint,
            "analysis complete"
        );

        Ok(Analyzed {
            builder: self,
            previous,
            output,
            changes,
            validation_errors,
            fingerprint,
        })
    }
}

/// A rendered build awaiting approval.
pub struct Analyzed<'a> {
    builder: &'a Builder,
    previous: DefinitionTree,
    output: ModelOutput,
    changes: Vec<ChangeRecord>,
    validation_errors: Vec<ValidationError>,
    fingerprint: String,
}

/// What [`Analyzed::apply`] did.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub written: Vec<String>,
    pub unchanged: usize,
    pub removed: Vec<String>,
    pub backup: Option<PathBuf>,
    pub changes: Vec<ChangeRecord>,
}

impl<'a> Analyzed<'a> {
    /// The ordered preview.
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn validation_errors(&self) -> &[ValidationError] {
        &self.validation_errors
    }

    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// SHA-256 of the Schema Model this analysis was made from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The tree that `apply` would write.
    pub fn tree(&self) -> &DefinitionTree {
        &self.output.tree
    }

    pub fn previous(&self) -> &DefinitionTree {
        &self.previous
    }

    pub fn repaired(&self) -> &[RepairedRelationship] {
        &self.output.repaired
    }

    /// Unsupported filter constructs found while rendering.
    pub fn notices(&self) -> &[String] {
        &self.output.notices
    }

    /// Previous files that `apply` would delete.
    pub fn stale_files(&self) -> Vec<String> {
        let mut stale = self.output.stale.clone();
        if self.previous.contains(EXPRESSIONS_FILE) && !self.output.tree.contains(EXPRESSIONS_FILE) {
            stale.push(EXPRESSIONS_FILE.to_string());
        }
        stale
    }

    /// Write the rendered tree.
    ///
    /// Refuses on validation errors. When backups are enabled the previous
    /// tree is copied first; a failed backup aborts before any write.
    pub fn apply(self, reporter: &dyn Reporter) -> BuildResult<ApplyReport> {
        if !self.validation_errors.is_empty() {
            return Err(BuildError::Validation(self.validation_errors));
        }

        let builder = self.builder;
        let store = builder.store.as_ref();
        let root = builder.definition_dir.as_path();
        let mut report = ApplyReport::default();

        if builder.options.backup && !self.previous.is_empty() {
            let dir = builder
                .options
                .backup_dir
                .clone()
                .unwrap_or_else(|| default_backup_dir(root))
                .join(chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string());
            let copied = store.copy_tree(root, &dir).map_err(BuildError::Backup)?;
            reporter.info(&format!("Backed up {} file(s) to {}", copied, dir.display()));
            report.backup = Some(dir);
        }

        store.create_dir_all(&root.join(TABLES_DIR))?;

        // A stale path differing from a new one only in case names the same
        // file on case-insensitive filesystems, so it goes before any write.
        let (clashing, stale): (Vec<String>, Vec<String>) =
            self.stale_files().into_iter().partition(|rel| {
                self.output
                    .tree
                    .files()
                    .any(|(produced, _)| produced.to_lowercase() == rel.to_lowercase())
            });
        for rel in clashing {
            debug!(path = %rel, "removing stale file before case-only rename");
            store.remove_file(&root.join(&rel))?;
            report.removed.push(rel);
        }

        let total = self.output.tree.len();
        for (i, (rel, text)) in self.output.tree.files().enumerate() {
            reporter.progress("write", i + 1, total);
            if self.previous.get(rel) == Some(text) {
                report.unchanged += 1;
                continue;
            }
            debug!(path = rel, "writing");
            store.write_text(&root.join(rel), text)?;
            report.written.push(rel.to_string());
        }

        for rel in stale {
            debug!(path = %rel, "removing stale file");
            store.remove_file(&root.join(&rel))?;
            report.removed.push(rel);
        }

        reporter.info(&format!(
            "Wrote {} file(s), {} unchanged, {} removed",
            report.written.len(),
            report.unchanged,
            report.removed.len()
        ));
        report.changes = self.changes;
        Ok(report)
    }

    /// Drop the analysis. Nothing was written, so there is nothing to undo.
    pub fn abandon(self) {
        debug!("build abandoned");
    }
}

fn default_backup_dir(definition_dir: &Path) -> PathBuf {
    definition_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join(".backups")
}
