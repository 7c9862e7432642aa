//! Modelsmith CLI - regenerate TMDL semantic model definitions
//!
//! Usage:
//!   modelsmith analyze --schema <dictionary.json> [--config <modelsmith.toml>] [--format json]
//!   modelsmith apply --schema <dictionary.json> [--config <modelsmith.toml>] [--no-backup] [--yes]
//!   modelsmith translate --filter <view.xml> [--dialect fabric] [--materialized]
//!   modelsmith validate --schema <dictionary.json>
//!
//! Examples:
//!   modelsmith analyze --schema metadata/sales.json
//!   modelsmith apply --schema metadata/sales.json --yes
//!   RUST_LOG=debug modelsmith translate --filter views/open_opportunities.xml

use clap::{Parser, Subcommand, ValueEnum};
use modelsmith::build::{BuildOptions, Builder, TracingReporter};
use modelsmith::config::Settings;
use modelsmith::diff::has_breaking;
use modelsmith::fetchxml::{translate, TranslateOptions};
use modelsmith::schema::loader::MetadataDictionary;
use modelsmith::sql::Dialect;
use modelsmith::validation::validate;
use modelsmith::SchemaModel;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "modelsmith")]
#[command(about = "Modelsmith - regenerate TMDL semantic models without losing user edits")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Path to the exported metadata dictionary (JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Path to modelsmith.toml (default lookup when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the definition folder from the config
    #[arg(short, long)]
    definition: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a build would change, without writing
    Analyze {
        #[command(flatten)]
        model: ModelArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Build and write the definition folder
    Apply {
        #[command(flatten)]
        model: ModelArgs,

        /// Skip the backup of the previous definition folder
        #[arg(long)]
        no_backup: bool,

        /// Approve the previewed changes
        #[arg(short, long)]
        yes: bool,
    },

    /// Translate a FetchXML filter to a SQL WHERE fragment
    Translate {
        /// Path to the filter document
        #[arg(short, long)]
        filter: PathBuf,

        /// SQL dialect to generate
        #[arg(short, long, default_value = "tds")]
        dialect: DialectArg,

        /// Translate for an imported (materialized) table
        #[arg(long)]
        materialized: bool,

        /// Fixed offset for date comparisons, in minutes east of UTC
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        utc_offset: i32,
    },

    /// Validate a metadata dictionary without generating anything
    Validate {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Tds,
    Fabric,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Tds => Dialect::DataverseTds,
            DialectArg::Fabric => Dialect::FabricLink,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One line per change
    Text,
    /// Change list as JSON
    Json,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { model, format } => cmd_analyze(model, format),
        Commands::Apply {
            model,
            no_backup,
            yes,
        } => cmd_apply(model, no_backup, yes),
        Commands::Translate {
            filter,
            dialect,
            materialized,
            utc_offset,
        } => cmd_translate(filter, dialect, materialized, utc_offset),
        Commands::Validate { model } => cmd_validate(model),
    }
}

struct Loaded {
    settings: Settings,
    model: SchemaModel,
    definition_dir: PathBuf,
}

fn load(args: &ModelArgs) -> Result<Loaded, String> {
    let settings = match &args.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
    .map_err(|e| format!("Error loading config: {}", e))?;

    let connection = settings
        .connection
        .resolve()
        .map_err(|e| format!("Invalid connection settings: {}", e))?;
    let model = MetadataDictionary::from_file(&args.schema)
        .and_then(|dict| dict.into_model(connection, &settings.model))
        .map_err(|e| format!("Error loading '{}': {}", args.schema.display(), e))?;

    let definition_dir = match &args.definition {
        Some(dir) => dir.clone(),
        None => settings
            .output
            .resolved_definition_dir()
            .map_err(|e| format!("Invalid output settings: {}", e))?,
    };

    Ok(Loaded {
        settings,
        model,
        definition_dir,
    })
}

fn cmd_analyze(args: ModelArgs, format: OutputFormat) -> ExitCode {
    let loaded = match load(&args) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let builder = Builder::new(loaded.model, loaded.definition_dir);
    let analyzed = match builder.analyze(&TracingReporter) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match format {
        OutputFormat::Text => {
            if analyzed.changes().is_empty() {
                println!("No changes.");
            }
            for change in analyzed.changes() {
                println!("{}", change);
            }
            for error in analyzed.validation_errors() {
                println!("error: {}", error);
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(analyzed.changes()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing changes: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    if analyzed.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn cmd_apply(args: ModelArgs, no_backup: bool, yes: bool) -> ExitCode {
    let loaded = match load(&args) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut options = BuildOptions::new().backup(loaded.settings.output.backup && !no_backup);
    match loaded.settings.output.resolved_backup_dir() {
        Ok(dir) => options = options.backup_dir(dir),
        Err(e) => {
            eprintln!("Invalid output settings: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let builder = Builder::new(loaded.model, loaded.definition_dir).with_options(options);
    let reporter = TracingReporter;
    let analyzed = match builder.analyze(&reporter) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for change in analyzed.changes() {
        println!("{}", change);
    }
    if !analyzed.is_valid() {
        eprintln!("Validation errors:");
        for error in analyzed.validation_errors() {
            eprintln!("  {}", error);
        }
        return ExitCode::FAILURE;
    }
    if !yes {
        if has_breaking(analyzed.changes()) {
            println!("Preview contains breaking changes.");
        }
        println!("Nothing written; re-run with --yes to apply.");
        analyzed.abandon();
        return ExitCode::SUCCESS;
    }

    match analyzed.apply(&reporter) {
        Ok(report) => {
            if let Some(dir) = &report.backup {
                println!("Backup: {}", dir.display());
            }
            println!(
                "Applied: {} written, {} unchanged, {} removed",
                report.written.len(),
                report.unchanged,
                report.removed.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Apply failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_translate(filter: PathBuf, dialect: DialectArg, materialized: bool, utc_offset: i32) -> ExitCode {
    let xml = match fs::read_to_string(&filter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filter.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let options = TranslateOptions::new(dialect.into())
        .materialized(materialized)
        .with_utc_offset(utc_offset);
    let translation = translate(&xml, &options);

    match &translation.clause {
        Some(clause) => println!("{}", clause),
        None => println!("-- no filter"),
    }
    for feature in &translation.unsupported {
        eprintln!("unsupported: {}", feature);
    }
    ExitCode::SUCCESS
}

fn cmd_validate(args: ModelArgs) -> ExitCode {
    let loaded = match load(&args) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match validate(&loaded.model) {
        Ok(()) => {
            println!("OK: {} is valid", args.schema.display());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            eprintln!("Validation errors:");
            for error in &errors {
                eprintln!("  {}", error);
            }
            ExitCode::FAILURE
        }
    }
}
