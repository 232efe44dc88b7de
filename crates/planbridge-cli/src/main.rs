//! Planbridge CLI
//!
//! Command-line tool for converting, validating, and merging planning data
//! between backup files, CSV documents, and sheet grids.

use clap::{Parser, Subcommand};
use planbridge_core::{
    apply_import, load_backup, read_document, registry, write_document_file, Backup, EntityKind,
    ImportOptions, Imported, MergeMode, Restored,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "planbridge")]
#[command(about = "Planning data interchange and merge tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV document and show what it contains
    Parse {
        /// Path to the CSV document
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write a backup as a CSV document
    Export {
        /// Path to the backup file (JSON)
        #[arg(short, long)]
        backup: PathBuf,

        /// Output CSV document
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a CSV document or another backup into an existing backup
    Import {
        /// Backup holding the existing data
        #[arg(short, long)]
        existing: PathBuf,

        /// CSV document to import
        #[arg(short, long, conflicts_with = "from_backup", required_unless_present = "from_backup")]
        document: Option<PathBuf>,

        /// Backup file to import
        #[arg(long)]
        from_backup: Option<PathBuf>,

        /// Import options file (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Merge mode (merge or overwrite), overrides the options file
        #[arg(short, long)]
        mode: Option<MergeMode>,

        /// Only import these kinds (comma-separated, e.g. stories,goals)
        #[arg(long)]
        only: Option<String>,

        /// Also replace settings
        #[arg(long)]
        settings: bool,

        /// Output backup file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check a backup and report what a restore would drop
    Validate {
        /// Path to the backup file (JSON)
        #[arg(short, long)]
        backup: PathBuf,
    },

    /// Print one kind from a backup as sheet rows
    Rows {
        /// Path to the backup file (JSON)
        #[arg(short, long)]
        backup: PathBuf,

        /// Entity kind (e.g. stories, important-dates, settings)
        #[arg(short, long)]
        kind: String,

        /// Include the column-key header row
        #[arg(long)]
        header: bool,
    },

    /// Create an import options file template
    TemplateOptions {
        /// Output path for the options file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> planbridge_core::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("planbridge_core={},planbridge={}", cli.log_level, cli.log_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Export { backup, output } => cmd_export(&backup, &output),
        Commands::Import {
            existing,
            document,
            from_backup,
            options,
            mode,
            only,
            settings,
            output,
        } => {
            let options = build_options(options.as_deref(), mode, only.as_deref(), settings)?;
            cmd_import(&existing, document.as_deref(), from_backup.as_deref(), &options, &output)
        }
        Commands::Validate { backup } => cmd_validate(&backup),
        Commands::Rows { backup, kind, header } => cmd_rows(&backup, &kind, header),
        Commands::TemplateOptions { output } => cmd_template_options(&output),
    }
}

fn cmd_parse(file: &Path) -> planbridge_core::Result<()> {
    let doc = read_document(file)?;
    let has_settings = doc.settings.is_some();
    let (roles, labels) = (doc.roles.len(), doc.labels.len());
    let snapshot = doc.into_snapshot();

    println!("Parsed {}:", file.display());
    println!();
    for spec in registry().iter() {
        let count = match spec.kind {
            EntityKind::Settings => usize::from(has_settings),
            EntityKind::Role => roles,
            EntityKind::Label => labels,
            _ => (spec.rows)(&snapshot).len(),
        };
        if count > 0 {
            println!("  {:<18} {}", spec.schema.section, count);
        }
    }
    println!();
    println!("{} entities", snapshot.collections.total());

    Ok(())
}

fn cmd_export(backup: &Path, output: &Path) -> planbridge_core::Result<()> {
    let restored = restore_reporting(backup)?;
    write_document_file(&restored.snapshot, output)?;

    println!(
        "Wrote {} entities to {}",
        restored.snapshot.collections.total(),
        output.display()
    );
    Ok(())
}

fn build_options(
    path: Option<&Path>,
    mode: Option<MergeMode>,
    only: Option<&str>,
    settings: bool,
) -> planbridge_core::Result<ImportOptions> {
    let mut options = match path {
        Some(path) => ImportOptions::load(path)?,
        None => ImportOptions::default(),
    };

    if let Some(mode) = mode {
        options.mode = mode;
    }

    if let Some(only) = only {
        let keep_settings = options.settings;
        options = ImportOptions::none(options.mode);
        options.settings = keep_settings;
        for name in only.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            options.select(name.parse::<EntityKind>()?, true);
        }
    }

    if settings {
        options.settings = true;
    }

    Ok(options)
}

fn cmd_import(
    existing: &Path,
    document: Option<&Path>,
    from_backup: Option<&Path>,
    options: &ImportOptions,
    output: &Path,
) -> planbridge_core::Result<()> {
    let current = restore_reporting(existing)?;

    let imported: Imported = match (document, from_backup) {
        (Some(doc), _) => read_document(doc)?.into(),
        (None, Some(backup)) => restore_reporting(backup)?.snapshot.into(),
        (None, None) => unreachable!("clap requires a document or a backup"),
    };

    let outcome = apply_import(&current.snapshot, &imported, options);
    Backup::new(outcome.snapshot).save(output)?;

    println!("Import ({}):", outcome.summary.mode);
    for entry in &outcome.summary.collections {
        if entry.selected {
            println!(
                "  {:<18} {} existing + {} imported -> {}",
                entry.kind.section_name(),
                entry.existing,
                entry.imported,
                entry.result
            );
        } else {
            println!("  {:<18} skipped", entry.kind.section_name());
        }
    }
    if outcome.summary.settings_replaced {
        println!("  Settings replaced");
    }
    println!();
    println!("Wrote {}", output.display());

    Ok(())
}

fn cmd_validate(backup: &Path) -> planbridge_core::Result<()> {
    let restored = load_backup(backup)?;
    let report = &restored.report;

    match restored.exported_at {
        Some(at) => println!("Backup exported at {}", at.to_rfc3339()),
        None => println!("Backup has no readable export time"),
    }
    println!("{} entities restorable", restored.snapshot.collections.total());

    if !report.missing.is_empty() {
        println!("Missing collections: {}", report.missing.join(", "));
    }
    if !report.malformed.is_empty() {
        println!("Malformed collections: {}", report.malformed.join(", "));
    }
    if !report.dropped.is_empty() {
        println!("\nDropped items ({}):", report.dropped.len());
        for item in &report.dropped {
            println!("  {}[{}]", item.collection, item.index);
        }
    }
    if report.settings_defaulted {
        println!("Settings absent or invalid; defaults would be used");
    }
    if report.is_clean() {
        println!("OK");
    }

    Ok(())
}

fn cmd_rows(backup: &Path, kind: &str, header: bool) -> planbridge_core::Result<()> {
    let kind: EntityKind = kind.parse()?;
    let spec = registry().get(kind);
    let restored = restore_reporting(backup)?;

    println!("{}", spec.schema.range());

    let mut writer = csv::Writer::from_writer(io::stdout());
    if header {
        writer.write_record(spec.schema.keys())?;
    }
    for row in (spec.rows)(&restored.snapshot) {
        writer.write_record(&row.cells)?;
    }
    writer.flush()?;

    Ok(())
}

fn cmd_template_options(output: &Path) -> planbridge_core::Result<()> {
    let options = ImportOptions::default();
    options.save(output)?;

    println!("Created options file: {}", output.display());
    println!();
    println!("Edit the file to choose what to import, then run:");
    println!(
        "  planbridge import --existing <backup> --document <csv> --options {} --output <backup>",
        output.display()
    );

    Ok(())
}

/// Load a backup, logging anything the restore left out
fn restore_reporting(path: &Path) -> planbridge_core::Result<Restored> {
    let restored = load_backup(path)?;
    if !restored.report.is_clean() {
        warn!(
            path = %path.display(),
            dropped = restored.report.dropped.len(),
            malformed = restored.report.malformed.len(),
            "backup restored with omissions"
        );
    }
    info!(path = %path.display(), entities = restored.snapshot.collections.total(), "loaded backup");
    Ok(restored)
}
