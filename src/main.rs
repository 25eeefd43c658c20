//! Command-line collaborator for the filesig core.
//!
//! `analyze <file>` and `batch <directory>` emit one report per file.
//! Exit code is 0 when the scan itself completes, regardless of verdicts;
//! catalog-load and root I/O failures exit non-zero.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use filesig::analyze::{analyze_batch, analyze_path};
use filesig::catalog::Catalog;
use filesig::config::ScanConfig;
use filesig::report::FileReport;
use filesig::verdict::ArchiveContext;

#[derive(Debug, Parser)]
#[command(name = "filesig", about = "Identify file formats and flag extension spoofing")]
struct Cli {
    /// Path to a JSON signature source; defaults to the embedded database.
    #[arg(long, global = true)]
    signatures: Option<PathBuf>,

    /// Path to a JSON scan configuration override.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a single file.
    Analyze {
        file: PathBuf,
        /// Set when an archive collaborator found an embedded executable.
        #[arg(long)]
        embedded_executable: bool,
    },
    /// Analyze every regular file under a directory.
    Batch {
        directory: PathBuf,
        /// Worker pool size; 0 uses one worker per logical CPU.
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        filesig::logging::init_tracing_json();
    } else {
        filesig::logging::init_tracing();
    }

    let loaded;
    let catalog: &Catalog = match &cli.signatures {
        Some(path) => {
            loaded = Catalog::load_path(path)
                .with_context(|| format!("loading signature source {}", path.display()))?;
            &loaded
        }
        None => Catalog::builtin(),
    };
    let mut config = match &cli.config {
        Some(path) => ScanConfig::load_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ScanConfig::default(),
    };

    match &cli.command {
        Command::Analyze {
            file,
            embedded_executable,
        } => {
            let context = ArchiveContext {
                contains_embedded_executable: *embedded_executable,
            };
            let report = analyze_path(file, catalog, &config, &context)
                .with_context(|| format!("analyzing {}", file.display()))?;
            emit_reports(std::slice::from_ref(&report), &cli)?;
        }
        Command::Batch { directory, workers } => {
            if let Some(workers) = *workers {
                config.batch.workers = workers;
            }
            let paths = collect_files(directory)
                .with_context(|| format!("walking {}", directory.display()))?;
            info!(files = paths.len(), directory = %directory.display(), "batch scan");
            let batch = analyze_batch(&paths, catalog, &config);
            match cli.format {
                OutputFormat::Json => {
                    let out = if cli.pretty {
                        serde_json::to_string_pretty(&batch)?
                    } else {
                        serde_json::to_string(&batch)?
                    };
                    println!("{out}");
                }
                OutputFormat::Csv => emit_reports(&batch.results, &cli)?,
            }
        }
    }
    Ok(())
}

fn emit_reports(reports: &[FileReport], cli: &Cli) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => {
            for report in reports {
                let out = if cli.pretty {
                    serde_json::to_string_pretty(report)?
                } else {
                    serde_json::to_string(report)?
                };
                println!("{out}");
            }
        }
        OutputFormat::Csv => {
            println!("{}", FileReport::csv_header());
            for report in reports {
                println!("{}", report.to_csv_row());
            }
        }
    }
    Ok(())
}

/// Recursively collect regular files under a directory. Symlinks are not
/// followed, so walker cycles cannot occur.
fn collect_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    Ok(files)
}
