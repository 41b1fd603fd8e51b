//! Command-line interface for sheetmerge
//!
//! Lists selectable keys, prints placeholder mappings as JSON, and renders
//! docx templates from a local spreadsheet or JSON snapshot.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sheetmerge::{
    AccessKind, LayoutConfig, Merger, MergerBuilder, RawTable, SelectionKey, SheetSelector,
    TableSource,
};
use tracing::debug;

/// Generate documents from a spreadsheet of records
#[derive(Debug, Parser)]
#[command(name = "sheetmerge", version, about)]
struct Cli {
    /// JSON layout configuration (region offsets, fixed fields, projection)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the job titles and level hierarchies that can be selected
    Keys(SourceArgs),

    /// Print the placeholder mapping as JSON
    Mapping {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Render a docx template with the selected record
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Template to render (defaults to the configured template path)
        #[arg(long, value_name = "PATH")]
        template: Option<PathBuf>,

        /// Output document
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
}

/// Where the table is read from
#[derive(Debug, Args)]
struct SourceArgs {
    /// Directory that names and keys are resolved against
    #[arg(long, default_value = ".", value_name = "DIR")]
    root: PathBuf,

    /// Spreadsheet name without extension
    #[arg(long, conflicts_with_all = ["key", "url"])]
    name: Option<String>,

    /// Exact file name inside the root directory
    #[arg(long, conflicts_with = "url")]
    key: Option<String>,

    /// file:// URL of the spreadsheet
    #[arg(long)]
    url: Option<String>,

    /// Worksheet name (defaults to the first worksheet)
    #[arg(long, conflicts_with = "sheet_index")]
    sheet: Option<String>,

    /// Worksheet index, 0-based
    #[arg(long)]
    sheet_index: Option<usize>,
}

impl SourceArgs {
    fn target(&self) -> Result<(AccessKind, &str)> {
        match (&self.name, &self.key, &self.url) {
            (Some(name), _, _) => Ok((AccessKind::Name, name.as_str())),
            (_, Some(key), _) => Ok((AccessKind::Key, key.as_str())),
            (_, _, Some(url)) => Ok((AccessKind::Url, url.as_str())),
            _ => anyhow::bail!("one of --name, --key or --url is required"),
        }
    }

    fn sheet_selector(&self) -> SheetSelector {
        match (&self.sheet, self.sheet_index) {
            (Some(name), _) => SheetSelector::Name(name.clone()),
            (None, Some(index)) => SheetSelector::Index(index),
            (None, None) => SheetSelector::First,
        }
    }
}

#[derive(Debug, Args)]
struct SelectionArgs {
    /// Job title of the record to select
    #[arg(long)]
    job_title: Option<String>,

    /// Level hierarchy of the record to select
    #[arg(long)]
    level: Option<String>,
}

impl SelectionArgs {
    fn key(&self) -> Result<Option<SelectionKey>> {
        Ok(SelectionKey::parse(
            self.job_title.as_deref(),
            self.level.as_deref(),
        )?)
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(error) = run(cli) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

/// Set up structured logging on stderr; `RUST_LOG` overrides `-v`
fn setup_logging(verbose: u8) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sheetmerge={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let layout = load_layout(cli.config.as_ref())?;

    match cli.command {
        Command::Keys(source) => {
            let (merger, table) = load(&layout, &source)?;
            let catalog = merger.key_catalog(&table)?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        Command::Mapping { source, selection } => {
            let key = selection.key()?;
            let (merger, table) = load(&layout, &source)?;
            let mapping = merger.mapping(&table, key.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&mapping)?);
        }
        Command::Generate {
            source,
            selection,
            template,
            output,
        } => {
            let key = selection.key()?;
            let (merger, table) = load(&layout, &source)?;
            let template = template.unwrap_or_else(|| merger.config().template_path.clone());
            merger
                .generate_document_with_template(&table, key.as_ref(), &template, &output)
                .with_context(|| {
                    format!(
                        "Failed to render {} into {}",
                        template.display(),
                        output.display()
                    )
                })?;
            println!("{}", output.display());
        }
    }

    Ok(())
}

fn load_layout(path: Option<&PathBuf>) -> Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let file = File::open(path)
        .with_context(|| format!("Failed to open configuration {}", path.display()))?;
    let layout = LayoutConfig::from_json_reader(BufReader::new(file))
        .with_context(|| format!("Invalid configuration {}", path.display()))?;
    debug!(config = %path.display(), "Loaded layout configuration");
    Ok(layout)
}

fn load(layout: &LayoutConfig, source: &SourceArgs) -> Result<(Merger, RawTable)> {
    let merger = MergerBuilder::new()
        .with_layout(layout.clone())
        .with_sheet_selector(source.sheet_selector())
        .build()?;

    let (access, identifier) = source.target()?;
    let table = merger
        .source(&source.root)
        .fetch(access, identifier)
        .with_context(|| format!("Failed to load table ({} '{}')", access, identifier))?;

    Ok((merger, table))
}
