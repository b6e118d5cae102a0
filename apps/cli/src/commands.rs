//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pbrtjson_core::assembler::load_document;
use pbrtjson_core::{
    BatchReport, OsFs, ProgressReporter, convert_file, output_path_for, run_batch,
};
use pbrtjson_shared::{
    AppConfig, BatchConfig, ConvertError, ConvertOptions, Diagnostics, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pbrtjson: convert pbrt scene descriptions into JSON block documents.
#[derive(Parser)]
#[command(
    name = "pbrtjson",
    version,
    about = "Convert pbrt scene files (and everything they include) into JSON.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.pbrtjson/pbrtjson.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert one scene file and the files it includes.
    Convert {
        /// Source scene file.
        source: PathBuf,

        /// Output artifact (defaults to the source name with the output extension).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sources smaller than this many bytes are written pretty-printed.
        #[arg(long)]
        pretty_threshold: Option<u64>,
    },

    /// Convert every configured scene collection and copy its assets.
    Batch {
        /// Collection names (defaults to the configured list).
        collections: Vec<String>,

        /// Directory containing the collections.
        #[arg(long)]
        source_root: Option<PathBuf>,

        /// Directory receiving converted collections.
        #[arg(long)]
        output_root: Option<PathBuf>,
    },

    /// Validate a converted artifact.
    Check {
        /// JSON artifact to read back.
        artifact: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pbrtjson=info",
        1 => "pbrtjson=debug",
        _ => "pbrtjson=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Convert {
            source,
            output,
            pretty_threshold,
        } => cmd_convert(config_path, &source, output.as_deref(), pretty_threshold),
        Command::Batch {
            collections,
            source_root,
            output_root,
        } => cmd_batch(config_path, collections, source_root, output_root),
        Command::Check { artifact } => cmd_check(&artifact),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_convert(
    config_path: Option<&Path>,
    source: &Path,
    output: Option<&Path>,
    pretty_threshold: Option<u64>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let mut options = ConvertOptions::from(&config);
    if let Some(threshold) = pretty_threshold {
        options.pretty_threshold_bytes = threshold;
    }

    let output = match output {
        Some(p) => p.to_path_buf(),
        None => output_path_for(
            source,
            source.parent().unwrap_or(Path::new("")),
            &options,
        ),
    };
    if output == source {
        return Err(eyre!("output would overwrite the source file {}", source.display()));
    }

    info!(source = %source.display(), output = %output.display(), "converting");
    let outcome = convert_file(&OsFs, &options, source, &output)?;

    println!();
    println!("  Converted {}", source.display());
    for path in &outcome.written {
        println!("  wrote     {}", path.display());
    }
    println!("  Blocks:   {}", outcome.document.len());
    print_diagnostics(&outcome.diagnostics);
    println!();

    Ok(())
}

fn cmd_batch(
    config_path: Option<&Path>,
    collections: Vec<String>,
    source_root: Option<PathBuf>,
    output_root: Option<PathBuf>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let mut batch = BatchConfig::from(&config);
    if !collections.is_empty() {
        batch.collections = collections;
    }
    if let Some(root) = source_root {
        batch.source_root = root;
    }
    if let Some(root) = output_root {
        batch.output_root = root;
    }

    info!(
        collections = ?batch.collections,
        source_root = %batch.source_root.display(),
        "starting batch"
    );

    let reporter = CliProgress::new();
    let report = run_batch(&OsFs, &batch, &reporter)?;

    println!();
    println!("  Batch finished");
    println!("  Converted: {}", report.converted.len());
    println!("  Artifacts: {}", report.artifacts_written);
    println!("  Skipped:   {}", report.skipped.len());
    println!("  Assets:    {}", report.assets_copied);
    println!("  Failed:    {}", report.failed.len());
    for failure in &report.failed {
        println!("    {}: {}", failure.source.display(), failure.error);
    }
    print_diagnostics(&report.diagnostics);
    println!();

    if !report.is_success() {
        return Err(eyre!("{} file(s) failed to convert", report.failed.len()));
    }
    Ok(())
}

fn cmd_check(artifact: &Path) -> Result<()> {
    let document = load_document(&OsFs, artifact)?;
    println!(
        "{}: {} blocks, {} elements",
        artifact.display(),
        document.len(),
        document.element_count()
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    println!("  Unrecognized capitalized tokens (missing directives?):");
    for token in diagnostics.tokens() {
        println!("    {token}");
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(format!("Collection {name}"));
    }

    fn file_converted(&self, source: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converted [{current}/{total}] {}", source.display()));
    }

    fn file_failed(&self, source: &Path, error: &ConvertError) {
        self.spinner
            .println(format!("  failed {}: {error}", source.display()));
    }

    fn done(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}
