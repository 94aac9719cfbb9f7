//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use calmerge_core::pipeline::{self, MergeReport, ProgressReporter};
use calmerge_fetcher::Fetcher;
use calmerge_shared::{
    AppConfig, CalMergeError, ConfigOverrides, FeedLink, MergeConfig, OutputTarget, init_config,
    load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// calmerge: merge a club's iCal feeds into one calendar.
#[derive(Parser)]
#[command(
    name = "calmerge",
    version,
    about = "Find the iCal feeds linked from a web page and merge them into one .ics file.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.calmerge/calmerge.toml.
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

/// Run summary format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum ReportFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover, download, and merge all feeds, then write the calendar.
    Merge {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file, or `-` for stdout.
        #[arg(short, long, env = "OUTPUT_ICS")]
        output: Option<String>,

        /// Calendar display name (X-WR-CALNAME).
        #[arg(long, env = "CALENDAR_NAME")]
        calendar_name: Option<String>,

        /// Timezone name (X-WR-TIMEZONE).
        #[arg(long, env = "TZ")]
        timezone: Option<String>,

        /// Maximum number of feeds downloaded at once.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Summary format printed after the run.
        #[arg(long, default_value = "text")]
        report: ReportFormat,
    },

    /// Print the feed links found on the source page without downloading them.
    Links {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by commands that load the source page.
#[derive(Args, Clone, Debug)]
pub(crate) struct SourceArgs {
    /// Page scanned for iCal links.
    #[arg(long, env = "BRV_PAGE_URL")]
    pub page_url: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show the config file contents (defaults filled in).
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `--output -` leaves stdout clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "calmerge=warn",
        1 => "calmerge=info",
        _ => "calmerge=debug",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Merge {
            source,
            output,
            calendar_name,
            timezone,
            concurrency,
            report,
        } => {
            let overrides = ConfigOverrides {
                page_url: source.page_url,
                output,
                calendar_name,
                timezone,
                timeout_secs: source.timeout,
                concurrency,
            };
            cmd_merge(config_path.as_deref(), &overrides, &report).await
        }
        Command::Links { source } => {
            let overrides = ConfigOverrides {
                page_url: source.page_url,
                timeout_secs: source.timeout,
                ..Default::default()
            };
            cmd_links(config_path.as_deref(), &overrides).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn load_app_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_merge(
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
    format: &ReportFormat,
) -> Result<()> {
    let app_config = load_app_config(config_path)?;
    let config = MergeConfig::resolve(&app_config, overrides)?;

    info!(
        page_url = %config.page_url,
        output = %config.output,
        calendar = %config.calendar.name,
        "merging calendar feeds"
    );

    let reporter = CliProgress::new();
    let report = pipeline::run_merge(&config, &reporter).await?;

    // Keep stdout for the calendar itself when it is the output.
    let mut out: Box<dyn Write> = match config.output {
        OutputTarget::Stdout => Box::new(std::io::stderr()),
        OutputTarget::File(_) => Box::new(std::io::stdout()),
    };

    match format {
        ReportFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        ReportFormat::Text => print_summary(&mut out, &report)?,
    }

    Ok(())
}

fn print_summary(out: &mut dyn Write, report: &MergeReport) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  Calendar merged!")?;
    writeln!(out, "  Source: {}", report.page_url)?;
    writeln!(
        out,
        "  Feeds:  {} ok, {} failed",
        report.feeds_ok(),
        report.feeds_failed()
    )?;
    for feed in &report.feeds {
        match &feed.error {
            None => writeln!(out, "    - {} ({} events)", feed.url, feed.events)?,
            Some(err) => writeln!(out, "    - {} (failed: {err})", feed.url)?,
        }
    }
    writeln!(out, "  Events: {} unique", report.unique_events)?;
    writeln!(out, "  Output: {}", report.output)?;
    writeln!(out, "  Time:   {:.1}s", report.elapsed.as_secs_f64())?;
    writeln!(out)?;
    Ok(())
}

async fn cmd_links(
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> Result<()> {
    let app_config = load_app_config(config_path)?;
    let config = MergeConfig::resolve(&app_config, overrides)?;
    let fetcher = Fetcher::new(&config.fetch)?;

    let links = pipeline::discover_feed_links(&fetcher, &config.page_url).await?;
    for link in &links {
        println!("{link}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn links_found(&self, links: &[FeedLink]) {
        self.spinner.println("Found iCal links:");
        for link in links {
            self.spinner.println(format!(" - {link}"));
        }
    }

    fn feed_merged(&self, url: &str, events: usize, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Merged [{current}/{total}] {url} ({events} events)"));
    }

    fn feed_failed(&self, url: &str, error: &CalMergeError) {
        self.spinner.println(format!("Failed {url}: {error}"));
    }

    fn done(&self, _report: &MergeReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Error paths never reach `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
