//! Command line interface for the OJS proceedings migrator.
//!
//! Runs the whole migration of a conference year, or any single phase of it, from a configuration
//! file:
//!
//! ```bash
//! # Everything: download, extraction, completion and affiliation correction
//! migrator migrate
//!
//! # Single phases
//! migrator download
//! migrator extract
//! migrator complete
//! migrator correct-affiliations
//!
//! # Another configuration, with debug logging
//! migrator -vvv --config config/sbie-2023.toml migrate
//! ```
//!
//! Logs go to stderr and to `migrator.log` in the year's `logs` directory. The `-v` flag raises
//! the console verbosity; `RUST_LOG` overrides it.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  path::{Path, PathBuf},
  process::ExitCode,
};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use migrator::{article::Article, configuration::Config, migrator::Migrator};
use tracing::{debug, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub mod commands;
pub mod error;

use crate::{commands::*, error::*};

/// Prefix for information messages
static INFO_PREFIX: &str = "ℹ ";
/// Prefix for work in progress
static WORKING_PREFIX: &str = "» ";
/// Prefix for success messages
static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for error messages
static ERROR_PREFIX: &str = "✗ ";
/// Branch character for tree structure
static TREE_BRANCH: &str = "├";
/// Leaf character for tree structure (end of branch)
static TREE_LEAF: &str = "└";

/// Default location of the configuration file
static DEFAULT_CONFIG: &str = "config/config.json";

/// File name of the run log inside the year's `logs` directory
static LOG_FILE: &str = "migrator.log";

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Migrate OJS conference proceedings into CSV datasets")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Configuration file, JSON or TOML
  #[arg(long, short, global = true, default_value = DEFAULT_CONFIG)]
  config: PathBuf,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,
}

/// Configures console and file logging.
///
/// The console verbosity follows the number of `-v` flags:
/// - 0: warn (default)
/// - 1: info
/// - 2: debug
/// - 3+: trace
///
/// The file in `log_dir` always records `info` and above. The returned guard flushes it on drop.
fn setup_logging(verbosity: u8, log_dir: &Path) -> Option<WorkerGuard> {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let console = fmt::layer()
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_target(true)
    .with_filter(filter);

  let (file, guard) = match std::fs::create_dir_all(log_dir) {
    Ok(()) => {
      let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE));
      let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(EnvFilter::new("info"));
      (Some(layer), Some(guard))
    },
    Err(e) => {
      eprintln!(
        "{} Cannot create log directory {}: {e}",
        style(ERROR_PREFIX).yellow(),
        log_dir.display()
      );
      (None, None)
    },
  };

  tracing_subscriber::registry().with(console).with(file).init();
  guard
}

/// Loads the configuration, installs logging and runs the requested command.
async fn run(cli: Cli) -> Result<()> {
  let config = Config::from_path(&cli.config)?;
  let _guard = setup_logging(cli.verbose, &config.logs_dir());
  debug!("Loaded configuration from {}", cli.config.display());
  trace!("{config:?}");

  println!(
    "{} {} ({})",
    style(INFO_PREFIX).cyan(),
    style(&config.site_url).yellow(),
    style(&config.year).yellow()
  );
  let migrator = Migrator::from_config(config)?;

  match cli.command {
    Commands::Migrate(args) => migrate(&migrator, args).await,
    Commands::Download => download(&migrator).await,
    Commands::Extract => extract(&migrator).await,
    Commands::Complete => complete(&migrator).await,
    Commands::CorrectAffiliations => correct_affiliations(&migrator).await,
  }
}

/// Entry point for the migrator CLI
///
/// Errors are printed to stderr and turn into a failing exit code.
#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{} {}", style(ERROR_PREFIX).red(), style(e).red());
      ExitCode::FAILURE
    },
  }
}

/// Prints a one-line summary per article.
fn print_articles(articles: &[Article]) {
  for (index, article) in articles.iter().enumerate() {
    let branch = if index + 1 == articles.len() { TREE_LEAF } else { TREE_BRANCH };
    let title = if article.title_orig.is_empty() { "(untitled)" } else { &article.title_orig };
    println!(
      "{} {} {} {}",
      style(branch).dim(),
      style(&article.id_jems).cyan(),
      style(article.section.as_str()).dim(),
      title
    );
  }
}
