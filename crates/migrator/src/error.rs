//! Error types for the migrator library.
//!
//! Only structural failures surface as [`MigratorError`]: unreadable or malformed configuration,
//! prompt and header files, unwritable output directories, or a missing snapshot when resuming.
//! Transient LLM problems never reach this type. Provider failures are absorbed into an empty
//! completion and extraction failures into an empty JSON object, so a single bad article cannot
//! abort a batch.
//!
//! # Examples
//!
//! ```
//! use migrator::{configuration::Config, error::MigratorError};
//!
//! match Config::from_path("config.ini") {
//!   Err(MigratorError::UnsupportedConfigFormat(ext)) => println!("cannot read .{ext} files"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(_) => println!("Loaded"),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Error type alias used for the [`migrator`](crate) crate.
pub type Result<T> = core::result::Result<T, MigratorError>;

/// Errors that can occur while migrating a proceedings year.
#[derive(Error, Debug)]
pub enum MigratorError {
  /// A page location other than `first` or `last` was requested.
  #[error("Invalid page location: {0}")]
  InvalidPageLocation(String),

  /// The configuration file has an extension that cannot be loaded.
  ///
  /// JSON and TOML are supported. The string carries the offending extension.
  #[error("Unsupported configuration format: .{0} (expected .json or .toml)")]
  UnsupportedConfigFormat(String),

  /// A required configuration key is absent or empty.
  #[error("Missing required configuration key: {0}")]
  MissingConfigKey(&'static str),

  /// A configured LLM provider name is not known.
  #[error("Unknown LLM provider: {0}")]
  UnknownProvider(String),

  /// The completion strategy name is not known.
  #[error("Unknown completion strategy: {0}")]
  UnknownStrategy(String),

  /// An API key needed by the selected provider is not set.
  #[error("Missing credential: {0} is not set")]
  MissingCredential(&'static str),

  /// A snapshot needed to resume a phase does not exist.
  #[error("Snapshot not found at {}", .0.display())]
  SnapshotNotFound(PathBuf),

  /// An article record was not a JSON object.
  #[error("Expected an article object, found {0}")]
  NotAnArticle(String),

  /// An LLM reply contained no JSON object or array.
  #[error("No JSON found in the response")]
  NoJsonFound,

  /// A provider answered with a non-success HTTP status.
  ///
  /// Providers absorb this into an empty completion; the variant exists so the HTTP layer can
  /// report a precise reason before it is logged.
  #[error("API error: {0}")]
  ApiError(String),

  /// A network request failed.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// JSON encoding or decoding failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// YAML decoding of the prompts file failed.
  #[error(transparent)]
  Yaml(#[from] serde_yaml::Error),

  /// TOML decoding of the configuration failed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// Reading or writing a CSV file failed.
  #[error(transparent)]
  Csv(#[from] csv::Error),

  /// PDF parsing failed.
  #[error(transparent)]
  Lopdf(#[from] lopdf::Error),

  /// A URL could not be parsed or joined.
  #[error(transparent)]
  Url(#[from] url::ParseError),

  /// Any other configuration problem.
  #[error("{0}")]
  Config(String),
}
