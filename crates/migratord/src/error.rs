//! Errors surfaced by the CLI.

use migrator::error::MigratorError;
use thiserror::Error;

/// Result alias for the CLI.
pub type Result<T> = core::result::Result<T, MigratordError>;

/// Failures of a CLI run.
#[derive(Error, Debug)]
pub enum MigratordError {
  /// A library operation failed.
  #[error(transparent)]
  Migrator(#[from] MigratorError),
}
