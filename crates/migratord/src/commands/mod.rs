//! Subcommands of the CLI.

use super::*;

pub mod affiliations;
pub mod complete;
pub mod download;
pub mod extract;
pub mod migrate;

pub use affiliations::correct_affiliations;
pub use complete::complete;
pub use download::download;
pub use extract::extract;
pub use migrate::{migrate, MigrateArgs};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Run the whole migration, then correct author affiliations
  Migrate(MigrateArgs),

  /// Download the issue's PDFs
  Download,

  /// Extract and merge metadata from the downloaded PDFs and the website
  Extract,

  /// Fill missing fields, resuming from the pre-completion snapshot
  Complete,

  /// Normalize the affiliations of the exported authors file
  CorrectAffiliations,
}
