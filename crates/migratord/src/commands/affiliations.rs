//! The affiliation correction pass.

use super::*;

/// Function for the [`Commands::CorrectAffiliations`] in the CLI.
pub async fn correct_affiliations(migrator: &Migrator) -> Result<()> {
  println!("{} Correcting author affiliations...", style(WORKING_PREFIX).cyan());
  let path = migrator.correct_affiliations().await?;
  println!("{} Wrote {}", style(SUCCESS_PREFIX).green(), style(path.display()).yellow());
  Ok(())
}
