//! The field completion phase.

use super::*;

/// Function for the [`Commands::Complete`] in the CLI.
///
/// Always resumes from the pre-completion snapshot written by the extraction phase.
pub async fn complete(migrator: &Migrator) -> Result<()> {
  println!("{} Completing missing fields...", style(WORKING_PREFIX).cyan());
  let articles = migrator.complete_missing_fields(Vec::new()).await?;
  let incomplete = articles.iter().filter(|article| article.has_missing_fields()).count();
  println!(
    "{} Completed {} articles ({incomplete} still have empty fields)",
    style(SUCCESS_PREFIX).green(),
    articles.len()
  );
  Ok(())
}
