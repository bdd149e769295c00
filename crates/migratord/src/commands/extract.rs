//! The extraction and merge phase.

use super::*;

/// Function for the [`Commands::Extract`] in the CLI.
pub async fn extract(migrator: &Migrator) -> Result<()> {
  println!("{} Extracting metadata...", style(WORKING_PREFIX).cyan());
  let articles = migrator.extract_metadata().await?;
  print_articles(&articles);
  println!(
    "{} Merged {} articles, run {} next",
    style(SUCCESS_PREFIX).green(),
    articles.len(),
    style("migrator complete").cyan()
  );
  Ok(())
}
