//! The download phase.

use super::*;

/// Function for the [`Commands::Download`] in the CLI.
pub async fn download(migrator: &Migrator) -> Result<()> {
  println!("{} Downloading PDFs...", style(WORKING_PREFIX).cyan());
  let paths = migrator.download_pdfs().await?;
  println!(
    "{} Downloaded {} PDFs into {}",
    style(SUCCESS_PREFIX).green(),
    paths.len(),
    style(migrator.config().pdf_dir().display()).yellow()
  );
  Ok(())
}
