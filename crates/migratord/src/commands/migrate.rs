//! The full migration.

use super::*;

/// Arguments for [`Commands::Migrate`]
#[derive(Args, Clone)]
pub struct MigrateArgs {
  /// Stop after the final CSV export
  #[arg(long)]
  pub skip_affiliations: bool,
}

/// Function for the [`Commands::Migrate`] in the CLI.
pub async fn migrate(migrator: &Migrator, args: MigrateArgs) -> Result<()> {
  println!("{} Migrating proceedings...", style(WORKING_PREFIX).cyan());
  let articles = migrator.migrate().await?;
  print_articles(&articles);
  println!(
    "{} Migrated {} articles into {}",
    style(SUCCESS_PREFIX).green(),
    articles.len(),
    style(migrator.config().csv_dir().display()).yellow()
  );

  if args.skip_affiliations {
    return Ok(());
  }
  correct_affiliations(migrator).await
}
