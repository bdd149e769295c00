use migrator::{
  article::Article,
  snapshot::{SnapshotStore, ARTICLES_BEFORE_COMPLETION},
};

use super::*;

#[traced_test]
#[tokio::test]
async fn test_migrate_end_to_end() -> TestResult<()> {
  let site = serve_proceedings().await;
  let providers = Providers::new();
  let (migrator, output) = create_test_migrator(&site, &providers);

  let articles = migrator.migrate().await?;

  let ids: Vec<&str> = articles.iter().map(|article| article.id_jems.as_str()).collect();
  assert_eq!(ids, vec!["10", "20"]);

  let editorial = &articles[0];
  assert_eq!(editorial.section, Section::Editorial);
  assert_eq!(editorial.pages, "i");
  assert!(editorial.references.is_empty());
  assert!(editorial.title_en.is_empty());

  let paper = &articles[1];
  assert_eq!(paper.seq, 2);
  assert_eq!(paper.section, Section::FullPaper);
  assert_eq!(paper.num_pages, 0);
  assert_eq!(paper.pages, "1-3");
  assert_eq!(paper.doi, "10.5753/sbie.2023.1");
  assert_eq!(paper.title_orig, "Robotica no PDF");
  assert_eq!(paper.title_en, "Educational robotics");
  assert_eq!(paper.abstract_en, "PDF abstract");
  assert_eq!(paper.references[0].description, "Silva, 2020.");

  assert_eq!(providers.article.calls(), 2);
  assert_eq!(providers.references.calls(), 1);
  assert_eq!(providers.completion.calls(), 1);

  let year = output.path().join("2023");
  assert!(year.join("logs/articles_before_field_completion.json").exists());
  assert!(year.join("logs/articles_after_field_completion.json").exists());

  let before = read_csv(&year.join("csv/antes_Artigos.csv"));
  let after = read_csv(&year.join("csv/Artigos.csv"));
  assert_eq!(after[0][..6], [
    "seq",
    "idJEMS",
    "language",
    "sectionAbbrev",
    "titleOrig",
    "titleEn"
  ]);
  assert_eq!(before[2][5], "");
  assert_eq!(after[2][..6], [
    "2",
    "20",
    "pt",
    "ART-C",
    "Robotica no PDF",
    "Educational robotics"
  ]);

  let references = read_csv(&year.join("csv/Referencias.csv"));
  assert_eq!(references.len(), 2);
  assert_eq!(references[1][..3], ["2", "Silva, 2020.", ""]);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_correct_affiliations_after_migration() -> TestResult<()> {
  let site = serve_proceedings().await;
  let providers = Providers::new();
  let (migrator, output) = create_test_migrator(&site, &providers);

  migrator.migrate().await?;
  let corrected = migrator.correct_affiliations().await?;
  assert_eq!(corrected, output.path().join("2023/csv/Autores_corrigido.csv"));

  let rows = read_csv(&corrected);
  assert_eq!(rows.len(), 3);
  for row in &rows[1..] {
    assert_eq!(row[4], "Universidade Federal X");
    assert_eq!(row[5], "Federal University X");
  }
  assert_eq!(providers.affiliation.calls(), 1);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_resume_completion_from_snapshot() -> TestResult<()> {
  let site = serve_proceedings().await;
  let providers = Providers::new();
  let (migrator, _output) = create_test_migrator(&site, &providers);

  migrator.download_pdfs().await?;
  let merged = migrator.extract_metadata().await?;
  assert_eq!(providers.completion.calls(), 0);

  // A fresh run picks up where the first one stopped.
  let resumed = Migrator::new(migrator.config().clone(), providers.clients())?;
  let completed = resumed.complete_missing_fields(Vec::new()).await?;
  assert_eq!(completed.len(), merged.len());
  assert_eq!(completed[1].title_en, "Educational robotics");
  assert_eq!(providers.completion.calls(), 1);

  let snapshot: Vec<Article> =
    SnapshotStore::from_config(migrator.config()).read(ARTICLES_BEFORE_COMPLETION)?;
  assert_eq!(snapshot, merged);
  Ok(())
}

#[tokio::test]
async fn test_file_limit() -> TestResult<()> {
  let site = serve_proceedings().await;
  let providers = Providers::new();
  let (migrator, _output) = create_test_migrator(&site, &providers);

  let mut config = migrator.config().clone();
  config.files_to_download = 1;
  let limited = Migrator::new(config, providers.clients())?;

  let articles = limited.migrate().await?;
  assert_eq!(articles.len(), 1);
  assert_eq!(articles[0].id_jems, "10");
  assert_eq!(providers.references.calls(), 0);
  Ok(())
}
