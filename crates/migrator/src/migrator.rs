//! The end-to-end migration of one proceedings year.
//!
//! [`Migrator`] owns every stage and runs them in order:
//!
//! 1. Download the issue's PDFs into `{output_dir}/{year}/pdfs`
//! 2. Extract page text from the PDFs
//! 3. Scrape the table of contents and metadata pages
//! 4. Extract article records with the LLM
//! 5. Merge website stubs with PDF records
//! 6. Snapshot and export the merged set (`antes_*.csv`)
//! 7. Fill missing fields with a second LLM pass
//! 8. Snapshot and export the final set
//!
//! Affiliation correction runs separately over the exported authors file through
//! [`Migrator::correct_affiliations`]. Phases can also be run one at a time; the completion phase
//! resumes from the pre-completion snapshot when it is given no articles.

use super::*;
use crate::{
  affiliation::AffiliationCorrector,
  credentials::Credentials,
  download::PdfDownloader,
  export::{CsvHeaders, CsvPaths, CsvWriter},
  pdf::PdfProcessor,
  reconcile::Reconciler,
  scrape::OjsScraper,
  snapshot::{SnapshotStore, ARTICLES_AFTER_COMPLETION, ARTICLES_BEFORE_COMPLETION},
};

/// Runs the migration phases for one configuration.
#[derive(Clone)]
pub struct Migrator {
  /// Run configuration
  config:     Config,
  /// LLM extraction and completion
  extractor:  ArticleExtractor,
  /// Website/PDF merge
  reconciler: Reconciler,
  /// Snapshot directory
  snapshots:  SnapshotStore,
  /// CSV column sets
  headers:    CsvHeaders,
  /// HTTP client shared by the scraper and the downloader
  http:       reqwest::Client,
}

impl Migrator {
  /// Creates a migrator with providers built from the configuration and the environment.
  ///
  /// # Errors
  ///
  /// Fails when the prompts or headers file cannot be loaded, or the Ollama host is invalid.
  pub fn from_config(config: Config) -> Result<Self> {
    let clients = Clients::from_config(&config, &Credentials::from_env())?;
    Self::new(config, clients)
  }

  /// Creates a migrator using the given providers.
  ///
  /// # Errors
  ///
  /// Fails when the headers file cannot be loaded.
  pub fn new(config: Config, clients: Clients) -> Result<Self> {
    let headers = CsvHeaders::from_config(&config)?;
    Ok(Self {
      extractor: ArticleExtractor::from_config(clients, &config),
      reconciler: Reconciler::from_config(&config),
      snapshots: SnapshotStore::from_config(&config),
      headers,
      http: reqwest::Client::new(),
      config,
    })
  }

  /// The run configuration.
  pub fn config(&self) -> &Config { &self.config }

  /// Runs every phase up to the final CSV export and returns the final articles.
  pub async fn migrate(&self) -> Result<Vec<Article>> {
    info!("Migrating {} ({})", self.config.site_url, self.config.year);
    self.download_pdfs().await?;
    let articles = self.extract_metadata().await?;
    let articles = self.complete_missing_fields(articles).await?;
    info!("Migration finished with {} articles", articles.len());
    Ok(articles)
  }

  /// Downloads the issue's PDFs into the year's PDF directory.
  pub async fn download_pdfs(&self) -> Result<Vec<PathBuf>> {
    PdfDownloader::new(&self.config.site_url, self.config.pdf_dir())
      .with_http_client(self.http.clone())
      .download_all(self.config.file_limit())
      .await
  }

  /// Extracts, scrapes and merges, then snapshots and exports the merged set.
  ///
  /// Expects the PDFs to be downloaded already.
  pub async fn extract_metadata(&self) -> Result<Vec<Article>> {
    let pdf_dir = self.config.pdf_dir();
    std::fs::create_dir_all(&pdf_dir)?;
    let texts = PdfProcessor::new()
      .with_page_window(self.config.pages_to_process)
      .process_all(&pdf_dir)?;

    let stubs = OjsScraper::new(&self.config.site_url)
      .with_http_client(self.http.clone())
      .fetch_articles(self.config.file_limit())
      .await?;
    let sections: HashMap<String, Section> =
      stubs.iter().map(|stub| (stub.id_jems.clone(), stub.section.clone())).collect();

    let extracted = self.extractor.extract_articles(&texts, &sections).await;
    let outcome = self.reconciler.merge(&stubs, extracted);

    self.snapshots.write(ARTICLES_BEFORE_COMPLETION, &outcome.articles)?;
    self.export(&outcome.articles, true)?;
    Ok(outcome.articles)
  }

  /// Fills missing fields, then snapshots and exports the final set.
  ///
  /// With no articles, the pre-completion snapshot is loaded instead.
  ///
  /// # Errors
  ///
  /// [`MigratorError::SnapshotNotFound`] when resuming without a snapshot, or any error writing
  /// the outputs.
  pub async fn complete_missing_fields(&self, articles: Vec<Article>) -> Result<Vec<Article>> {
    let articles = if articles.is_empty() {
      info!("No articles given, resuming from the {ARTICLES_BEFORE_COMPLETION} snapshot");
      self.snapshots.read_articles(ARTICLES_BEFORE_COMPLETION)?
    } else {
      articles
    };

    let completed = self.extractor.complete_missing_fields(articles).await;
    self.snapshots.write(ARTICLES_AFTER_COMPLETION, &completed)?;
    self.export(&completed, false)?;
    Ok(completed)
  }

  /// Corrects the affiliations of the final authors file.
  pub async fn correct_affiliations(&self) -> Result<PathBuf> {
    AffiliationCorrector::from_config(&self.extractor.clients, &self.config).correct().await
  }

  /// Writes the CSV files, with the pre-completion prefix when `before_completion` is set.
  fn export(&self, articles: &[Article], before_completion: bool) -> Result<CsvPaths> {
    let writer = CsvWriter::new(self.config.csv_dir(), self.headers.clone());
    let writer = if before_completion { writer.pre_completion() } else { writer };
    writer.write(articles)
  }
}
