//! Merge of website stubs with PDF-extracted articles.
//!
//! The website table of contents is authoritative for identity and placement (`id_jems`, `seq`,
//! section, first page); the PDF extraction is authoritative for content. Stubs are the driving
//! side, so the merged list follows the website order and stubs without a PDF are dropped.

use super::*;
use crate::format::is_digits;

/// Result of [`Reconciler::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
  /// Merged articles in website order
  pub articles:  Vec<Article>,
  /// `id_jems` of the stubs that had no matching PDF
  pub unmatched: Vec<String>,
}

/// Merges website and PDF sources for one proceedings year.
#[derive(Debug, Clone)]
pub struct Reconciler {
  /// DOI prefix, e.g. `10.5753/sbie.`
  doi_prefix: String,
  /// Proceedings year
  year:       String,
}

impl Reconciler {
  /// Creates a reconciler generating DOIs `{doi_prefix}{year}.{first_page}`.
  pub fn new(doi_prefix: &str, year: &str) -> Self {
    Self { doi_prefix: doi_prefix.to_string(), year: year.to_string() }
  }

  /// Creates a reconciler from the DOI settings of `config`.
  pub fn from_config(config: &Config) -> Self { Self::new(&config.doi_prefix, &config.year) }

  /// Merges every stub with the PDF article of the same `id_jems`.
  ///
  /// ```
  /// use migrator::{article::Article, reconcile::Reconciler, scrape::WebsiteArticle};
  ///
  /// let stub = WebsiteArticle { id_jems: "X".into(), first_page: "10".into(), ..Default::default() };
  /// let pdf = Article { id_jems: "X".into(), num_pages: 3, ..Default::default() };
  ///
  /// let outcome = Reconciler::new("10.5753/sbie.", "2023").merge(&[stub], vec![pdf]);
  /// assert_eq!(outcome.articles[0].pages, "10-12");
  /// assert_eq!(outcome.articles[0].doi, "10.5753/sbie.2023.10");
  /// ```
  pub fn merge(&self, stubs: &[WebsiteArticle], pdf_articles: Vec<Article>) -> MergeOutcome {
    let by_id: HashMap<String, Article> =
      pdf_articles.into_iter().map(|article| (article.id_jems.clone(), article)).collect();

    let mut outcome = MergeOutcome::default();
    let mut seen = HashSet::new();
    for stub in stubs {
      match by_id.get(&stub.id_jems).cloned() {
        Some(pdf) => {
          seen.insert(stub.id_jems.as_str());
          outcome.articles.push(self.merge_one(stub, pdf));
        },
        None => outcome.unmatched.push(stub.id_jems.clone()),
      }
    }

    if !outcome.unmatched.is_empty() {
      warn!("Dropped {} website articles without a matching PDF", outcome.unmatched.len());
      debug!("Unmatched website articles: {:?}", outcome.unmatched);
    }
    let orphans: Vec<&String> = by_id.keys().filter(|id| !seen.contains(id.as_str())).collect();
    if !orphans.is_empty() {
      debug!("{} PDFs have no website entry: {:?}", orphans.len(), orphans);
    }
    info!("Merged {} articles", outcome.articles.len());
    outcome
  }

  /// Merges one stub with its PDF article.
  fn merge_one(&self, stub: &WebsiteArticle, pdf: Article) -> Article {
    let base = stub.to_article();
    let pdf_pages = pdf.num_pages;
    let mut merged = Article {
      id_jems: base.id_jems,
      seq: base.seq,
      section: base.section,
      first_page: base.first_page,
      num_pages: base.num_pages,
      ..pdf
    };
    // The range uses the PDF's page count; the record keeps the website's.
    merged.pages = update_pages(&merged.first_page, pdf_pages);
    self.correct_doi(&mut merged);
    merged
  }

  /// Replaces the DOI with `{doi_prefix}{year}.{first_page}` when the first page is known.
  pub fn correct_doi(&self, article: &mut Article) {
    if !article.first_page.is_empty() {
      article.doi = format!("{}{}.{}", self.doi_prefix, self.year, article.first_page);
    }
  }
}

/// The printed page range of an article starting at `first_page` with `num_pages` pages.
///
/// Non-numeric first pages are returned unchanged.
///
/// ```
/// use migrator::reconcile::update_pages;
///
/// assert_eq!(update_pages("10", 3), "10-12");
/// assert_eq!(update_pages("7", 1), "7");
/// assert_eq!(update_pages("xii", 3), "xii");
/// ```
pub fn update_pages(first_page: &str, num_pages: u32) -> String {
  if !is_digits(first_page) {
    return first_page.to_string();
  }
  match first_page.parse::<u64>() {
    Ok(first) if num_pages == 1 => first.to_string(),
    Ok(first) => format!("{first}-{}", (first + u64::from(num_pages)).saturating_sub(1)),
    Err(_) => first_page.to_string(),
  }
}
