//! Download of the PDFs linked from an OJS issue page.

use scraper::Html;
use url::Url;

use super::*;
use crate::scrape::{fetch_html, pdf_links};

/// Download URLs of every `PDF` link on the issue page, in page order.
///
/// Viewer links are turned into download links by replacing `view` with `download`.
pub fn download_urls(html: &str, page_url: &Url) -> Vec<Url> {
  let document = Html::parse_document(html);
  pdf_links(document.root_element())
    .into_iter()
    .filter_map(|href| match page_url.join(&href.replace("view", "download")) {
      Ok(url) => Some(url),
      Err(e) => {
        warn!("Ignoring malformed PDF link {href}: {e}");
        None
      },
    })
    .collect()
}

/// File name a download is saved under: the last URL segment, with `.pdf` appended when missing.
///
/// ```
/// use migrator::download::file_name_for;
/// use url::Url;
///
/// let url = Url::parse("http://example.org/sbie/article/download/1114/1017").unwrap();
/// assert_eq!(file_name_for(&url), "1017.pdf");
/// ```
pub fn file_name_for(url: &Url) -> String {
  let segment =
    url.path_segments().and_then(|mut segments| segments.next_back()).unwrap_or_default();
  if segment.ends_with(".pdf") {
    segment.to_string()
  } else {
    format!("{segment}.pdf")
  }
}

/// Saves the PDFs of an issue into a directory.
#[derive(Debug, Clone)]
pub struct PdfDownloader {
  /// Shared HTTP client
  http:       reqwest::Client,
  /// Table-of-contents page of the issue
  site_url:   String,
  /// Directory the files are written to
  target_dir: PathBuf,
}

impl PdfDownloader {
  /// Creates a downloader saving the PDFs linked from `site_url` into `target_dir`.
  pub fn new(site_url: &str, target_dir: impl AsRef<Path>) -> Self {
    Self {
      http:       reqwest::Client::new(),
      site_url:   site_url.to_string(),
      target_dir: target_dir.as_ref().to_path_buf(),
    }
  }

  /// Reuses an existing HTTP client.
  pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
    self.http = http;
    self
  }

  /// Downloads the first `limit` PDFs, or all of them, and returns the written paths.
  ///
  /// A file that fails to download is logged and skipped.
  ///
  /// # Errors
  ///
  /// Fails when the issue page cannot be fetched or the target directory cannot be created.
  pub async fn download_all(&self, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let page_url = Url::parse(&self.site_url)?;
    let html = fetch_html(&self.http, page_url.as_str()).await?;
    let mut urls = download_urls(&html, &page_url);
    if let Some(limit) = limit {
      urls.truncate(limit);
    }
    info!("Downloading {} PDFs into {}", urls.len(), self.target_dir.display());
    tokio::fs::create_dir_all(&self.target_dir).await?;

    let mut paths = Vec::with_capacity(urls.len());
    for url in urls {
      match self.download(&url).await {
        Ok(path) => {
          debug!("Saved {}", path.display());
          paths.push(path);
        },
        Err(e) => warn!("Failed to download {url}: {e}"),
      }
    }
    Ok(paths)
  }

  /// Downloads one file into the target directory.
  async fn download(&self, url: &Url) -> Result<PathBuf> {
    trace!("Downloading {url}");
    let bytes = self.http.get(url.clone()).send().await?.error_for_status()?.bytes().await?;
    let path = self.target_dir.join(file_name_for(url));
    tokio::fs::write(&path, &bytes).await?;
    Ok(path)
  }
}
