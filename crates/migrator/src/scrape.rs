//! Scraping of an OJS issue page and its per-article metadata pages.
//!
//! The table of contents gives placement (section, sequence, first page) and the `id_jems` of each
//! article through its PDF link. Each article's `rt/metadata` page adds authors, abstracts and the
//! DOI when the site publishes them. HTML is parsed in plain functions returning owned data, so no
//! parsed document is held across an `.await`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::*;

/// `id_jems` recorded for articles without a PDF link.
pub const NO_PDF_LINK: &str = "No PDF link found";

/// Metadata published on an article's `rt/metadata` page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMetadata {
  /// Title of the document
  pub title:         String,
  /// DOI
  pub doi:           String,
  /// Authors with affiliation and country
  pub authors:       Vec<Author>,
  /// Abstract in the article's language
  #[serde(rename = "abstractOrig")]
  pub abstract_orig: String,
  /// Abstract in English
  #[serde(rename = "abstractEn")]
  pub abstract_en:   String,
}

/// An article as listed on the website.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteArticle {
  /// 1-based position across all sections
  pub seq:        u32,
  /// Section of the heading the article is listed under
  #[serde(rename = "sectionAbbrev")]
  pub section:    Section,
  /// Title as listed
  #[serde(rename = "titleOrig")]
  pub title_orig: String,
  /// First page as listed
  #[serde(rename = "firstPage")]
  pub first_page: String,
  /// PDF filename without extension, or [`NO_PDF_LINK`]
  #[serde(rename = "idJEMS")]
  pub id_jems:    String,
  /// Metadata page contents, when it could be fetched
  #[serde(skip_serializing_if = "Option::is_none")]
  pub metadata:   Option<SiteMetadata>,
}

impl WebsiteArticle {
  /// The stub as an [`Article`]. Listed fields win over the metadata page.
  pub fn to_article(&self) -> Article {
    let mut article = Article {
      id_jems: self.id_jems.clone(),
      seq: self.seq,
      section: self.section.clone(),
      title_orig: self.title_orig.clone(),
      first_page: self.first_page.clone(),
      ..Default::default()
    };
    if let Some(metadata) = &self.metadata {
      if article.title_orig.is_empty() {
        article.title_orig = metadata.title.clone();
      }
      article.doi = metadata.doi.clone();
      article.abstract_orig = metadata.abstract_orig.clone();
      article.abstract_en = metadata.abstract_en.clone();
      article.authors = metadata.authors.clone();
    }
    article
  }
}

/// One table-of-contents entry with the link to its PDF viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
  /// The listed article
  pub article: WebsiteArticle,
  /// Absolute URL of the `PDF` link
  pub pdf_url: Option<String>,
}

/// Rewrites a PDF viewer URL into the article's metadata page URL.
///
/// ```
/// use migrator::scrape::convert_url;
///
/// assert_eq!(
///   convert_url("http://example.org/index.php/sbie/article/view/1114/1017"),
///   "http://example.org/index.php/sbie/rt/metadata/1114/1017"
/// );
/// ```
pub fn convert_url(url: &str) -> String { url.replace("article/view", "rt/metadata") }

/// The `id_jems` encoded in a PDF link: its last path segment without `.pdf`, percent-decoded.
pub fn id_from_pdf_url(url: &Url) -> String {
  let segment =
    url.path_segments().and_then(|mut segments| segments.next_back()).unwrap_or_default();
  let segment = segment.replace(".pdf", "");
  match urlencoding::decode(&segment) {
    Ok(decoded) => decoded.into_owned(),
    Err(_) => segment.clone(),
  }
}

/// Trimmed text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
  element.text().collect::<String>().trim().to_string()
}

/// Targets of the `<a href>` elements inside `scope` whose text is exactly `PDF`.
pub(crate) fn pdf_links<'a>(scope: ElementRef<'a>) -> Vec<&'a str> {
  let selector = Selector::parse("a[href]").unwrap();
  scope
    .select(&selector)
    .filter(|link| element_text(*link) == "PDF")
    .filter_map(|link| link.value().attr("href"))
    .collect()
}

/// Parses the issue's table of contents, stopping after `limit` articles.
pub fn parse_toc(html: &str, page_url: &Url, limit: Option<usize>) -> Vec<TocEntry> {
  let document = Html::parse_document(html);
  let heading_selector = Selector::parse("h4.tocSectionTitle").unwrap();
  let title_selector = Selector::parse("div.tocTitle").unwrap();
  let pages_selector = Selector::parse("div.tocPages").unwrap();

  let mut entries = Vec::new();
  'sections: for heading in document.select(&heading_selector) {
    let section = Section::from_heading(&element_text(heading));
    let tables = heading
      .next_siblings()
      .filter_map(ElementRef::wrap)
      .take_while(|sibling| sibling.value().name() == "table");

    for table in tables {
      if limit.is_some_and(|limit| entries.len() >= limit) {
        break 'sections;
      }
      let first_text =
        |selector: &Selector| table.select(selector).next().map(element_text).unwrap_or_default();

      let pdf_url = pdf_links(table).first().and_then(|href| match page_url.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
          warn!("Ignoring malformed PDF link {href}: {e}");
          None
        },
      });
      let id_jems = pdf_url.as_ref().map(id_from_pdf_url).unwrap_or_else(|| NO_PDF_LINK.into());

      let article = WebsiteArticle {
        seq: entries.len() as u32 + 1,
        section: section.clone(),
        title_orig: first_text(&title_selector),
        first_page: first_text(&pages_selector),
        id_jems,
        metadata: None,
      };
      entries.push(TocEntry { article, pdf_url: pdf_url.map(String::from) });
    }
  }
  entries
}

/// The next `<td>` sibling of `element`.
fn next_td(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
  element.next_siblings().filter_map(ElementRef::wrap).find(|e| e.value().name() == "td")
}

/// Parses an `rt/metadata` page.
///
/// Values sit in the cell after their label cell. Author rows carry an extra description cell,
/// followed by `name; affiliation; country`.
pub fn parse_metadata_page(html: &str) -> SiteMetadata {
  let document = Html::parse_document(html);
  let cell_selector = Selector::parse("td").unwrap();
  let cells: Vec<ElementRef<'_>> = document.select(&cell_selector).collect();
  let labelled = |label: &str| {
    cells
      .iter()
      .find(|cell| element_text(**cell).contains(label))
      .and_then(|cell| next_td(*cell))
      .map(element_text)
      .unwrap_or_default()
  };

  let mut metadata = SiteMetadata {
    title: labelled("Título do documento"),
    doi: labelled("Digital Object Identifier (DOI)"),
    ..Default::default()
  };

  for (index, cell) in cells.iter().enumerate() {
    if !element_text(*cell).contains("Autor") {
      continue;
    }
    let Some(details) = cells.get(index + 1).and_then(|info| next_td(*info)) else { continue };
    let details = element_text(details);
    let parts: Vec<&str> = details.split(';').map(str::trim).collect();
    if parts.len() < 3 {
      trace!("Skipping author row without affiliation and country: {details}");
      continue;
    }
    let mut author = Author::from_full_name(parts[0]);
    author.affiliation = parts[1].to_string();
    author.country = parts[2].to_string();
    author.order = metadata.authors.len() as u32 + 1;
    metadata.authors.push(author);
  }

  let description = cells
    .iter()
    .find(|cell| {
      let text = element_text(**cell);
      text.contains("Resumo") || text.contains("Abstract")
    })
    .and_then(|cell| next_td(*cell))
    .map(|cell| cell.text().collect::<String>())
    .unwrap_or_default();
  let (abstract_orig, abstract_en) = split_abstracts(&description);
  metadata.abstract_orig = abstract_orig;
  metadata.abstract_en = abstract_en;
  metadata
}

/// Splits a description cell into its `Resumo:` and `Abstract:` parts.
fn split_abstracts(content: &str) -> (String, String) {
  match (content.contains("Resumo:"), content.split_once("Abstract:")) {
    (true, Some((resumo, abstract_en))) => {
      (resumo.replace("Resumo:", "").trim().to_string(), abstract_en.trim().to_string())
    },
    (true, None) => (content.replace("Resumo:", "").trim().to_string(), String::new()),
    (false, Some(_)) => (String::new(), content.replace("Abstract:", "").trim().to_string()),
    (false, None) => (String::new(), String::new()),
  }
}

/// Fetches website stubs from an OJS issue page.
#[derive(Debug, Clone)]
pub struct OjsScraper {
  /// Shared HTTP client
  http:     reqwest::Client,
  /// Table-of-contents page of the issue
  site_url: String,
}

impl OjsScraper {
  /// Creates a scraper for the issue page at `site_url`.
  pub fn new(site_url: &str) -> Self {
    Self { http: reqwest::Client::new(), site_url: site_url.to_string() }
  }

  /// Reuses an existing HTTP client.
  pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
    self.http = http;
    self
  }

  /// Scrapes the table of contents and every article's metadata page.
  ///
  /// At most `limit` articles are returned. A metadata page that cannot be fetched is logged and
  /// its stub kept without metadata.
  ///
  /// # Errors
  ///
  /// Fails when the site URL is invalid or the table of contents cannot be fetched.
  pub async fn fetch_articles(&self, limit: Option<usize>) -> Result<Vec<WebsiteArticle>> {
    let page_url = Url::parse(&self.site_url)?;
    let html = fetch_html(&self.http, page_url.as_str()).await?;
    let entries = parse_toc(&html, &page_url, limit);
    info!("Found {} articles on {}", entries.len(), self.site_url);

    let mut articles = Vec::with_capacity(entries.len());
    for TocEntry { mut article, pdf_url } in entries {
      debug!("Scraping website article {}: {}", article.seq, article.id_jems);
      if let Some(pdf_url) = pdf_url {
        match fetch_html(&self.http, &convert_url(&pdf_url)).await {
          Ok(html) => article.metadata = Some(parse_metadata_page(&html)),
          Err(e) => warn!("Could not fetch the metadata page of {}: {e}", article.id_jems),
        }
      }
      articles.push(article);
    }
    Ok(articles)
  }
}

/// GETs `url` and returns the body, failing on non-success statuses.
pub(crate) async fn fetch_html(http: &reqwest::Client, url: &str) -> Result<String> {
  trace!("GET {url}");
  Ok(http.get(url).send().await?.error_for_status()?.text().await?)
}

#[cfg(test)]
mod tests {
  use super::*;

  const TOC: &str = r#"
    <html><body>
      <h4 class="tocSectionTitle">Editorial</h4>
      <table><tr>
        <td><div class="tocTitle">Apresentação</div></td>
        <td><div class="tocPages">i</div><a href="article/view/10/100">PDF</a></td>
      </tr></table>
      <h4 class="tocSectionTitle">Artigos Completos</h4>
      <table><tr>
        <td><div class="tocTitle"> Robótica educacional </div></td>
        <td><div class="tocPages">1</div>
          <a href="http://example.org/sbie/article/view/11/S%C3%A3o.pdf">PDF</a></td>
      </tr></table>
      <table><tr>
        <td><div class="tocTitle">Sem arquivo</div></td>
        <td><div class="tocPages">11</div><a href="article/view/12/120">HTML</a></td>
      </tr></table>
      <p>separator</p>
      <table><tr><td><div class="tocTitle">Not in section</div></td></tr></table>
      <h4 class="tocSectionTitle">Artigos Resumidos</h4>
      <table><tr>
        <td><div class="tocTitle">Curto</div></td>
        <td><div class="tocPages">21</div><a href="article/view/13/130">PDF</a></td>
      </tr></table>
    </body></html>
  "#;

  const METADATA: &str = r#"
    <table>
      <tr><td>1.</td><td>Título do documento</td><td>Robótica educacional</td></tr>
      <tr><td>2.</td><td>Autor</td><td>Nome do autor</td>
        <td>Maria da Silva Santos; Universidade Federal X; Brasil</td></tr>
      <tr><td>2.</td><td>Autor</td><td>Nome do autor</td><td>João Lima; UFY</td></tr>
      <tr><td>3.</td><td>Descrição</td><td>Resumo</td>
        <td>Resumo: Um estudo sobre robôs. Abstract: A study about robots.</td></tr>
      <tr><td>4.</td><td>Digital Object Identifier (DOI)</td><td>10.5753/x.2023.1</td></tr>
    </table>
  "#;

  fn page_url() -> Url { Url::parse("http://example.org/sbie/issue/view/1").unwrap() }

  #[test]
  fn test_parse_toc() {
    let entries = parse_toc(TOC, &page_url(), None);
    let summary: Vec<(u32, &str, &str, &str)> = entries
      .iter()
      .map(|e| {
        let a = &e.article;
        (a.seq, a.section.as_str(), a.first_page.as_str(), a.id_jems.as_str())
      })
      .collect();
    assert_eq!(summary, vec![
      (1, "EDT", "i", "100"),
      (2, "ART-C", "1", "São"),
      (3, "ART-C", "11", NO_PDF_LINK),
      (4, "ART-R", "21", "130"),
    ]);
    assert_eq!(entries[1].article.title_orig, "Robótica educacional");
    assert_eq!(
      entries[0].pdf_url.as_deref(),
      Some("http://example.org/sbie/issue/view/article/view/10/100")
    );
    assert!(entries[2].pdf_url.is_none());
  }

  #[test]
  fn test_parse_toc_limit() {
    let entries = parse_toc(TOC, &page_url(), Some(2));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].article.id_jems, "São");
  }

  #[traced_test]
  #[test]
  fn test_parse_metadata_page() {
    let metadata = parse_metadata_page(METADATA);
    assert_eq!(metadata.title, "Robótica educacional");
    assert_eq!(metadata.doi, "10.5753/x.2023.1");
    assert_eq!(metadata.abstract_orig, "Um estudo sobre robôs.");
    assert_eq!(metadata.abstract_en, "A study about robots.");

    assert_eq!(metadata.authors.len(), 1);
    let author = &metadata.authors[0];
    assert_eq!(
      (author.first_name.as_str(), author.middle_name.as_str(), author.last_name.as_str()),
      ("Maria", "da Silva", "Santos")
    );
    assert_eq!(author.affiliation, "Universidade Federal X");
    assert_eq!(author.country, "Brasil");
    assert_eq!(author.order, 1);
    assert!(logs_contain("Skipping author row"));
  }

  #[test]
  fn test_split_abstracts() {
    assert_eq!(split_abstracts("Resumo: só resumo"), ("só resumo".into(), String::new()));
    assert_eq!(split_abstracts("Abstract: only"), (String::new(), "only".into()));
    assert_eq!(split_abstracts("nothing"), (String::new(), String::new()));
  }

  #[test]
  fn test_to_article() {
    let stub = WebsiteArticle {
      seq: 3,
      section: Section::ShortPaper,
      title_orig: String::new(),
      first_page: "21".into(),
      id_jems: "130".into(),
      metadata: Some(parse_metadata_page(METADATA)),
    };
    let article = stub.to_article();
    assert_eq!(article.title_orig, "Robótica educacional");
    assert_eq!(article.seq, 3);
    assert_eq!(article.authors.len(), 1);
    assert_eq!(article.doi, "10.5753/x.2023.1");
  }
}
