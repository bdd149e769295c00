//! LLM extraction of article records from PDF text.
//!
//! Each article costs at most two provider calls: one over the header pages for the article fields
//! and one over the closing pages for the bibliography. Both go through
//! [`ArticleExtractor::extract_info_with_ai`], which tolerates chatty answers by pulling out the
//! first JSON block and retries unparseable ones a bounded number of times.

use futures::stream::{self, StreamExt};

use super::*;

/// Provider calls made for one instruction before giving up.
pub const MAX_EXTRACTION_ATTEMPTS: usize = 4;

lazy_static! {
  /// Greedy match of the outermost JSON object or array in a reply.
  static ref JSON_BLOCK: Regex = Regex::new(r"(?s)\{.*\}|\[.*\]").unwrap();
}

/// Parses the JSON block embedded in an LLM reply.
///
/// ```
/// use migrator::extractor::parse_ai_response;
///
/// let value = parse_ai_response("Sure! Here it is:\n{\"titleOrig\": \"Robótica\"}\nAnything else?");
/// assert_eq!(value.unwrap()["titleOrig"], "Robótica");
/// ```
///
/// # Errors
///
/// [`MigratorError::NoJsonFound`] when the reply has no braces or brackets, or a JSON error when
/// the block does not parse.
pub fn parse_ai_response(response: &str) -> Result<Value> {
  let block = JSON_BLOCK.find(response).ok_or(MigratorError::NoJsonFound)?;
  Ok(serde_json::from_str(block.as_str())?)
}

/// Turns PDF text into [`Article`] records.
#[derive(Clone)]
pub struct ArticleExtractor {
  /// Providers, one per purpose
  pub(crate) clients:     Clients,
  /// Cleans segmented text before it is sent
  normalizer:             TextNormalizer,
  /// Markers for page selection
  markers:                PageMarkers,
  /// Language code forced onto extracted articles
  language:               String,
  /// Articles processed at once
  pub(crate) concurrency: usize,
  /// How completion answers are applied
  pub(crate) strategy:    CompletionStrategy,
}

impl ArticleExtractor {
  /// Creates an extractor with default markers, language `pt` and sequential processing.
  ///
  /// Encoding repair goes through the text-processing provider of `clients`.
  pub fn new(clients: Clients) -> Self {
    let normalizer = TextNormalizer::new().with_repairer(clients.text_processing.clone());
    Self {
      clients,
      normalizer,
      markers: PageMarkers::default(),
      language: DEFAULT_LANGUAGE.to_string(),
      concurrency: 1,
      strategy: CompletionStrategy::default(),
    }
  }

  /// Creates an extractor with the markers, language, concurrency and strategy of `config`.
  pub fn from_config(clients: Clients, config: &Config) -> Self {
    Self::new(clients)
      .with_markers(config.markers())
      .with_language(&config.language)
      .with_concurrency(config.concurrency())
      .with_strategy(config.completion_strategy)
  }

  /// Sets the page selection markers.
  pub fn with_markers(mut self, markers: PageMarkers) -> Self {
    self.markers = markers;
    self
  }

  /// Sets the language code given to every extracted article.
  pub fn with_language(mut self, language: &str) -> Self {
    self.language = language.to_string();
    self
  }

  /// Sets how many articles are processed at once; at least one.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Sets how field completion answers are applied.
  pub fn with_strategy(mut self, strategy: CompletionStrategy) -> Self {
    self.strategy = strategy;
    self
  }

  /// Replaces the text normalizer.
  pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
    self.normalizer = normalizer;
    self
  }

  /// Sends `instruction` to `provider` until the reply contains parseable JSON.
  ///
  /// Makes at most [`MAX_EXTRACTION_ATTEMPTS`] calls and returns an empty object when all of them
  /// fail. Never returns an error.
  pub async fn extract_info_with_ai(provider: &dyn Completion, instruction: &str) -> Value {
    for attempt in 1..=MAX_EXTRACTION_ATTEMPTS {
      let response = provider.create_completion(instruction, true).await;
      match parse_ai_response(&response) {
        Ok(value) => return value,
        Err(e) => warn!("Attempt {attempt}/{MAX_EXTRACTION_ATTEMPTS} to extract JSON failed: {e}"),
      }
    }
    warn!("No JSON after {MAX_EXTRACTION_ATTEMPTS} attempts, using an empty object");
    Value::Object(Map::new())
  }

  /// Extracts one article from its PDF text.
  ///
  /// `section` comes from the matching website stub. Editorials have no bibliography, so the
  /// references call is skipped for them.
  pub async fn extract_article(&self, pdf: &PdfText, section: &Section) -> Article {
    let first = select_pages(&pdf.text_pages, PageLocation::First, &self.markers);
    let last = select_pages(&pdf.text_pages, PageLocation::Last, &self.markers);
    let first_pages = self.normalizer.clean(&first).await;
    let last_pages = self.normalizer.clean(&last).await;

    let mut fields =
      match Self::extract_info_with_ai(self.clients.article.as_ref(), &first_pages).await {
        Value::Object(map) => map,
        other => {
          warn!("Article extraction for {} returned a non-object: {other}", pdf.base_filename);
          Map::new()
        },
      };

    let references = if section.is_editorial() {
      debug!("Skipping references of editorial {}", pdf.base_filename);
      Value::Array(Vec::new())
    } else {
      match Self::extract_info_with_ai(self.clients.references.as_ref(), &last_pages).await {
        Value::Object(mut map) => map.remove("references").unwrap_or(Value::Array(Vec::new())),
        list @ Value::Array(_) => list,
        _ => Value::Array(Vec::new()),
      }
    };

    fields.insert("firstPages".into(), Value::String(first_pages.clone()));
    fields.insert("lastPages".into(), Value::String(last_pages.clone()));
    if !section.is_empty() {
      fields.insert("sectionAbbrev".into(), Value::String(section.to_string()));
    }
    fields.insert("references".into(), references);
    fields.insert("numPages".into(), Value::from(pdf.num_pages));
    fields.insert("idJEMS".into(), Value::String(pdf.base_filename.clone()));
    fields.insert("language".into(), Value::String(self.language.clone()));

    Article::from_value(Value::Object(fields)).unwrap_or_else(|e| {
      warn!("Could not interpret extraction for {}: {e}", pdf.base_filename);
      Article {
        id_jems: pdf.base_filename.clone(),
        num_pages: pdf.num_pages,
        language: self.language.clone(),
        section: section.clone(),
        first_pages,
        last_pages,
        ..Default::default()
      }
    })
  }

  /// Extracts every article, at most `concurrency` at a time, in input order.
  ///
  /// `sections` maps `id_jems` to the section of the matching website stub; texts without a stub
  /// get an empty section.
  pub async fn extract_articles(
    &self,
    texts: &[PdfText],
    sections: &HashMap<String, Section>,
  ) -> Vec<Article> {
    let total = texts.len();
    stream::iter(texts.iter().enumerate())
      .map(|(index, pdf)| {
        let section = sections.get(&pdf.base_filename).cloned().unwrap_or_default();
        async move {
          let article = self.extract_article(pdf, &section).await;
          info!("Processed article {}/{total}: {}", index + 1, pdf.base_filename);
          article
        }
      })
      .buffered(self.concurrency)
      .collect()
      .await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use serde_json::json;

  use super::*;

  struct Scripted {
    answer: String,
    calls:  AtomicUsize,
  }

  #[async_trait]
  impl Completion for Scripted {
    async fn create_completion(&self, _message: &str, want_json: bool) -> String {
      assert!(want_json);
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.answer.clone()
    }
  }

  fn scripted(answer: &str) -> Arc<Scripted> {
    Arc::new(Scripted { answer: answer.to_string(), calls: AtomicUsize::new(0) })
  }

  fn clients(article: Arc<Scripted>, references: Arc<Scripted>) -> Clients {
    let mut clients = Clients::uniform(scripted("{}"));
    clients.article = article;
    clients.references = references;
    clients
  }

  fn pdf(id: &str, pages: &[&str]) -> PdfText {
    PdfText {
      text_pages:    pages.iter().map(|p| p.to_string()).collect(),
      num_pages:     pages.len() as u32,
      base_filename: id.to_string(),
    }
  }

  #[test]
  fn test_parse_ai_response() {
    assert_eq!(parse_ai_response("```json\n[1, 2]\n```").unwrap(), json!([1, 2]));
    assert_eq!(parse_ai_response("{\"a\": {\"b\": 1}}").unwrap(), json!({"a": {"b": 1}}));
    assert!(matches!(parse_ai_response("no json here"), Err(MigratorError::NoJsonFound)));
    assert!(matches!(parse_ai_response("{not: json}"), Err(MigratorError::Json(_))));
  }

  #[tokio::test]
  async fn test_valid_reply_is_stable() {
    let provider = scripted("{\"titleOrig\": \"A\"}");
    let first = ArticleExtractor::extract_info_with_ai(provider.as_ref(), "x").await;
    let second = ArticleExtractor::extract_info_with_ai(provider.as_ref(), "x").await;
    assert_eq!(first, json!({"titleOrig": "A"}));
    assert_eq!(first, second);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_garbage_reply_gives_up_after_four_attempts() {
    let provider = scripted("I cannot help with that.");
    let value = ArticleExtractor::extract_info_with_ai(provider.as_ref(), "x").await;
    assert_eq!(value, json!({}));
    assert_eq!(provider.calls.load(Ordering::SeqCst), MAX_EXTRACTION_ATTEMPTS);
    assert!(logs_contain("Attempt 4/4"));
  }

  #[tokio::test]
  async fn test_extract_article() {
    let article_provider = scripted(
      r#"{"titleOrig": "Robótica", "idJEMS": "wrong", "numPages": 99, "language": "en",
          "authors": [{"authorFirstName": "Ana", "authorLastName": "Lima"}]}"#,
    );
    let references_provider = scripted(r#"{"references": [{"description": "Ref 1", "order": 1}]}"#);
    let extractor = ArticleExtractor::new(clients(article_provider, references_provider.clone()));

    let text = pdf("1234", &["Header page", "Body", "Body", "References\nRef 1"]);
    let article = extractor.extract_article(&text, &Section::FullPaper).await;

    assert_eq!(article.id_jems, "1234");
    assert_eq!(article.num_pages, 4);
    assert_eq!(article.language, "pt");
    assert_eq!(article.section, Section::FullPaper);
    assert_eq!(article.title_orig, "Robótica");
    assert_eq!(article.authors[0].last_name, "Lima");
    assert_eq!(article.first_pages, "Header page, Body");
    assert_eq!(article.last_pages, "References Ref 1");
    assert_eq!(article.references.len(), 1);
    assert_eq!(references_provider.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_bare_reference_list() {
    let extractor =
      ArticleExtractor::new(clients(scripted("{}"), scripted(r#"[{"description": "Only"}]"#)));
    let article = extractor.extract_article(&pdf("9", &["a", "b"]), &Section::ShortPaper).await;
    assert_eq!(article.references[0].description, "Only");
  }

  #[tokio::test]
  async fn test_editorial_skips_references() {
    let references_provider = scripted("[]");
    let extractor =
      ArticleExtractor::new(clients(scripted("{}"), references_provider.clone()));
    let article = extractor.extract_article(&pdf("1", &["Editorial"]), &Section::Editorial).await;
    assert!(article.references.is_empty());
    assert_eq!(references_provider.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_extract_articles_keeps_order() {
    let extractor =
      ArticleExtractor::new(clients(scripted("{}"), scripted("[]"))).with_concurrency(4);
    let texts: Vec<PdfText> = (1..=6).map(|i| pdf(&i.to_string(), &["page"])).collect();
    let sections = HashMap::from([("2".to_string(), Section::Editorial)]);

    let articles = extractor.extract_articles(&texts, &sections).await;
    let ids: Vec<&str> = articles.iter().map(|a| a.id_jems.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    assert_eq!(articles[1].section, Section::Editorial);
    assert!(articles[0].section.is_empty());
  }
}
