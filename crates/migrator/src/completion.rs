//! Second LLM pass over articles that still have empty fields.

use futures::stream::{self, StreamExt};

use super::*;

/// Whether `article` should be sent for field completion.
///
/// It needs a title in some language to be identifiable, must not be an editorial and must have
/// at least one empty field.
pub fn is_eligible(article: &Article) -> bool {
  article.has_title() && !article.section.is_editorial() && article.has_missing_fields()
}

impl ArticleExtractor {
  /// Fills empty fields of every eligible article, at most `concurrency` at a time.
  ///
  /// Ineligible articles pass through untouched. Output order equals input order.
  pub async fn complete_missing_fields(&self, articles: Vec<Article>) -> Vec<Article> {
    let total = articles.len();
    stream::iter(articles.into_iter().enumerate())
      .map(|(index, article)| async move {
        if !is_eligible(&article) {
          trace!("Article {}/{total} ({}) needs no completion", index + 1, article.id_jems);
          return article;
        }
        info!("Improving article {}/{total}: {}", index + 1, article.id_jems);
        self.complete_article(article).await
      })
      .buffered(self.concurrency)
      .collect()
      .await
  }

  /// Sends one article to the field-completion provider and applies the answer.
  ///
  /// Only a non-empty JSON object is applied, under the configured [`CompletionStrategy`];
  /// anything else keeps the article as it was.
  pub async fn complete_article(&self, article: Article) -> Article {
    debug!("Missing fields of {}: {:?}", article.id_jems, article.missing_fields());
    let payload = article.completion_payload().to_string();
    let answer =
      Self::extract_info_with_ai(self.clients.field_completion.as_ref(), &payload).await;

    let completed = match answer {
      Value::Object(map) if !map.is_empty() => Article::from_value(Value::Object(map)),
      other => {
        warn!("Completion of {} gave no usable object: {other}", article.id_jems);
        return article;
      },
    };

    match (completed, self.strategy) {
      (Ok(completed), CompletionStrategy::Replace) => completed,
      (Ok(completed), CompletionStrategy::Merge) => {
        let mut article = article;
        article.fill_missing_from(&completed);
        article
      },
      (Err(e), _) => {
        warn!("Could not interpret completion of {}: {e}", article.id_jems);
        article
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  struct Answer {
    text:  String,
    calls: AtomicUsize,
  }

  #[async_trait]
  impl Completion for Answer {
    async fn create_completion(&self, message: &str, _want_json: bool) -> String {
      assert!(!message.contains("firstPages"));
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.text.clone()
    }
  }

  fn extractor(answer: &str) -> (ArticleExtractor, Arc<Answer>) {
    let provider = Arc::new(Answer { text: answer.to_string(), calls: AtomicUsize::new(0) });
    let mut clients = Clients::uniform(provider.clone());
    clients.field_completion = provider.clone();
    (ArticleExtractor::new(clients), provider)
  }

  fn incomplete(id: &str) -> Article {
    Article {
      id_jems: id.to_string(),
      title_orig: "Robótica".to_string(),
      section: Section::FullPaper,
      first_pages: "raw".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_eligibility() {
    assert!(is_eligible(&incomplete("1")));

    let untitled = Article { title_orig: String::new(), ..incomplete("1") };
    assert!(!is_eligible(&untitled));

    let editorial = Article { section: Section::Editorial, ..incomplete("1") };
    assert!(!is_eligible(&editorial));
  }

  #[tokio::test]
  async fn test_replace_strategy() {
    let (extractor, provider) =
      extractor(r#"{"idJEMS": "1", "titleOrig": "Novo", "doi": "10/x"}"#);
    let articles = extractor.complete_missing_fields(vec![incomplete("1")]).await;
    assert_eq!(articles[0].title_orig, "Novo");
    assert_eq!(articles[0].doi, "10/x");
    assert_eq!(articles[0].first_pages, "");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_merge_strategy() {
    let (extractor, _) = extractor(r#"{"titleOrig": "Novo", "doi": "10/x"}"#);
    let extractor = extractor.with_strategy(CompletionStrategy::Merge);
    let articles = extractor.complete_missing_fields(vec![incomplete("1")]).await;
    assert_eq!(articles[0].title_orig, "Robótica");
    assert_eq!(articles[0].doi, "10/x");
    assert_eq!(articles[0].first_pages, "raw");
  }

  #[traced_test]
  #[tokio::test]
  async fn test_unusable_answers_keep_article() {
    for answer in ["[1, 2]", "{}", "nothing"] {
      let (extractor, _) = extractor(answer);
      let articles = extractor.complete_missing_fields(vec![incomplete("7")]).await;
      assert_eq!(articles, vec![incomplete("7")]);
    }
    assert!(logs_contain("gave no usable object"));
  }

  #[tokio::test]
  async fn test_ineligible_articles_skip_provider() {
    let (extractor, provider) = extractor(r#"{"titleOrig": "x"}"#);
    let editorial = Article { section: Section::Editorial, ..incomplete("2") };
    let articles = extractor.complete_missing_fields(vec![editorial.clone()]).await;
    assert_eq!(articles, vec![editorial]);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
  }
}
