//! LLM completion providers.
//!
//! Every stage that talks to a model does so through [`Completion`]: one message in, raw text out.
//! A provider instance is bound to a single [`Purpose`], whose system prompt it sends with every
//! request, so the pipeline holds five instances (see [`Clients`]) that may all point at the same
//! backend.
//!
//! Providers never fail. Network errors, non-success statuses, undecodable bodies and missing API
//! keys are logged at `warn` and turned into an empty completion, which the callers treat as "no
//! answer" and handle through their own retry or fallback rules.
//!
//! Three backends are available:
//!
//! - [`OpenAiClient`]: the OpenAI chat completions API
//! - [`AnthropicClient`]: the Anthropic messages API
//! - [`OllamaClient`]: a local Ollama chat endpoint

use serde::de::DeserializeOwned;

use super::*;
use crate::credentials::Credentials;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use self::{anthropic::AnthropicClient, ollama::OllamaClient, openai::OpenAiClient};

/// Sampling temperature used by every provider.
pub const DEFAULT_TEMPERATURE: f64 = 0.0;

/// Upper bound on generated tokens per completion.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// A text completion backend bound to one system prompt.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use migrator::llm::Completion;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Completion for Echo {
///   async fn create_completion(&self, message: &str, _want_json: bool) -> String {
///     message.to_string()
///   }
/// }
/// ```
#[async_trait]
pub trait Completion: Send + Sync {
  /// Sends `message` and returns the raw reply.
  ///
  /// `want_json` asks the backend for a JSON reply where it supports that; the reply is still
  /// returned as text. Failures yield an empty string.
  async fn create_completion(&self, message: &str, want_json: bool) -> String;
}

/// A chat message as understood by all three backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  /// `system`, `user` or `assistant`
  pub role:    String,
  /// Message text
  pub content: String,
}

impl Message {
  /// A system message.
  pub fn system(content: &str) -> Self {
    Self { role: "system".to_string(), content: content.to_string() }
  }

  /// A user message.
  pub fn user(content: &str) -> Self {
    Self { role: "user".to_string(), content: content.to_string() }
  }
}

/// The task a provider instance is used for. Each purpose has its own system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
  /// Header metadata from the first pages
  ArticleExtraction,
  /// Bibliography from the last pages
  ReferencesExtraction,
  /// Second pass over records with empty fields
  FieldCompletion,
  /// Normalisation of institution names in the authors export
  AffiliationCorrection,
  /// Repair of encoding-damaged text
  TextProcessing,
}

impl Purpose {
  /// All purposes, in pipeline order.
  pub const ALL: [Purpose; 5] = [
    Self::ArticleExtraction,
    Self::ReferencesExtraction,
    Self::FieldCompletion,
    Self::AffiliationCorrection,
    Self::TextProcessing,
  ];

  /// Key of this purpose's system prompt in the prompts file.
  pub fn prompt_key(self) -> &'static str {
    match self {
      Self::ArticleExtraction => "article_extraction",
      Self::ReferencesExtraction => "references_extraction",
      Self::FieldCompletion => "field_completion",
      Self::AffiliationCorrection => "author_affiliation_correction",
      Self::TextProcessing => "text_processing",
    }
  }
}

impl Display for Purpose {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.prompt_key())
  }
}

/// Sends a request and decodes a JSON body, turning non-success statuses into
/// [`MigratorError::ApiError`].
pub(crate) async fn post_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
  let response = request.send().await?;
  let status = response.status();
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    return Err(MigratorError::ApiError(format!("HTTP {status}: {body}")));
  }
  Ok(response.json().await?)
}

/// Unwraps a provider result into the completion text, logging failures.
pub(crate) fn completion_or_empty(provider: &str, result: Result<String>) -> String {
  match result {
    Ok(text) => {
      trace!("{provider} returned {} chars", text.len());
      text
    },
    Err(e) => {
      warn!("{provider} completion failed: {e}");
      String::new()
    },
  }
}

/// One provider instance per [`Purpose`].
#[derive(Clone)]
pub struct Clients {
  /// Bound to [`Purpose::ArticleExtraction`]
  pub article:                Arc<dyn Completion>,
  /// Bound to [`Purpose::ReferencesExtraction`]
  pub references:             Arc<dyn Completion>,
  /// Bound to [`Purpose::FieldCompletion`]
  pub field_completion:       Arc<dyn Completion>,
  /// Bound to [`Purpose::AffiliationCorrection`]
  pub affiliation_correction: Arc<dyn Completion>,
  /// Bound to [`Purpose::TextProcessing`]
  pub text_processing:        Arc<dyn Completion>,
}

impl Clients {
  /// Uses the same provider for every purpose.
  pub fn uniform(client: Arc<dyn Completion>) -> Self {
    Self {
      article:                client.clone(),
      references:             client.clone(),
      field_completion:       client.clone(),
      affiliation_correction: client.clone(),
      text_processing:        client,
    }
  }

  /// Builds the five providers from the configuration.
  ///
  /// The backend is the configured one unless `USE_OPENAI` overrides it (see
  /// [`Credentials::resolve_provider`]). System prompts come from the prompts file.
  ///
  /// # Errors
  ///
  /// Fails when the prompts file cannot be read or parsed, or when the Ollama host is not a valid
  /// URL. Missing API keys are not an error here; the affected provider logs and returns empty
  /// completions.
  pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
    let prompts = match &config.prompts_file {
      Some(path) => Prompts::from_path(path)?,
      None => {
        warn!("No prompts_file configured, all system prompts will be empty");
        Prompts::default()
      },
    };
    let provider = credentials.resolve_provider(config.provider);
    info!("Using {provider} for completions");

    let http = reqwest::Client::new();
    let build = |purpose: Purpose| -> Result<Arc<dyn Completion>> {
      let system_prompt = prompts.get(purpose);
      let client: Arc<dyn Completion> = match provider {
        Provider::OpenAi => Arc::new(
          OpenAiClient::new(&config.openai_model, credentials.openai_api_key.clone())
            .with_http_client(http.clone())
            .with_system_prompt(&system_prompt),
        ) as Arc<dyn Completion>,
        Provider::Anthropic => Arc::new(
          AnthropicClient::new(&config.anthropic_model, credentials.anthropic_api_key.clone())
            .with_http_client(http.clone())
            .with_system_prompt(&system_prompt),
        ),
        Provider::Ollama => Arc::new(
          OllamaClient::new(&config.ollama_host, &config.ollama_model)?
            .with_http_client(http.clone())
            .with_system_prompt(&system_prompt),
        ),
      };
      Ok(client)
    };

    Ok(Self {
      article:                build(Purpose::ArticleExtraction)?,
      references:             build(Purpose::ReferencesExtraction)?,
      field_completion:       build(Purpose::FieldCompletion)?,
      affiliation_correction: build(Purpose::AffiliationCorrection)?,
      text_processing:        build(Purpose::TextProcessing)?,
    })
  }

  /// The provider bound to `purpose`.
  pub fn get(&self, purpose: Purpose) -> Arc<dyn Completion> {
    match purpose {
      Purpose::ArticleExtraction => self.article.clone(),
      Purpose::ReferencesExtraction => self.references.clone(),
      Purpose::FieldCompletion => self.field_completion.clone(),
      Purpose::AffiliationCorrection => self.affiliation_correction.clone(),
      Purpose::TextProcessing => self.text_processing.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Fixed(&'static str);

  #[async_trait]
  impl Completion for Fixed {
    async fn create_completion(&self, _message: &str, _want_json: bool) -> String {
      self.0.to_string()
    }
  }

  #[test]
  fn test_prompt_keys() {
    let keys: Vec<_> = Purpose::ALL.iter().map(|p| p.prompt_key()).collect();
    assert_eq!(keys, vec![
      "article_extraction",
      "references_extraction",
      "field_completion",
      "author_affiliation_correction",
      "text_processing"
    ]);
    assert_eq!(Purpose::TextProcessing.to_string(), "text_processing");
  }

  #[tokio::test]
  async fn test_uniform_clients() {
    let clients = Clients::uniform(Arc::new(Fixed("same")));
    for purpose in Purpose::ALL {
      assert_eq!(clients.get(purpose).create_completion("hi", false).await, "same");
    }
  }

  #[traced_test]
  #[test]
  fn test_completion_or_empty() {
    assert_eq!(completion_or_empty("Test", Ok("text".into())), "text");
    assert_eq!(completion_or_empty("Test", Err(MigratorError::ApiError("HTTP 500".into()))), "");
    assert!(logs_contain("Test completion failed: API error: HTTP 500"));
  }

  #[traced_test]
  #[test]
  fn test_from_config_without_prompts() {
    let dir = tempdir().unwrap();
    let config =
      Config::for_site("https://example.org/issue/view/1", dir.path(), "2023", "10.5753/x.");
    let credentials = Credentials::default();
    assert!(Clients::from_config(&config, &credentials).is_ok());
    assert!(logs_contain("No prompts_file configured"));
  }
}
