//! Anthropic messages backend.

use super::*;
use crate::credentials::ANTHROPIC_API_KEY;

/// Messages endpoint.
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used when the configuration names none.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-opus-20240229";

/// Provider backed by the Anthropic messages API.
///
/// The messages API has no JSON response mode, so `want_json` only shapes the prompt through the
/// purpose's system prompt.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
  /// Shared HTTP client
  http:          reqwest::Client,
  /// Endpoint URL
  url:           String,
  /// Model name
  model:         String,
  /// API key; requests are skipped with a warning when absent
  api_key:       Option<String>,
  /// System prompt of the bound purpose
  system_prompt: String,
}

/// Request body of `POST /v1/messages`.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
  /// Model name
  model:       &'a str,
  /// Top-level system prompt
  #[serde(skip_serializing_if = "Option::is_none")]
  system:      Option<&'a str>,
  /// Conversation, a single user turn here
  messages:    Vec<Message>,
  /// Sampling temperature
  temperature: f64,
  /// Maximum generated tokens
  max_tokens:  u32,
}

/// The parts of a messages response we read.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
  /// Content blocks in order
  content: Vec<ContentBlock>,
}

/// A content block; only `text` blocks carry text.
#[derive(Debug, Deserialize)]
struct ContentBlock {
  /// Block type
  #[serde(rename = "type")]
  kind: String,
  /// Text of a `text` block
  #[serde(default)]
  text: Option<String>,
}

impl AnthropicClient {
  /// Creates a client for `model`.
  pub fn new(model: &str, api_key: Option<String>) -> Self {
    Self {
      http: reqwest::Client::new(),
      url: ANTHROPIC_MESSAGES_URL.to_string(),
      model: model.to_string(),
      api_key,
      system_prompt: String::new(),
    }
  }

  /// Reuses an existing HTTP client.
  pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
    self.http = http;
    self
  }

  /// Overrides the endpoint URL.
  pub fn with_url(mut self, url: &str) -> Self {
    self.url = url.to_string();
    self
  }

  /// Sets the system prompt sent with every request.
  pub fn with_system_prompt(mut self, prompt: &str) -> Self {
    self.system_prompt = prompt.to_string();
    self
  }

  fn build_request(&self, message: &str) -> MessagesRequest<'_> {
    MessagesRequest {
      model:       &self.model,
      system:      (!self.system_prompt.is_empty()).then_some(self.system_prompt.as_str()),
      messages:    vec![Message::user(message)],
      temperature: DEFAULT_TEMPERATURE,
      max_tokens:  DEFAULT_MAX_TOKENS,
    }
  }

  async fn request(&self, message: &str) -> Result<String> {
    let api_key =
      self.api_key.as_deref().ok_or(MigratorError::MissingCredential(ANTHROPIC_API_KEY))?;
    let request = self
      .http
      .post(&self.url)
      .header("x-api-key", api_key)
      .header("anthropic-version", ANTHROPIC_VERSION)
      .json(&self.build_request(message));
    let response: MessagesResponse = post_json(request).await?;
    Ok(
      response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .unwrap_or_default(),
    )
  }
}

#[async_trait]
impl Completion for AnthropicClient {
  async fn create_completion(&self, message: &str, _want_json: bool) -> String {
    completion_or_empty("Anthropic", self.request(message).await)
  }
}
