//! OpenAI chat completions backend.

use super::*;
use crate::credentials::OPENAI_API_KEY;

/// Chat completions endpoint.
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model used when the configuration names none.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Provider backed by the OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
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

/// Request body of `POST /v1/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  /// Model name
  model:           &'a str,
  /// System and user messages
  messages:        Vec<Message>,
  /// Sampling temperature
  temperature:     f64,
  /// Maximum generated tokens
  max_tokens:      u32,
  /// `json_object` or `text`
  response_format: ResponseFormat,
}

/// Requested reply format.
#[derive(Debug, Serialize)]
struct ResponseFormat {
  /// Format name
  #[serde(rename = "type")]
  kind: &'static str,
}

/// The parts of a chat completion response we read.
#[derive(Debug, Deserialize)]
struct ChatResponse {
  /// Generated alternatives; only the first is used
  choices: Vec<Choice>,
}

/// One generated alternative.
#[derive(Debug, Deserialize)]
struct Choice {
  /// Generated message
  message: ChoiceMessage,
}

/// Generated message; `content` is null for refusals and tool calls.
#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  /// Generated text
  content: Option<String>,
}

impl OpenAiClient {
  /// Creates a client for `model`.
  pub fn new(model: &str, api_key: Option<String>) -> Self {
    Self {
      http: reqwest::Client::new(),
      url: OPENAI_CHAT_URL.to_string(),
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

  /// Overrides the endpoint URL, e.g. for a compatible proxy.
  pub fn with_url(mut self, url: &str) -> Self {
    self.url = url.to_string();
    self
  }

  /// Sets the system prompt sent with every request.
  pub fn with_system_prompt(mut self, prompt: &str) -> Self {
    self.system_prompt = prompt.to_string();
    self
  }

  /// Builds the request body.
  fn build_request(&self, message: &str, want_json: bool) -> ChatRequest<'_> {
    let mut messages = Vec::with_capacity(2);
    if !self.system_prompt.is_empty() {
      messages.push(Message::system(&self.system_prompt));
    }
    messages.push(Message::user(message));

    ChatRequest {
      model: &self.model,
      messages,
      temperature: DEFAULT_TEMPERATURE,
      max_tokens: DEFAULT_MAX_TOKENS,
      response_format: ResponseFormat { kind: if want_json { "json_object" } else { "text" } },
    }
  }

  /// Performs one request.
  async fn request(&self, message: &str, want_json: bool) -> Result<String> {
    let api_key =
      self.api_key.as_deref().ok_or(MigratorError::MissingCredential(OPENAI_API_KEY))?;
    let request =
      self.http.post(&self.url).bearer_auth(api_key).json(&self.build_request(message, want_json));
    let response: ChatResponse = post_json(request).await?;
    Ok(
      response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default(),
    )
  }
}

#[async_trait]
impl Completion for OpenAiClient {
  async fn create_completion(&self, message: &str, want_json: bool) -> String {
    completion_or_empty("OpenAI", self.request(message, want_json).await)
  }
}
