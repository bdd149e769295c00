//! Client for a locally running Ollama server.
//!
//! [`LlamaRequest`] is a builder over the `/api/chat` endpoint; [`OllamaClient`] wraps it into a
//! [`Completion`] provider bound to one system prompt, which lets a whole migration run against a
//! local model without API keys.
//!
//! # Examples
//!
//! ```no_run
//! use migrator::llm::ollama::{LlamaRequest, OllamaEndpoint};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = LlamaRequest::new()
//!   .with_host("http://localhost:11434")
//!   .with_endpoint(OllamaEndpoint::Chat)
//!   .with_model("llama3.2:3b")
//!   .with_message("Extract the title of this article: ...");
//!
//! let response = request.send().await?;
//! println!("Response: {}", response.message.content);
//! # Ok(())
//! # }
//! ```

use url::Url;

use super::*;

/// Host used when none is configured.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Model used when none is configured.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

/// Ollama API endpoints used by the migrator.
#[derive(Debug, Clone, Copy)]
pub enum OllamaEndpoint {
  /// Chat completion endpoint for conversation-style interactions
  Chat,
  /// Raw text generation endpoint
  Generate,
}

impl OllamaEndpoint {
  /// Converts the endpoint variant to its URL path string.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Chat => "/api/chat",
      Self::Generate => "/api/generate",
    }
  }
}

/// Request builder for Ollama chat interactions.
#[derive(Debug, Clone, Serialize, Default)]
pub struct LlamaRequest {
  /// Model name, e.g. `llama3.2:3b`. Required before sending.
  pub model: Option<String>,

  /// Conversation messages in order. At least one is required before sending.
  pub messages: Vec<Message>,

  /// Token streaming; always off.
  pub stream: bool,

  /// `"json"` to constrain the reply to JSON.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub format: Option<String>,

  /// Generation parameters.
  pub options: Options,

  /// Target URL. Defaults to the local chat endpoint with a warning.
  #[serde(skip)]
  pub url: Option<Url>,
}

/// Configuration options for LLM inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
  /// Maximum number of tokens to generate
  num_predict: u32,
  /// Temperature for controlling randomness in generation
  temperature: f64,
}

impl Default for Options {
  fn default() -> Self {
    Self { num_predict: DEFAULT_MAX_TOKENS, temperature: DEFAULT_TEMPERATURE }
  }
}

/// Response structure from Ollama chat requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct LlamaResponse {
  /// Name of the model used
  #[serde(default)]
  pub model:       String,
  /// Generated message content
  pub message:     Message,
  /// Reason for completion
  #[serde(default)]
  pub done_reason: String,
  /// Whether generation is complete
  #[serde(default)]
  pub done:        bool,
  /// Number of generated tokens
  #[serde(default)]
  pub eval_count:  u64,
}

impl LlamaRequest {
  /// Creates a new request with builder-style API with default settings.
  pub fn new() -> Self { Self::default() }

  /// Sets the host URL for the request.
  pub fn with_host(mut self, host: &str) -> Self {
    self.url = Url::parse(host).ok();
    if self.url.is_none() {
      warn!("Invalid Ollama host {host}, the request will use localhost");
    }
    self
  }

  /// Sets the API endpoint for the request. Only the chat endpoint is fully supported.
  pub fn with_endpoint(mut self, endpoint: OllamaEndpoint) -> Self {
    if !matches!(endpoint, OllamaEndpoint::Chat) {
      warn!("Endpoint {:?} is not fully supported yet", endpoint);
    }

    let base = match self.url.take() {
      Some(base) => base,
      None => {
        warn!("No host set, using localhost");
        match Url::parse(DEFAULT_OLLAMA_HOST) {
          Ok(url) => url,
          Err(_) => return self,
        }
      },
    };

    match base.join(endpoint.as_str()) {
      Ok(url) => self.url = Some(url),
      Err(e) => warn!("Failed to set endpoint: {e}"),
    }
    self
  }

  /// Sets the model to use for the request.
  pub fn with_model(mut self, model: &str) -> Self {
    self.model.replace(model.to_string());
    self
  }

  /// Adds a system message; blank prompts are skipped.
  pub fn with_system(mut self, prompt: &str) -> Self {
    if !prompt.is_empty() {
      self.messages.push(Message::system(prompt));
    }
    self
  }

  /// Adds a user message to the conversation.
  pub fn with_message(mut self, content: &str) -> Self {
    self.messages.push(Message::user(content));
    self
  }

  /// Constrains the reply to JSON.
  pub fn with_json_format(mut self) -> Self {
    self.format = Some("json".to_string());
    self
  }

  /// Sends the request to the Ollama service.
  ///
  /// # Errors
  ///
  /// Fails when no model or message is set, the network request fails, the server answers with a
  /// non-success status or the response cannot be parsed.
  pub async fn send(&self) -> Result<LlamaResponse> {
    self.send_with(&reqwest::Client::new()).await
  }

  /// Like [`send`](Self::send), reusing an HTTP client.
  pub async fn send_with(&self, http: &reqwest::Client) -> Result<LlamaResponse> {
    let url = match &self.url {
      Some(url) => url.clone(),
      None => {
        warn!("No URL set, using localhost/chat");
        Url::parse(DEFAULT_OLLAMA_HOST)?.join(OllamaEndpoint::Chat.as_str())?
      },
    };

    if self.model.is_none() {
      return Err(MigratorError::Config("Ollama request has no model".into()));
    }

    if self.messages.is_empty() {
      return Err(MigratorError::Config("Ollama request has no messages".into()));
    }

    post_json(http.post(url).json(&self)).await
  }
}

/// Provider backed by a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
  /// Shared HTTP client
  http:          reqwest::Client,
  /// Chat endpoint URL
  url:           Url,
  /// Model name
  model:         String,
  /// System prompt of the bound purpose
  system_prompt: String,
}

impl OllamaClient {
  /// Creates a client for `model` on `host`.
  ///
  /// # Errors
  ///
  /// Fails when `host` is not a valid URL.
  pub fn new(host: &str, model: &str) -> Result<Self> {
    let url = Url::parse(host)?.join(OllamaEndpoint::Chat.as_str())?;
    Ok(Self {
      http: reqwest::Client::new(),
      url,
      model: model.to_string(),
      system_prompt: String::new(),
    })
  }

  /// Reuses an existing HTTP client.
  pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
    self.http = http;
    self
  }

  /// Sets the system prompt sent with every request.
  pub fn with_system_prompt(mut self, prompt: &str) -> Self {
    self.system_prompt = prompt.to_string();
    self
  }

  /// Builds the chat request for one completion.
  fn build_request(&self, message: &str, want_json: bool) -> LlamaRequest {
    let mut request = LlamaRequest::new()
      .with_model(&self.model)
      .with_system(&self.system_prompt)
      .with_message(message);
    request.url = Some(self.url.clone());
    if want_json {
      request = request.with_json_format();
    }
    request
  }
}

#[async_trait]
impl Completion for OllamaClient {
  async fn create_completion(&self, message: &str, want_json: bool) -> String {
    let result = self
      .build_request(message, want_json)
      .send_with(&self.http)
      .await
      .map(|response| response.message.content);
    completion_or_empty("Ollama", result)
  }
}
