//! API keys and provider overrides from the environment.
//!
//! A `.env` file in the working directory is loaded first when present; variables already set in
//! the process environment take precedence over it.

use super::*;

/// Variable holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Variable holding the Anthropic API key.
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Variable that switches between OpenAI (`true`) and Anthropic (anything else).
pub const USE_OPENAI: &str = "USE_OPENAI";

/// Secrets and overrides read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
  /// OpenAI API key
  pub openai_api_key:    Option<String>,
  /// Anthropic API key
  pub anthropic_api_key: Option<String>,
  /// Value of `USE_OPENAI`, when set
  pub use_openai:        Option<bool>,
}

impl Credentials {
  /// Loads `.env` if present and reads the variables.
  pub fn from_env() -> Self {
    match dotenvy::dotenv() {
      Ok(path) => debug!("Loaded environment from {}", path.display()),
      Err(e) => trace!("No .env file loaded: {e}"),
    }
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Reads the variables through `lookup`. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    Self {
      openai_api_key:    read(OPENAI_API_KEY),
      anthropic_api_key: read(ANTHROPIC_API_KEY),
      use_openai:        read(USE_OPENAI).map(|v| v.eq_ignore_ascii_case("true")),
    }
  }

  /// The backend to use: `configured`, unless `USE_OPENAI` picks OpenAI or Anthropic.
  pub fn resolve_provider(&self, configured: Provider) -> Provider {
    match self.use_openai {
      Some(true) => Provider::OpenAi,
      Some(false) => Provider::Anthropic,
      None => configured,
    }
  }
}
