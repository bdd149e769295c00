//! Run configuration and system prompts.
//!
//! A run is described by one JSON or TOML file naming the proceedings site, the output location
//! and the LLM backend. System prompts live in a separate YAML file keyed by
//! [`Purpose::prompt_key`].
//!
//! ```json
//! {
//!   "site_url": "https://sol.sbc.org.br/index.php/sbie/issue/view/1234",
//!   "output_dir": "output",
//!   "year": 2023,
//!   "doi_prefix": "10.5753/sbie.",
//!   "files_to_download": -1,
//!   "prompts_file": "config/prompts.yaml",
//!   "headers_file": "config/headers.json",
//!   "provider": "openai",
//!   "openai_model": "gpt-4o"
//! }
//! ```

use super::*;
use crate::{
  format::lenient_string,
  llm::{
    anthropic::DEFAULT_ANTHROPIC_MODEL,
    ollama::{DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL},
    openai::DEFAULT_OPENAI_MODEL,
  },
};

/// LLM backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Provider {
  /// OpenAI chat completions
  #[default]
  OpenAi,
  /// Anthropic messages
  Anthropic,
  /// Local Ollama server
  Ollama,
}

impl FromStr for Provider {
  type Err = MigratorError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "openai" => Ok(Self::OpenAi),
      "anthropic" => Ok(Self::Anthropic),
      "ollama" => Ok(Self::Ollama),
      _ => Err(MigratorError::UnknownProvider(s.to_string())),
    }
  }
}

impl TryFrom<String> for Provider {
  type Error = MigratorError;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<Provider> for String {
  fn from(provider: Provider) -> Self { provider.to_string() }
}

impl Display for Provider {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Provider::OpenAi => write!(f, "openai"),
      Provider::Anthropic => write!(f, "anthropic"),
      Provider::Ollama => write!(f, "ollama"),
    }
  }
}

/// How a field-completion answer is applied to an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompletionStrategy {
  /// The answer replaces the whole record.
  #[default]
  Replace,
  /// Only fields that were empty are taken from the answer.
  Merge,
}

impl FromStr for CompletionStrategy {
  type Err = MigratorError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "replace" => Ok(Self::Replace),
      "merge" => Ok(Self::Merge),
      _ => Err(MigratorError::UnknownStrategy(s.to_string())),
    }
  }
}

impl TryFrom<String> for CompletionStrategy {
  type Error = MigratorError;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<CompletionStrategy> for String {
  fn from(strategy: CompletionStrategy) -> Self {
    match strategy {
      CompletionStrategy::Replace => "replace".to_string(),
      CompletionStrategy::Merge => "merge".to_string(),
    }
  }
}

/// Settings for migrating one proceedings year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Table-of-contents page of the proceedings issue
  pub site_url: String,

  /// Root of all outputs; each year gets `{output_dir}/{year}/{pdfs,csv,logs}`
  pub output_dir: PathBuf,

  /// Proceedings year, also part of generated DOIs
  #[serde(deserialize_with = "lenient_string")]
  pub year: String,

  /// DOI prefix; DOIs are `{doi_prefix}{year}.{first_page}`
  pub doi_prefix: String,

  /// Pages whose text is extracted at each end of a PDF; `0` extracts every page
  pub pages_to_process: u32,

  /// How many PDFs and website entries to process; negative means all
  pub files_to_download: i64,

  /// YAML file mapping purposes to system prompts
  pub prompts_file: Option<PathBuf>,

  /// JSON file with the CSV header sets; built-in headers are used when absent
  pub headers_file: Option<PathBuf>,

  /// LLM backend
  pub provider: Provider,

  /// OpenAI model name
  #[serde(alias = "engine")]
  pub openai_model: String,

  /// Anthropic model name
  pub anthropic_model: String,

  /// Base URL of the Ollama server
  pub ollama_host: String,

  /// Ollama model name
  pub ollama_model: String,

  /// Articles processed at once during extraction and completion
  pub concurrency: usize,

  /// How field-completion answers are applied
  pub completion_strategy: CompletionStrategy,

  /// Language code stamped on extracted articles
  pub language: String,

  /// Words marking a page that already reached the introduction
  pub introduction_markers: Vec<String>,

  /// Words marking a page that contains the references section
  pub reference_markers: Vec<String>,
}

impl Default for Config {
  fn default() -> Self {
    let markers = PageMarkers::default();
    Self {
      site_url:             String::new(),
      output_dir:           PathBuf::new(),
      year:                 String::new(),
      doi_prefix:           String::new(),
      pages_to_process:     11,
      files_to_download:    -1,
      prompts_file:         None,
      headers_file:         None,
      provider:             Provider::default(),
      openai_model:         DEFAULT_OPENAI_MODEL.to_string(),
      anthropic_model:      DEFAULT_ANTHROPIC_MODEL.to_string(),
      ollama_host:          DEFAULT_OLLAMA_HOST.to_string(),
      ollama_model:         DEFAULT_OLLAMA_MODEL.to_string(),
      concurrency:          1,
      completion_strategy:  CompletionStrategy::default(),
      language:             DEFAULT_LANGUAGE.to_string(),
      introduction_markers: markers.introduction,
      reference_markers:    markers.references,
    }
  }
}

impl Config {
  /// A configuration with the required keys set and defaults everywhere else.
  pub fn for_site(
    site_url: &str,
    output_dir: impl AsRef<Path>,
    year: &str,
    doi_prefix: &str,
  ) -> Self {
    Self {
      site_url: site_url.to_string(),
      output_dir: output_dir.as_ref().to_path_buf(),
      year: year.to_string(),
      doi_prefix: doi_prefix.to_string(),
      ..Default::default()
    }
  }

  /// Loads and validates a configuration file.
  ///
  /// The format follows the extension: `.json` or `.toml`.
  ///
  /// # Errors
  ///
  /// - [`MigratorError::UnsupportedConfigFormat`] for any other extension, before the file is read
  /// - [`MigratorError::Path`] when the file cannot be read
  /// - [`MigratorError::Json`] or [`MigratorError::TomlDe`] when it cannot be parsed, including
  ///   unknown provider or strategy names
  /// - [`MigratorError::MissingConfigKey`] when a required key is absent or blank
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let extension =
      path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_lowercase();
    let parse: fn(&str) -> Result<Config> = match extension.as_str() {
      "json" => Self::from_json_str,
      "toml" => Self::from_toml_str,
      _ => return Err(MigratorError::UnsupportedConfigFormat(extension)),
    };

    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let config = parse(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Parses a JSON configuration without validating it.
  pub fn from_json_str(content: &str) -> Result<Self> { Ok(serde_json::from_str(content)?) }

  /// Parses a TOML configuration without validating it.
  pub fn from_toml_str(content: &str) -> Result<Self> { Ok(toml::from_str(content)?) }

  /// Checks that every required key is present.
  pub fn validate(&self) -> Result<()> {
    let required: [(&'static str, bool); 4] = [
      ("site_url", self.site_url.trim().is_empty()),
      ("output_dir", self.output_dir.as_os_str().is_empty()),
      ("year", self.year.trim().is_empty()),
      ("doi_prefix", self.doi_prefix.trim().is_empty()),
    ];
    match required.into_iter().find(|(_, missing)| *missing) {
      Some((key, _)) => Err(MigratorError::MissingConfigKey(key)),
      None => Ok(()),
    }
  }

  /// `{output_dir}/{year}`
  pub fn year_dir(&self) -> PathBuf { self.output_dir.join(&self.year) }

  /// Where downloaded PDFs are stored.
  pub fn pdf_dir(&self) -> PathBuf { self.year_dir().join("pdfs") }

  /// Where CSV exports are written.
  pub fn csv_dir(&self) -> PathBuf { self.year_dir().join("csv") }

  /// Where snapshots and log files are written.
  pub fn logs_dir(&self) -> PathBuf { self.year_dir().join("logs") }

  /// The number of files to process, or `None` for all of them.
  pub fn file_limit(&self) -> Option<usize> { usize::try_from(self.files_to_download).ok() }

  /// The page-selection markers.
  pub fn markers(&self) -> PageMarkers {
    PageMarkers {
      introduction: self.introduction_markers.clone(),
      references:   self.reference_markers.clone(),
    }
  }

  /// Concurrency, never below one.
  pub fn concurrency(&self) -> usize { self.concurrency.max(1) }
}

/// System prompts keyed by purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompts(HashMap<String, String>);

impl Prompts {
  /// Loads prompts from a YAML file.
  ///
  /// # Errors
  ///
  /// Fails when the file cannot be read or is not a YAML map of strings.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!("Loading prompts from {}", path.display());
    Self::from_yaml_str(&std::fs::read_to_string(path)?)
  }

  /// Parses prompts from YAML text. An empty document yields no prompts.
  pub fn from_yaml_str(content: &str) -> Result<Self> {
    if content.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(Self(serde_yaml::from_str(content)?))
  }

  /// The system prompt for `purpose`, or an empty prompt with a warning when it is missing.
  pub fn get(&self, purpose: Purpose) -> String {
    match self.0.get(purpose.prompt_key()) {
      Some(prompt) => prompt.clone(),
      None => {
        warn!("Prompt '{}' not found in the prompts file", purpose.prompt_key());
        String::new()
      },
    }
  }
}
