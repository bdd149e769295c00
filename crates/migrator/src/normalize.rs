//! Cleaning of PDF-extracted text.
//!
//! Text pulled out of LaTeX-generated PDFs often carries detached diacritics (`c¸˜ao` for `ção`).
//! Those are detected by signature and handed to the text-processing LLM for repair; everything
//! else only gets whitespace and control characters normalised.

use super::*;

/// Glyph sequences left behind when accents are extracted as separate characters.
pub const ENCODING_ERROR_PATTERNS: [&str; 10] =
  ["´ı", "c¸˜a", "´o", "´e", "˜a", "˜o", "¸c", "´a", "´i", "´u"];

lazy_static! {
  static ref ENCODING_ERRORS: Regex = Regex::new(
    &ENCODING_ERROR_PATTERNS.iter().map(|p| regex::escape(p)).collect::<Vec<_>>().join("|")
  )
  .unwrap();
  static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
  static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x1F\x7F]").unwrap();
}

/// Whether the text shows any of the [`ENCODING_ERROR_PATTERNS`].
pub fn has_encoding_errors(text: &str) -> bool { ENCODING_ERRORS.is_match(text) }

/// Collapses whitespace runs, strips ASCII control characters and trims.
pub fn basic_cleaning(text: &str) -> String {
  let collapsed = WHITESPACE.replace_all(text, " ");
  CONTROL_CHARS.replace_all(&collapsed, "").trim().to_string()
}

/// Builds the repair instruction sent to the text-processing provider.
fn repair_instruction(text: &str) -> String {
  format!(
    "Correct the following text with encoding errors.\nMaintain the original meaning, but fix \
     words that have encoding errors.\n\nTEXT WITH ERROR:\n{text}"
  )
}

/// Cleans extracted text, repairing encoding damage through an optional LLM provider.
#[derive(Clone, Default)]
pub struct TextNormalizer {
  /// Provider bound to the text-processing prompt
  repairer: Option<Arc<dyn Completion>>,
}

impl TextNormalizer {
  /// Creates a normalizer that only performs basic cleaning.
  pub fn new() -> Self { Self::default() }

  /// Sets the provider used to repair encoding damage.
  pub fn with_repairer(mut self, repairer: Arc<dyn Completion>) -> Self {
    self.repairer = Some(repairer);
    self
  }

  /// Cleans `text`.
  ///
  /// Empty input returns immediately without a provider call. Text with encoding damage is sent
  /// to the repair provider as plain text; the answer is basic-cleaned as well. When there is no
  /// provider or it answers with nothing, basic cleaning is applied to the original text.
  pub async fn clean(&self, text: &str) -> String {
    if text.is_empty() {
      return String::new();
    }

    if has_encoding_errors(text) {
      match &self.repairer {
        Some(repairer) => {
          debug!("Encoding damage detected, requesting repair of {} chars", text.len());
          let repaired = repairer.create_completion(&repair_instruction(text), false).await;
          if !repaired.trim().is_empty() {
            return basic_cleaning(&repaired);
          }
          warn!("Text repair returned nothing, falling back to basic cleaning");
        },
        None => trace!("Encoding damage detected but no repair provider is configured"),
      }
    }

    basic_cleaning(text)
  }
}
