//! Article, author and reference records.
//!
//! [`Article`] is the one in-memory representation every stage of the pipeline works on. It is
//! produced from LLM output, from website stubs and from reloaded snapshots, always through the
//! same serde implementation, so the JSON wire names below are the contract with the prompts,
//! the snapshot files and the CSV headers.
//!
//! Deserialization is lenient (see [`format`](crate::format)): missing keys take their defaults,
//! `null` becomes empty, numbers are accepted for string fields and digit strings for counts.
//! Keys the schema does not know are dropped.
//!
//! # Examples
//!
//! ```
//! use migrator::article::{Article, Section};
//! use serde_json::json;
//!
//! let article = Article::from_value(json!({
//!   "idJEMS": "1234",
//!   "titleOrig": "Robótica educacional",
//!   "sectionAbbrev": "ART-C",
//!   "firstPage": 10,
//!   "keywordsOrig": ["robótica", "ensino"],
//! }))
//! .unwrap();
//!
//! assert_eq!(article.first_page, "10");
//! assert_eq!(article.section, Section::FullPaper);
//! assert_eq!(article.keywords_orig, "robótica; ensino");
//! ```

use serde::{Deserializer, Serializer};

use super::*;
use crate::format::{lenient_list, lenient_string, lenient_u32, split_name, FromLooseText};

/// Language code assigned to extracted articles unless configured otherwise.
pub const DEFAULT_LANGUAGE: &str = "pt";

/// Accepted alternative spellings of wire keys, as `(canonical, alias)`.
const FIELD_ALIASES: [(&str, &str); 3] =
  [("idJEMS", "id_jems"), ("sectionAbbrev", "section_abbrev"), ("numPages", "num_pages")];

/// How a JSON value reads in an error message.
fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

/// Proceedings section an article belongs to.
///
/// The three known codes have dedicated variants; anything else is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Section {
  /// Editorial (`EDT`). Editorials carry no bibliography and skip field completion.
  Editorial,
  /// Full paper (`ART-C`).
  FullPaper,
  /// Short paper (`ART-R`).
  ShortPaper,
  /// Any other code, including the empty one.
  Other(String),
}

impl Section {
  /// The section code as written in CSV and JSON.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Editorial => "EDT",
      Self::FullPaper => "ART-C",
      Self::ShortPaper => "ART-R",
      Self::Other(code) => code,
    }
  }

  /// Maps an OJS table-of-contents heading to a section.
  ///
  /// Headings mentioning `Editorial` are editorials, `Artigos Completos` are full papers and
  /// every other heading is a short-paper section.
  pub fn from_heading(heading: &str) -> Self {
    if heading.contains("Editorial") {
      Self::Editorial
    } else if heading.contains("Artigos Completos") {
      Self::FullPaper
    } else {
      Self::ShortPaper
    }
  }

  /// Whether no section code is known.
  pub fn is_empty(&self) -> bool { self.as_str().is_empty() }

  /// Whether this is the editorial section.
  pub fn is_editorial(&self) -> bool { matches!(self, Self::Editorial) }
}

impl Default for Section {
  fn default() -> Self { Self::Other(String::new()) }
}

impl From<&str> for Section {
  fn from(code: &str) -> Self {
    match code.trim() {
      "EDT" => Self::Editorial,
      "ART-C" => Self::FullPaper,
      "ART-R" => Self::ShortPaper,
      other => Self::Other(other.to_string()),
    }
  }
}

impl Display for Section {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl Serialize for Section {
  fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
  where S: Serializer {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for Section {
  fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
  where D: Deserializer<'de> {
    let code = lenient_string(deserializer)?;
    Ok(Section::from(code.as_str()))
  }
}

/// An author of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
  /// First name
  #[serde(rename = "authorFirstName", deserialize_with = "lenient_string")]
  pub first_name:     String,
  /// Middle names, space separated
  #[serde(rename = "authorMiddleName", deserialize_with = "lenient_string")]
  pub middle_name:    String,
  /// Last name
  #[serde(rename = "authorLastName", deserialize_with = "lenient_string")]
  pub last_name:      String,
  /// Affiliation in the article's language
  #[serde(rename = "authorAffiliation", deserialize_with = "lenient_string")]
  pub affiliation:    String,
  /// Affiliation in English
  #[serde(rename = "authorAffiliationEn", deserialize_with = "lenient_string")]
  pub affiliation_en: String,
  /// Country of the affiliation
  #[serde(rename = "authorCountry", deserialize_with = "lenient_string")]
  pub country:        String,
  /// Contact email
  #[serde(rename = "authorEmail", deserialize_with = "lenient_string")]
  pub email:          String,
  /// ORCID identifier
  #[serde(deserialize_with = "lenient_string")]
  pub orcid:          String,
  /// 1-based position in the author list
  #[serde(deserialize_with = "lenient_u32")]
  pub order:          u32,
}

impl Author {
  /// Builds an author from a full name, splitting it into first, middle and last parts.
  pub fn from_full_name(name: &str) -> Self {
    let (first_name, middle_name, last_name) = split_name(name);
    Self { first_name, middle_name, last_name, ..Default::default() }
  }

  /// The author's name with all its parts.
  pub fn full_name(&self) -> String {
    [&self.first_name, &self.middle_name, &self.last_name]
      .into_iter()
      .filter(|part| !part.is_empty())
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl FromLooseText for Author {
  fn from_loose_text(text: &str) -> Option<Self> {
    (!text.trim().is_empty()).then(|| Self::from_full_name(text))
  }
}

impl Display for Author {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.full_name())
  }
}

/// A bibliography entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
  /// Free-text citation
  #[serde(deserialize_with = "lenient_string")]
  pub description: String,
  /// DOI of the cited work
  #[serde(deserialize_with = "lenient_string")]
  pub doi:         String,
  /// Link to the cited work
  #[serde(deserialize_with = "lenient_string")]
  pub link:        String,
  /// Date the link was last accessed
  #[serde(deserialize_with = "lenient_string")]
  pub accessed:    String,
  /// 1-based position in the bibliography
  #[serde(deserialize_with = "lenient_u32")]
  pub order:       u32,
}

impl FromLooseText for Reference {
  fn from_loose_text(text: &str) -> Option<Self> {
    let description = text.trim();
    (!description.is_empty())
      .then(|| Self { description: description.to_string(), ..Default::default() })
  }
}

/// A proceedings article and everything known about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
  /// Identifier from the submission system, taken from the PDF filename. Join key between the
  /// website and the PDF.
  #[serde(rename = "idJEMS", alias = "id_jems", deserialize_with = "lenient_string")]
  pub id_jems: String,

  /// Title in the article's language
  #[serde(rename = "titleOrig", deserialize_with = "lenient_string")]
  pub title_orig: String,

  /// Title in English
  #[serde(rename = "titleEn", deserialize_with = "lenient_string")]
  pub title_en: String,

  /// Abstract in the article's language
  #[serde(rename = "abstractOrig", deserialize_with = "lenient_string")]
  pub abstract_orig: String,

  /// Abstract in English
  #[serde(rename = "abstractEn", deserialize_with = "lenient_string")]
  pub abstract_en: String,

  /// Keywords in the article's language, `"; "` separated
  #[serde(rename = "keywordsOrig", deserialize_with = "lenient_string")]
  pub keywords_orig: String,

  /// Keywords in English, `"; "` separated
  #[serde(rename = "keywordsEn", deserialize_with = "lenient_string")]
  pub keywords_en: String,

  /// Language code
  #[serde(deserialize_with = "lenient_string")]
  pub language: String,

  /// Proceedings section
  #[serde(rename = "sectionAbbrev", alias = "section_abbrev")]
  pub section: Section,

  /// First page as printed on the website. Usually numeric, but not always.
  #[serde(rename = "firstPage", deserialize_with = "lenient_string")]
  pub first_page: String,

  /// Page range, e.g. `10-19`
  #[serde(deserialize_with = "lenient_string")]
  pub pages: String,

  /// DOI assigned to the article
  #[serde(deserialize_with = "lenient_string")]
  pub doi: String,

  /// Number of pages in the PDF
  #[serde(rename = "numPages", alias = "num_pages", deserialize_with = "lenient_u32")]
  pub num_pages: u32,

  /// 1-based position on the website's table of contents
  #[serde(deserialize_with = "lenient_u32")]
  pub seq: u32,

  /// Cleaned text of the pages the header metadata was extracted from
  #[serde(rename = "firstPages", deserialize_with = "lenient_string")]
  pub first_pages: String,

  /// Cleaned text of the pages the references were extracted from
  #[serde(rename = "lastPages", deserialize_with = "lenient_string")]
  pub last_pages: String,

  /// Authors in order
  #[serde(deserialize_with = "lenient_list")]
  pub authors: Vec<Author>,

  /// References in order
  #[serde(deserialize_with = "lenient_list")]
  pub references: Vec<Reference>,
}

impl Default for Article {
  fn default() -> Self {
    Self {
      id_jems:       String::new(),
      title_orig:    String::new(),
      title_en:      String::new(),
      abstract_orig: String::new(),
      abstract_en:   String::new(),
      keywords_orig: String::new(),
      keywords_en:   String::new(),
      language:      DEFAULT_LANGUAGE.to_string(),
      section:       Section::default(),
      first_page:    String::new(),
      pages:         String::new(),
      doi:           String::new(),
      num_pages:     0,
      seq:           0,
      first_pages:   String::new(),
      last_pages:    String::new(),
      authors:       Vec::new(),
      references:    Vec::new(),
    }
  }
}

impl Article {
  /// Builds an article from a JSON value.
  ///
  /// # Errors
  ///
  /// [`MigratorError::NotAnArticle`] when the value is not a JSON object; individual fields never
  /// fail. When a key is present under both its canonical name and an alias, the canonical one
  /// wins.
  pub fn from_value(value: Value) -> Result<Self> {
    let mut map = match value {
      Value::Object(map) => map,
      other => return Err(MigratorError::NotAnArticle(value_kind(&other).to_string())),
    };
    for (canonical, alias) in FIELD_ALIASES {
      if map.contains_key(canonical) {
        map.remove(alias);
      }
    }
    Ok(serde_json::from_value(Value::Object(map))?)
  }

  /// Serializes the article into its wire-format JSON object.
  pub fn to_value(&self) -> Value {
    // Serializing plain strings and integers into a `Value` cannot fail.
    serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
  }

  /// Wire names of the fields that are still empty.
  ///
  /// Strings count as empty when blank, lists when they have no elements and `numPages` when it
  /// is zero. `seq` is a position rather than a count, so zero is a present value. The raw page
  /// texts and the reference list are never reported.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    let text_fields: [(&'static str, &str); 12] = [
      ("idJEMS", self.id_jems.as_str()),
      ("titleOrig", self.title_orig.as_str()),
      ("titleEn", self.title_en.as_str()),
      ("abstractOrig", self.abstract_orig.as_str()),
      ("abstractEn", self.abstract_en.as_str()),
      ("keywordsOrig", self.keywords_orig.as_str()),
      ("keywordsEn", self.keywords_en.as_str()),
      ("language", self.language.as_str()),
      ("sectionAbbrev", self.section.as_str()),
      ("firstPage", self.first_page.as_str()),
      ("pages", self.pages.as_str()),
      ("doi", self.doi.as_str()),
    ];

    let mut missing: Vec<&'static str> = text_fields
      .into_iter()
      .filter(|(_, value)| value.trim().is_empty())
      .map(|(key, _)| key)
      .collect();
    if self.num_pages == 0 {
      missing.push("numPages");
    }
    if self.authors.is_empty() {
      missing.push("authors");
    }
    missing
  }

  /// Whether any completable field is still empty.
  pub fn has_missing_fields(&self) -> bool { !self.missing_fields().is_empty() }

  /// Whether the article has a title in either language.
  pub fn has_title(&self) -> bool {
    !self.title_orig.trim().is_empty() || !self.title_en.trim().is_empty()
  }

  /// The JSON sent for field completion: the full record without the raw page texts.
  pub fn completion_payload(&self) -> Value {
    let mut value = self.to_value();
    if let Value::Object(map) = &mut value {
      map.remove("firstPages");
      map.remove("lastPages");
    }
    value
  }

  /// Copies every field of `other` that is empty here, leaving present fields untouched.
  pub fn fill_missing_from(&mut self, other: &Article) {
    fn fill(target: &mut String, source: &str) {
      if target.trim().is_empty() && !source.trim().is_empty() {
        *target = source.to_string();
      }
    }

    fill(&mut self.id_jems, &other.id_jems);
    fill(&mut self.title_orig, &other.title_orig);
    fill(&mut self.title_en, &other.title_en);
    fill(&mut self.abstract_orig, &other.abstract_orig);
    fill(&mut self.abstract_en, &other.abstract_en);
    fill(&mut self.keywords_orig, &other.keywords_orig);
    fill(&mut self.keywords_en, &other.keywords_en);
    fill(&mut self.language, &other.language);
    fill(&mut self.first_page, &other.first_page);
    fill(&mut self.pages, &other.pages);
    fill(&mut self.doi, &other.doi);
    if self.section.is_empty() {
      self.section = other.section.clone();
    }
    if self.num_pages == 0 {
      self.num_pages = other.num_pages;
    }
    if self.authors.is_empty() {
      self.authors = other.authors.clone();
    }
  }
}
