//! Semicolon-delimited CSV export of articles, authors and references.
//!
//! Columns are chosen by header name from each record's wire-format JSON, so the header sets in
//! `headers.json` decide what is exported and in which order. Unknown columns are written empty.

use csv::WriterBuilder;

use super::*;
use crate::format::value_to_text;

/// Articles file name.
pub const ARTICLES_CSV: &str = "Artigos.csv";

/// Authors file name.
pub const AUTHORS_CSV: &str = "Autores.csv";

/// References file name.
pub const REFERENCES_CSV: &str = "Referencias.csv";

/// Prefix of the files written before field completion.
pub const PRE_COMPLETION_PREFIX: &str = "antes_";

/// Column delimiter of every CSV file.
pub const DELIMITER: u8 = b';';

/// Header sets of the three CSV files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvHeaders {
  /// Columns of the articles file
  #[serde(rename = "headers_artigos")]
  pub articles:   Vec<String>,
  /// Columns of the authors file
  #[serde(rename = "headers_autores")]
  pub authors:    Vec<String>,
  /// Columns of the references file
  #[serde(rename = "headers_references")]
  pub references: Vec<String>,
}

impl Default for CsvHeaders {
  fn default() -> Self {
    let owned = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
    Self {
      articles:   owned(&[
        "seq",
        "idJEMS",
        "language",
        "sectionAbbrev",
        "titleOrig",
        "titleEn",
        "abstractOrig",
        "abstractEn",
        "keywordsOrig",
        "keywordsEn",
        "firstPage",
        "pages",
        "numPages",
        "doi",
      ]),
      authors:    owned(&[
        "article",
        "authorFirstName",
        "authorMiddleName",
        "authorLastName",
        "authorAffiliation",
        "authorAffiliationEn",
        "authorCountry",
        "authorEmail",
        "orcid",
        "order",
      ]),
      references: owned(&["article", "description", "doi", "link", "accessed", "order"]),
    }
  }
}

impl CsvHeaders {
  /// Loads header sets from a JSON file with `headers_artigos`, `headers_autores` and
  /// `headers_references` arrays.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!("Loading CSV headers from {}", path.display());
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
  }

  /// The configured headers file, or the built-in headers when none is set.
  pub fn from_config(config: &Config) -> Result<Self> {
    match &config.headers_file {
      Some(path) => Self::from_path(path),
      None => {
        debug!("No headers_file configured, using built-in CSV headers");
        Ok(Self::default())
      },
    }
  }
}

/// Paths written by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPaths {
  /// Articles file
  pub articles:   PathBuf,
  /// Authors file
  pub authors:    PathBuf,
  /// References file
  pub references: PathBuf,
}

/// Writes the three CSV files of an article list.
#[derive(Debug, Clone)]
pub struct CsvWriter {
  /// Output directory
  dir:     PathBuf,
  /// Column sets
  headers: CsvHeaders,
  /// File name prefix
  prefix:  String,
}

impl CsvWriter {
  /// A writer into `dir` with the given header sets.
  pub fn new(dir: impl AsRef<Path>, headers: CsvHeaders) -> Self {
    Self { dir: dir.as_ref().to_path_buf(), headers, prefix: String::new() }
  }

  /// Prefixes the file names with [`PRE_COMPLETION_PREFIX`].
  pub fn pre_completion(mut self) -> Self {
    self.prefix = PRE_COMPLETION_PREFIX.to_string();
    self
  }

  /// Path of `file_name` with the prefix applied.
  fn path(&self, file_name: &str) -> PathBuf {
    self.dir.join(format!("{}{file_name}", self.prefix))
  }

  /// Writes articles, authors and references.
  ///
  /// Article rows get `seq` set to their 1-based position. Author and reference rows get
  /// `article` set to the owning article's position and `order` to their own position.
  pub fn write(&self, articles: &[Article]) -> Result<CsvPaths> {
    std::fs::create_dir_all(&self.dir)?;

    let article_rows = articles.iter().zip(1u32..).map(|(article, seq)| {
      let mut fields = as_object(article.to_value());
      fields.insert("seq".into(), Value::from(seq));
      fields
    });
    let paths = CsvPaths {
      articles:   self.write_file(ARTICLES_CSV, &self.headers.articles, article_rows)?,
      authors:    self.write_file(
        AUTHORS_CSV,
        &self.headers.authors,
        item_rows(articles, |article| &article.authors),
      )?,
      references: self.write_file(
        REFERENCES_CSV,
        &self.headers.references,
        item_rows(articles, |article| &article.references),
      )?,
    };
    info!("Wrote CSV files for {} articles to {}", articles.len(), self.dir.display());
    Ok(paths)
  }

  /// Writes one file with `headers` as columns.
  fn write_file(
    &self,
    file_name: &str,
    headers: &[String],
    rows: impl Iterator<Item = Map<String, Value>>,
  ) -> Result<PathBuf> {
    let path = self.path(file_name);
    let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_path(&path)?;
    writer.write_record(headers)?;
    for row in rows {
      writer.write_record(
        headers.iter().map(|header| row.get(header).map(value_to_text).unwrap_or_default()),
      )?;
    }
    writer.flush()?;
    trace!("Wrote {}", path.display());
    Ok(path)
  }
}

/// Rows of the items selected by `items`, numbered by article and by position.
fn item_rows<'a, T: Serialize + 'a>(
  articles: &'a [Article],
  items: impl Fn(&'a Article) -> &'a Vec<T> + 'a,
) -> impl Iterator<Item = Map<String, Value>> + 'a {
  articles.iter().zip(1u32..).flat_map(move |(article, seq)| {
    items(article).iter().zip(1u32..).map(move |(item, order)| {
      let mut fields = as_object(serde_json::to_value(item).unwrap_or(Value::Null));
      fields.insert("article".into(), Value::from(seq));
      fields.insert("order".into(), Value::from(order));
      fields
    })
  })
}

/// The map of a JSON object; anything else gives an empty map.
fn as_object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    _ => Map::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Vec<Article> {
    let author = |first: &str, order: u32| Author {
      first_name: first.into(),
      last_name: "Lima".into(),
      order,
      ..Default::default()
    };
    vec![
      Article {
        id_jems: "100".into(),
        seq: 9,
        title_orig: "Primeiro; com ponto e vírgula".into(),
        authors: vec![author("Ana", 7), author("Rui", 0)],
        references: vec![Reference { description: "Ref".into(), ..Default::default() }],
        ..Default::default()
      },
      Article { id_jems: "200".into(), num_pages: 5, ..Default::default() },
    ]
  }

  fn read(path: &Path) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
      .delimiter(DELIMITER)
      .has_headers(false)
      .from_path(path)
      .unwrap()
      .records()
      .map(|record| record.unwrap().iter().map(String::from).collect())
      .collect()
  }

  #[test]
  fn test_write_layout() {
    let dir = tempdir().unwrap();
    let headers = CsvHeaders {
      articles:   vec!["seq".into(), "idJEMS".into(), "titleOrig".into(), "numPages".into()],
      authors:    vec!["article".into(), "order".into(), "authorFirstName".into()],
      references: vec!["article".into(), "order".into(), "description".into(), "extra".into()],
    };
    let paths = CsvWriter::new(dir.path(), headers).write(&sample()).unwrap();
    assert_eq!(paths.articles, dir.path().join("Artigos.csv"));

    assert_eq!(read(&paths.articles), vec![
      vec!["seq", "idJEMS", "titleOrig", "numPages"],
      vec!["1", "100", "Primeiro; com ponto e vírgula", "0"],
      vec!["2", "200", "", "5"],
    ]);
    assert_eq!(read(&paths.authors), vec![
      vec!["article", "order", "authorFirstName"],
      vec!["1", "1", "Ana"],
      vec!["1", "2", "Rui"],
    ]);
    assert_eq!(read(&paths.references), vec![
      vec!["article", "order", "description", "extra"],
      vec!["1", "1", "Ref", ""],
    ]);
  }

  #[test]
  fn test_pre_completion_prefix() {
    let dir = tempdir().unwrap();
    let paths =
      CsvWriter::new(dir.path(), CsvHeaders::default()).pre_completion().write(&sample()).unwrap();
    assert_eq!(paths.authors, dir.path().join("antes_Autores.csv"));
    assert!(dir.path().join("antes_Referencias.csv").exists());
  }

  #[test]
  fn test_headers_from_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("headers.json");
    std::fs::write(
      &path,
      r#"{"headers_artigos": ["seq"], "headers_autores": ["article"], "headers_references": []}"#,
    )
    .unwrap();
    let headers = CsvHeaders::from_path(&path).unwrap();
    assert_eq!(headers.articles, vec!["seq"]);
    assert!(headers.references.is_empty());

    std::fs::write(&path, r#"{"headers_artigos": ["seq"]}"#).unwrap();
    assert!(matches!(CsvHeaders::from_path(&path), Err(MigratorError::Json(_))));
  }
}
