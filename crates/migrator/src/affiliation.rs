//! Normalization of author affiliations in an exported authors file.
//!
//! The affiliation columns of `Autores.csv` are sent to the LLM in chunks; it answers with the
//! canonical institution name for each original spelling. Corrections are applied by exact match
//! on the original affiliation and the result is written next to the input as
//! `Autores_corrigido.csv`.

use csv::{ReaderBuilder, WriterBuilder};

use super::*;
use crate::{
  export::{AUTHORS_CSV, DELIMITER},
  format::lenient_string,
};

/// Rows sent to the provider per request.
pub const AFFILIATION_CHUNK_SIZE: usize = 20;

/// Output file name.
pub const CORRECTED_AUTHORS_CSV: &str = "Autores_corrigido.csv";

/// Column order of the corrected file.
pub const CORRECTED_AUTHOR_COLUMNS: [&str; 10] = [
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
];

/// One correction proposed by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AffiliationCorrection {
  /// Affiliation as written in the authors file
  #[serde(rename = "originalAuthorAffiliation", deserialize_with = "lenient_string")]
  pub original:       String,
  /// Corrected affiliation
  #[serde(rename = "authorAffiliation", deserialize_with = "lenient_string")]
  pub affiliation:    String,
  /// Corrected English affiliation; empty keeps the existing one
  #[serde(rename = "authorAffiliationEn", deserialize_with = "lenient_string")]
  pub affiliation_en: String,
}

/// Reads the corrections out of a provider answer.
///
/// Accepts an array of objects, an object with a `universidades` array or a single object.
/// Entries without an original affiliation are dropped.
pub fn corrections_from_value(value: Value) -> Vec<AffiliationCorrection> {
  let entries = match value {
    Value::Array(entries) => entries,
    Value::Object(mut map) => match map.remove("universidades") {
      Some(Value::Array(entries)) => entries,
      Some(other) => {
        map.insert("universidades".into(), other);
        vec![Value::Object(map)]
      },
      None => vec![Value::Object(map)],
    },
    _ => Vec::new(),
  };

  entries
    .into_iter()
    .filter_map(|entry| serde_json::from_value::<AffiliationCorrection>(entry).ok())
    .filter(|correction| !correction.original.is_empty())
    .collect()
}

/// A row of the authors file, keyed by column name.
type Row = HashMap<String, String>;

/// Applies LLM affiliation corrections to the authors file of a year.
#[derive(Clone)]
pub struct AffiliationCorrector {
  /// Provider bound to the affiliation-correction prompt
  provider: Arc<dyn Completion>,
  /// Directory holding `Autores.csv`
  csv_dir:  PathBuf,
}

impl AffiliationCorrector {
  /// A corrector for the authors file in `csv_dir`.
  pub fn new(provider: Arc<dyn Completion>, csv_dir: impl AsRef<Path>) -> Self {
    Self { provider, csv_dir: csv_dir.as_ref().to_path_buf() }
  }

  /// A corrector for the year's CSV directory, using the affiliation-correction provider.
  pub fn from_config(clients: &Clients, config: &Config) -> Self {
    Self::new(clients.affiliation_correction.clone(), config.csv_dir())
  }

  /// Corrects `Autores.csv` and writes `Autores_corrigido.csv`, returning its path.
  ///
  /// # Errors
  ///
  /// Fails when the authors file cannot be read or the output cannot be written. Unusable
  /// provider answers only mean fewer corrections.
  pub async fn correct(&self) -> Result<PathBuf> {
    let input = self.csv_dir.join(AUTHORS_CSV);
    info!("Correcting affiliations in {}", input.display());
    let mut rows: Vec<Row> = ReaderBuilder::new()
      .delimiter(DELIMITER)
      .from_path(&input)?
      .deserialize()
      .collect::<core::result::Result<_, _>>()?;

    let mut corrections: HashMap<String, AffiliationCorrection> = HashMap::new();
    let chunks = rows.len().div_ceil(AFFILIATION_CHUNK_SIZE);
    for (index, chunk) in rows.chunks(AFFILIATION_CHUNK_SIZE).enumerate() {
      info!("Correcting affiliation chunk {}/{chunks}", index + 1);
      let answer =
        ArticleExtractor::extract_info_with_ai(self.provider.as_ref(), &chunk_csv(chunk)?).await;
      for correction in corrections_from_value(answer) {
        corrections.entry(correction.original.clone()).or_insert(correction);
      }
    }

    let corrected = apply_corrections(&mut rows, &corrections);
    info!("Corrected {corrected} of {} author rows", rows.len());

    let output = self.csv_dir.join(CORRECTED_AUTHORS_CSV);
    write_corrected(&output, &rows)?;
    Ok(output)
  }
}

/// The affiliation columns of `rows` as CSV text.
fn chunk_csv(rows: &[Row]) -> Result<String> {
  let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_writer(Vec::new());
  writer.write_record(["authorAffiliation", "authorAffiliationEn"])?;
  for row in rows {
    writer.write_record([field(row, "authorAffiliation"), field(row, "authorAffiliationEn")])?;
  }
  let bytes = writer.into_inner().map_err(|e| MigratorError::Path(e.into_error()))?;
  Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The value of `column`, empty when absent.
fn field<'a>(row: &'a Row, column: &str) -> &'a str {
  row.get(column).map(String::as_str).unwrap_or_default()
}

/// Updates the rows that have a correction and returns how many did.
fn apply_corrections(
  rows: &mut [Row],
  corrections: &HashMap<String, AffiliationCorrection>,
) -> usize {
  let mut corrected = 0;
  for row in rows.iter_mut() {
    let Some(correction) = corrections.get(field(row, "authorAffiliation")) else { continue };
    let correction = correction.clone();
    if !correction.affiliation.is_empty() {
      row.insert("authorAffiliation".into(), correction.affiliation);
    }
    if !correction.affiliation_en.is_empty() {
      row.insert("authorAffiliationEn".into(), correction.affiliation_en);
    }
    corrected += 1;
  }
  corrected
}

/// Writes the rows in [`CORRECTED_AUTHOR_COLUMNS`] order, dropping duplicates.
fn write_corrected(path: &Path, rows: &[Row]) -> Result<()> {
  let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_path(path)?;
  writer.write_record(CORRECTED_AUTHOR_COLUMNS)?;
  let mut seen = HashSet::new();
  for row in rows {
    let record: Vec<&str> =
      CORRECTED_AUTHOR_COLUMNS.iter().map(|column| field(row, column)).collect();
    if seen.insert(record.clone()) {
      writer.write_record(&record)?;
    }
  }
  writer.flush()?;
  debug!("Wrote {}", path.display());
  Ok(())
}
