//! Timestamped JSON snapshots of pipeline state.
//!
//! Snapshots live in the year's `logs` directory. The pre-completion snapshot doubles as the
//! checkpoint the completion phase resumes from.

use serde::de::DeserializeOwned;

use super::*;

/// Merged articles before field completion.
pub const ARTICLES_BEFORE_COMPLETION: &str = "articles_before_field_completion";

/// Articles after field completion.
pub const ARTICLES_AFTER_COMPLETION: &str = "articles_after_field_completion";

/// Timestamp format of the snapshot wrapper.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads and writes named JSON snapshots in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  /// Directory holding the snapshot files
  dir: PathBuf,
}

impl SnapshotStore {
  /// A store rooted at `dir`. The directory is created on first write.
  pub fn new(dir: impl AsRef<Path>) -> Self { Self { dir: dir.as_ref().to_path_buf() } }

  /// A store in the year's `logs` directory.
  pub fn from_config(config: &Config) -> Self { Self::new(config.logs_dir()) }

  /// The file a snapshot name maps to; `.json` is appended when missing.
  pub fn path(&self, name: &str) -> PathBuf {
    if name.to_lowercase().ends_with(".json") {
      self.dir.join(name)
    } else {
      self.dir.join(format!("{name}.json"))
    }
  }

  /// Writes `data` as `{"timestamp": ..., "data": ...}`.
  ///
  /// Rewriting an existing snapshot keeps its original timestamp.
  pub fn write<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<PathBuf> {
    std::fs::create_dir_all(&self.dir)?;
    let path = self.path(name);
    let timestamp = existing_timestamp(&path)
      .unwrap_or_else(|| chrono::Local::now().format(TIMESTAMP_FORMAT).to_string());

    let mut wrapped = Map::new();
    wrapped.insert("timestamp".into(), Value::String(timestamp));
    wrapped.insert("data".into(), serde_json::to_value(data)?);
    std::fs::write(&path, serde_json::to_string_pretty(&wrapped)?)?;
    info!("Wrote snapshot {}", path.display());
    Ok(path)
  }

  /// Reads a snapshot, wrapped or bare.
  ///
  /// # Errors
  ///
  /// [`MigratorError::SnapshotNotFound`] when the file does not exist, or a JSON error when it
  /// does not hold a `T`.
  pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
    let path = self.path(name);
    if !path.exists() {
      return Err(MigratorError::SnapshotNotFound(path));
    }
    debug!("Reading snapshot {}", path.display());
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    Ok(serde_json::from_value(unwrap_snapshot(value))?)
  }

  /// Reads a snapshot holding a list of articles, checking that every element is an object.
  ///
  /// # Errors
  ///
  /// As [`SnapshotStore::read`], plus [`MigratorError::NotAnArticle`] for a non-object element.
  pub fn read_articles(&self, name: &str) -> Result<Vec<Article>> {
    self.read::<Vec<Value>>(name)?.into_iter().map(Article::from_value).collect()
  }
}

/// The payload of a wrapped snapshot, or the value itself when it is bare.
fn unwrap_snapshot(value: Value) -> Value {
  match value {
    Value::Object(mut map) if map.contains_key("timestamp") && map.contains_key("data") => {
      map.remove("data").unwrap_or(Value::Null)
    },
    other => other,
  }
}

/// Timestamp of the snapshot already at `path`, if any.
fn existing_timestamp(path: &Path) -> Option<String> {
  let content = std::fs::read_to_string(path).ok()?;
  let value: Value = serde_json::from_str(&content).ok()?;
  value.get("timestamp")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_write_wraps_with_timestamp() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("logs"));
    let path = store.write("articles", &json!([{"idJEMS": "1"}])).unwrap();
    assert_eq!(path, dir.path().join("logs").join("articles.json"));

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["data"], json!([{"idJEMS": "1"}]));
    let timestamp = written["timestamp"].as_str().unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok());
  }

  #[test]
  fn test_rewrite_keeps_timestamp() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    std::fs::write(
      store.path("state.json"),
      r#"{"timestamp": "2020-01-01 00:00:00", "data": []}"#,
    )
    .unwrap();

    store.write("state", &vec![1, 2]).unwrap();
    let written: Value =
      serde_json::from_str(&std::fs::read_to_string(store.path("state")).unwrap()).unwrap();
    assert_eq!(written, json!({"timestamp": "2020-01-01 00:00:00", "data": [1, 2]}));
  }

  #[test]
  fn test_read_round_trip_and_bare() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let articles = vec![Article { id_jems: "7".into(), num_pages: 4, ..Default::default() }];
    store.write(ARTICLES_BEFORE_COMPLETION, &articles).unwrap();
    assert_eq!(store.read::<Vec<Article>>(ARTICLES_BEFORE_COMPLETION).unwrap(), articles);

    std::fs::write(store.path("bare"), r#"[{"idJEMS": "8"}]"#).unwrap();
    let bare: Vec<Article> = store.read("bare").unwrap();
    assert_eq!(bare[0].id_jems, "8");
  }

  #[test]
  fn test_read_articles_rejects_non_objects() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    std::fs::write(store.path("mixed"), r#"{"timestamp": "t", "data": [{"idJEMS": "1"}, [2, 3]]}"#)
      .unwrap();
    assert!(matches!(store.read_articles("mixed"), Err(MigratorError::NotAnArticle(_))));

    std::fs::write(store.path("clean"), r#"[{"id_jems": "4", "numPages": "2"}]"#).unwrap();
    let articles = store.read_articles("clean").unwrap();
    assert_eq!(articles[0].id_jems, "4");
    assert_eq!(articles[0].num_pages, 2);
  }

  #[test]
  fn test_missing_snapshot() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let error = store.read::<Vec<Article>>(ARTICLES_AFTER_COMPLETION).unwrap_err();
    assert!(matches!(error, MigratorError::SnapshotNotFound(_)));
    assert_eq!(
      error.to_string(),
      format!("Snapshot not found at {}", store.path(ARTICLES_AFTER_COMPLETION).display())
    );
  }
}
