//! Lenient value handling for records that come from LLM output or scraped HTML.
//!
//! Neither source guarantees types: a first page may arrive as `10` or `"10"`, keywords as a list
//! or a string, a reference as an object or a bare line of text. The deserializers here accept all
//! of those and normalise them into the canonical record types, so the rest of the crate only ever
//! sees one representation.

use serde::{de::DeserializeOwned, Deserializer};

use super::*;

/// Types that can be built from a single loose line of text.
///
/// LLMs occasionally return `["Jane Doe", ...]` where a list of objects was requested.
pub trait FromLooseText: Sized {
  /// Builds a value from free text, or `None` when the text is blank.
  fn from_loose_text(text: &str) -> Option<Self>;
}

/// Renders a JSON value as the text stored in a string field.
///
/// `null` becomes empty, scalars are printed, and arrays are joined with `"; "`.
pub fn value_to_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.trim().to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::Array(items) => items
      .iter()
      .map(value_to_text)
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join("; "),
    Value::Object(_) => value.to_string(),
  }
}

/// Reads an unsigned count from a JSON value, treating anything unreadable as zero.
pub fn value_to_u32(value: &Value) -> u32 {
  let n = match value {
    Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
    Value::String(s) => s.trim().parse::<u64>().ok(),
    _ => None,
  };
  n.map(|n| n.min(u64::from(u32::MAX)) as u32).unwrap_or_default()
}

/// Serde adapter for string fields, see [`value_to_text`].
pub fn lenient_string<'de, D>(deserializer: D) -> core::result::Result<String, D::Error>
where D: Deserializer<'de> {
  let value = Value::deserialize(deserializer)?;
  Ok(value_to_text(&value))
}

/// Serde adapter for count fields, see [`value_to_u32`].
pub fn lenient_u32<'de, D>(deserializer: D) -> core::result::Result<u32, D::Error>
where D: Deserializer<'de> {
  let value = Value::deserialize(deserializer)?;
  Ok(value_to_u32(&value))
}

/// Serde adapter for nested lists.
///
/// Elements that fail to deserialize are skipped rather than failing the whole record; bare
/// strings go through [`FromLooseText`]. Anything that is not an array yields an empty list.
pub fn lenient_list<'de, D, T>(deserializer: D) -> core::result::Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + FromLooseText, {
  let value = Value::deserialize(deserializer)?;
  let Value::Array(items) = value else {
    return Ok(Vec::new());
  };

  Ok(
    items
      .into_iter()
      .filter_map(|item| match item {
        Value::String(text) => T::from_loose_text(&text),
        other => match serde_json::from_value::<T>(other) {
          Ok(parsed) => Some(parsed),
          Err(e) => {
            trace!("Skipping malformed list element: {e}");
            None
          },
        },
      })
      .collect(),
  )
}

/// Whether a string is a non-empty run of decimal digits.
pub fn is_digits(s: &str) -> bool { !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) }

/// Splits a full name into first, middle and last parts.
///
/// The first token is the first name, the last token (when there are at least two) is the last
/// name, and everything in between is the middle name.
///
/// ```
/// use migrator::format::split_name;
///
/// assert_eq!(
///   split_name("Maria da Silva Santos"),
///   ("Maria".to_string(), "da Silva".to_string(), "Santos".to_string())
/// );
/// ```
pub fn split_name(name: &str) -> (String, String, String) {
  let parts: Vec<&str> = name.split_whitespace().collect();
  let first = parts.first().map(|s| s.to_string()).unwrap_or_default();
  let middle = if parts.len() > 2 { parts[1..parts.len() - 1].join(" ") } else { String::new() };
  let last = if parts.len() > 1 { parts[parts.len() - 1].to_string() } else { String::new() };
  (first, middle, last)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_value_to_text() {
    assert_eq!(value_to_text(&json!(null)), "");
    assert_eq!(value_to_text(&json!(12)), "12");
    assert_eq!(value_to_text(&json!("  padded ")), "padded");
    assert_eq!(value_to_text(&json!(["ensino", "", "robótica"])), "ensino; robótica");
  }

  #[test]
  fn test_value_to_u32() {
    assert_eq!(value_to_u32(&json!(7)), 7);
    assert_eq!(value_to_u32(&json!("12")), 12);
    assert_eq!(value_to_u32(&json!(3.0)), 3);
    assert_eq!(value_to_u32(&json!("twelve")), 0);
    assert_eq!(value_to_u32(&json!(-4)), 0);
    assert_eq!(value_to_u32(&json!(null)), 0);
  }

  #[test]
  fn test_is_digits() {
    assert!(is_digits("123"));
    assert!(!is_digits(""));
    assert!(!is_digits("12a"));
    assert!(!is_digits("xii"));
  }

  #[test]
  fn test_split_name() {
    assert_eq!(split_name("Ana"), ("Ana".into(), "".into(), "".into()));
    assert_eq!(split_name("Ana Souza"), ("Ana".into(), "".into(), "Souza".into()));
    assert_eq!(split_name(""), ("".into(), "".into(), "".into()));
  }
}
