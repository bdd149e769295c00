//! Selection of the PDF pages that carry header metadata and bibliographies.
//!
//! Titles, authors and abstracts sit on the first page, sometimes spilling onto the second. The
//! bibliography sits at the end, sometimes spanning the last three pages. Marker words decide how
//! much text to take: a first page that already reaches the introduction holds the whole header,
//! and a last page that already names the references section holds the whole bibliography.

use super::*;

/// Which end of a PDF to take pages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLocation {
  /// Header pages
  First,
  /// Bibliography pages
  Last,
}

impl FromStr for PageLocation {
  type Err = MigratorError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "first" => Ok(Self::First),
      "last" => Ok(Self::Last),
      _ => Err(MigratorError::InvalidPageLocation(s.to_string())),
    }
  }
}

/// Lower-case marker words used by [`select_pages`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMarkers {
  /// Words signalling that a page already reached the introduction
  pub introduction: Vec<String>,
  /// Words signalling that a page contains the references section
  pub references:   Vec<String>,
}

impl Default for PageMarkers {
  fn default() -> Self {
    Self {
      introduction: ["introducao", "introdução", "introduction"].map(String::from).to_vec(),
      references:   [
        "references",
        "referências",
        "referencias",
        "bibliography",
        "bibliografia",
        "referência",
        "referˆencia",
      ]
      .map(String::from)
      .to_vec(),
    }
  }
}

/// Whether the lower-cased page contains any of the markers.
fn contains_marker(page: &str, markers: &[String]) -> bool {
  let page = page.to_lowercase();
  markers.iter().any(|marker| page.contains(marker.as_str()))
}

/// Joins the pages relevant for `location` into one string.
///
/// - [`PageLocation::First`]: the first page alone when there is only one page or it contains an
///   introduction marker, otherwise `"{first}, {second}"`.
/// - [`PageLocation::Last`]: the only page of a single-page PDF, the last page alone when it
///   contains a reference marker, otherwise `"{third_last} {second_last} {last}"` where the
///   third-to-last page is empty for PDFs with fewer than four pages.
///
/// An empty page list yields an empty string.
///
/// ```
/// use migrator::segment::{select_pages, PageLocation, PageMarkers};
///
/// let pages: Vec<String> = ["a", "b", "c", "d", "e"].map(String::from).to_vec();
/// assert_eq!(select_pages(&pages, PageLocation::Last, &PageMarkers::default()), "c d e");
/// assert_eq!(select_pages(&pages, PageLocation::First, &PageMarkers::default()), "a, b");
/// ```
pub fn select_pages(pages: &[String], location: PageLocation, markers: &PageMarkers) -> String {
  let Some(last) = pages.last() else {
    return String::new();
  };

  match location {
    PageLocation::First => {
      let first = &pages[0];
      if pages.len() < 2 || contains_marker(first, &markers.introduction) {
        first.clone()
      } else {
        format!("{first}, {}", pages[1])
      }
    },
    PageLocation::Last => {
      if pages.len() == 1 || contains_marker(last, &markers.references) {
        return last.clone();
      }
      let n = pages.len();
      let third_last = if n > 3 { pages[n - 3].as_str() } else { "" };
      format!("{third_last} {} {last}", pages[n - 2])
    },
  }
}
