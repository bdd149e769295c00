//! Page-by-page text extraction from downloaded PDFs.

use lopdf::Document;

use super::*;

/// Text of one PDF, page by page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfText {
  /// Text of each page in page order. Pages outside the extraction window are empty.
  pub text_pages:    Vec<String>,
  /// Total page count
  #[serde(rename = "numPages")]
  pub num_pages:     u32,
  /// File name without extension; the article's `id_jems`
  pub base_filename: String,
}

/// Extracts text from every PDF in a directory.
#[derive(Debug, Clone, Default)]
pub struct PdfProcessor {
  /// Pages extracted at each end of a document; zero extracts all pages
  page_window: u32,
}

impl PdfProcessor {
  /// A processor that extracts every page.
  pub fn new() -> Self { Self::default() }

  /// Limits extraction to the first and last `pages` pages. Zero extracts everything.
  ///
  /// Only the ends of a paper carry header metadata and references, so long documents do not need
  /// their middle pages decoded. The page count and page positions are unaffected.
  pub fn with_page_window(mut self, pages: u32) -> Self {
    self.page_window = pages;
    self
  }

  /// Processes every `*.pdf` file in `dir`, sorted by file name.
  ///
  /// Files that cannot be loaded are logged and skipped.
  ///
  /// # Errors
  ///
  /// Fails only when the directory itself cannot be read.
  pub fn process_all(&self, dir: impl AsRef<Path>) -> Result<Vec<PdfText>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        path.is_file() && extension.eq_ignore_ascii_case("pdf")
      })
      .collect();
    paths.sort();
    info!("Extracting text from {} PDFs in {}", paths.len(), dir.display());

    let mut texts = Vec::with_capacity(paths.len());
    for path in paths {
      match self.process_file(&path) {
        Ok(text) => texts.push(text),
        Err(e) => warn!("Skipping unreadable PDF {}: {e}", path.display()),
      }
    }
    Ok(texts)
  }

  /// Extracts the text of a single PDF.
  pub fn process_file(&self, path: impl AsRef<Path>) -> Result<PdfText> {
    let path = path.as_ref();
    let doc = Document::load(path)?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let num_pages = page_numbers.len();

    let text_pages = page_numbers
      .iter()
      .enumerate()
      .map(|(index, &page)| {
        if !self.in_window(index, num_pages) {
          return String::new();
        }
        doc.extract_text(&[page]).unwrap_or_else(|e| {
          debug!("No text on page {page} of {}: {e}", path.display());
          String::new()
        })
      })
      .collect();

    let base_filename =
      path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
    trace!("Extracted {num_pages} pages from {base_filename}");

    Ok(PdfText { text_pages, num_pages: num_pages as u32, base_filename })
  }

  /// Whether the zero-based page `index` of a `total`-page document is extracted.
  fn in_window(&self, index: usize, total: usize) -> bool {
    let window = self.page_window as usize;
    window == 0 || index < window || index + window >= total
  }
}

#[cfg(test)]
mod tests {
  use lopdf::{
    content::{Content, Operation},
    dictionary, Object, Stream,
  };

  use super::*;

  fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
      "Type" => "Font",
      "Subtype" => "Type1",
      "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
      "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for n in 1..=pages {
      let content = Content {
        operations: vec![
          Operation::new("BT", vec![]),
          Operation::new("Tf", vec!["F1".into(), 12.into()]),
          Operation::new("Td", vec![100.into(), 600.into()]),
          Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
          Operation::new("ET", vec![]),
        ],
      };
      let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
      let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
      });
      kids.push(page_id.into());
    }

    doc.objects.insert(
      pages_id,
      Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
      }),
    );
    let catalog_id = doc.add_object(dictionary! {
      "Type" => "Catalog",
      "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
  }

  #[traced_test]
  #[test]
  fn test_process_all() {
    let dir = tempdir().unwrap();
    write_pdf(&dir.path().join("2002.pdf"), 3);
    write_pdf(&dir.path().join("1001.pdf"), 1);
    std::fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let texts = PdfProcessor::new().process_all(dir.path()).unwrap();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0].base_filename, "1001");
    assert_eq!(texts[0].num_pages, 1);
    assert_eq!(texts[1].base_filename, "2002");
    assert_eq!(texts[1].num_pages, 3);
    assert_eq!(texts[1].text_pages.len(), 3);
    assert!(logs_contain("Skipping unreadable PDF"));
  }

  #[test]
  fn test_page_window() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("3003.pdf");
    write_pdf(&path, 7);

    let text = PdfProcessor::new().with_page_window(2).process_file(&path).unwrap();
    assert_eq!(text.num_pages, 7);
    assert_eq!(text.text_pages.len(), 7);
    assert!(text.text_pages[2..5].iter().all(String::is_empty));
  }

  #[test]
  fn test_in_window() {
    let processor = PdfProcessor::new().with_page_window(2);
    let extracted: Vec<bool> = (0..6).map(|i| processor.in_window(i, 6)).collect();
    assert_eq!(extracted, vec![true, true, false, false, true, true]);
    assert!(PdfProcessor::new().in_window(3, 6));
  }

  #[test]
  fn test_missing_directory() {
    assert!(matches!(
      PdfProcessor::new().process_all("/definitely/not/here"),
      Err(MigratorError::Path(_))
    ));
  }
}
