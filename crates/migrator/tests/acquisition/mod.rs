use migrator::{download::PdfDownloader, pdf::PdfProcessor, scrape::OjsScraper};

use super::*;

#[traced_test]
#[tokio::test]
async fn test_download_pdfs() -> TestResult<()> {
  let site = serve_proceedings().await;
  let target = tempdir()?;

  let paths = PdfDownloader::new(&format!("{site}{ISSUE_PATH}"), target.path())
    .download_all(None)
    .await?;

  assert_eq!(paths, vec![target.path().join("10.pdf"), target.path().join("20.pdf")]);
  assert!(!target.path().join("30.pdf").exists());

  let texts = PdfProcessor::new().process_all(target.path())?;
  assert_eq!(texts.len(), 2);
  assert_eq!(texts[1].base_filename, "20");
  assert_eq!(texts[1].num_pages, 3);
  assert!(texts[1].text_pages[0].contains("Robotica"));
  Ok(())
}

#[tokio::test]
async fn test_download_limit() -> TestResult<()> {
  let site = serve_proceedings().await;
  let target = tempdir()?;

  let paths = PdfDownloader::new(&format!("{site}{ISSUE_PATH}"), target.path())
    .download_all(Some(1))
    .await?;
  assert_eq!(paths, vec![target.path().join("10.pdf")]);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_scrape_website_articles() -> TestResult<()> {
  let site = serve_proceedings().await;

  let articles = OjsScraper::new(&format!("{site}{ISSUE_PATH}")).fetch_articles(None).await?;
  let ids: Vec<&str> = articles.iter().map(|article| article.id_jems.as_str()).collect();
  assert_eq!(ids, vec!["10", "20", "30"]);
  assert_eq!(articles[0].section, Section::Editorial);
  assert_eq!(articles[2].seq, 3);
  assert_eq!(articles[2].first_page, "11");

  // The editorial's metadata page is not served.
  assert!(articles[0].metadata.is_none());

  let metadata = articles[1].metadata.as_ref().unwrap();
  assert_eq!(metadata.doi, "10.0/site");
  assert_eq!(metadata.abstract_en, "Website text.");
  assert_eq!(metadata.authors[0].affiliation, "Universidade Federal X");
  Ok(())
}

#[tokio::test]
async fn test_missing_issue_page() {
  let site = serve(HashMap::new()).await;
  let result = OjsScraper::new(&format!("{site}{ISSUE_PATH}")).fetch_articles(None).await;
  assert!(matches!(result, Err(MigratorError::Network(_))));
}
