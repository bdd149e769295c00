use migrator::{
  configuration::{Prompts, Provider},
  export::CsvHeaders,
  llm::Purpose,
};

use super::*;

#[test]
fn test_shipped_configuration() -> TestResult<()> {
  let config = Config::from_path("../../config/config.json")?;
  assert_eq!(config.year, "2023");
  assert_eq!(config.provider, Provider::OpenAi);
  assert_eq!(config.completion_strategy, CompletionStrategy::Replace);
  assert_eq!(config.file_limit(), None);
  assert_eq!(config.csv_dir(), Path::new("output/2023/csv"));
  Ok(())
}

#[test]
fn test_shipped_prompts_cover_every_purpose() -> TestResult<()> {
  let prompts = Prompts::from_path("../../config/prompts.yaml")?;
  for purpose in Purpose::ALL {
    assert!(!prompts.get(purpose).is_empty(), "no prompt for {purpose}");
  }
  Ok(())
}

#[test]
fn test_shipped_headers_match_defaults() -> TestResult<()> {
  assert_eq!(CsvHeaders::from_path("../../config/headers.json")?, CsvHeaders::default());
  Ok(())
}
