//! Migration of OJS conference proceedings into structured CSV datasets.
//!
//! `migrator` recovers article metadata (titles, abstracts, keywords, authors, references and
//! DOIs) for a conference year hosted on an OJS (Open Journal Systems) website. The metadata is
//! spread unevenly between the PDF files and the HTML table of contents, so the library combines
//! both:
//!
//! - PDF text acquisition, page by page
//! - Heuristic selection of the pages that carry header metadata and bibliographies
//! - Encoding-corruption detection with LLM-backed repair
//! - LLM extraction of article and reference records with a bounded JSON retry loop
//! - Reconciliation of PDF records with website stubs under fixed field precedence
//! - A second LLM pass that fills fields still left empty
//! - CSV exports and JSON snapshots, with resumption from the pre-completion snapshot
//!
//! # Getting Started
//!
//! ```no_run
//! use migrator::{configuration::Config, migrator::Migrator, prelude::*};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let config = Config::from_path("config/config.json")?;
//!   let migrator = Migrator::from_config(config)?;
//!
//!   let articles = migrator.migrate().await?;
//!   println!("Processed {} articles", articles.len());
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`article`]: Article, author and reference records and their wire format
//! - [`segment`]: First/last page selection
//! - [`normalize`]: Text cleaning and encoding repair
//! - [`extractor`]: LLM extraction with bounded retries
//! - [`completion`]: Field completion pass
//! - [`reconcile`]: Website/PDF merge
//! - [`migrator`]: The end-to-end pipeline driver
//! - [`llm`]: Completion providers (OpenAI, Anthropic, Ollama)
//! - [`pdf`], [`scrape`], [`download`]: Acquisition of PDF text and website metadata
//! - [`export`], [`snapshot`]: CSV and JSON sinks
//! - [`affiliation`]: Post-export correction of author affiliations

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::{HashMap, HashSet},
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
  sync::Arc,
};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod affiliation;
pub mod article;
pub mod completion;
pub mod configuration;
pub mod credentials;
pub mod download;
pub mod error;
pub mod export;
pub mod extractor;
pub mod format;
pub mod llm;
pub mod migrator;
pub mod normalize;
pub mod pdf;
pub mod reconcile;
pub mod scrape;
pub mod segment;
pub mod snapshot;

use crate::{
  article::*, configuration::*, error::*, extractor::ArticleExtractor, llm::*,
  normalize::TextNormalizer, pdf::PdfText, scrape::WebsiteArticle, segment::*,
};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use migrator::prelude::*;
///
/// fn describe(error: &MigratorError) -> String { error.to_string() }
/// ```
pub mod prelude {
  pub use crate::{
    error::{MigratorError, Result},
    llm::Completion,
  };
}
