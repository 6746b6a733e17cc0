//! Seam to the thread summarization service.
//!
//! Summaries are produced elsewhere; this crate only consumes the per-user
//! persona strings for hover cards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::Thread;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid summary document in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Output of a summarization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadSummary {
    /// Free-form analysis text (Markdown).
    #[serde(default)]
    pub analysis: String,
    /// Username to persona description.
    #[serde(default)]
    pub personas: HashMap<String, String>,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn summarize(&self, thread: &Thread) -> Result<ThreadSummary, SummaryError>;
}

/// Produces empty summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn summarize(&self, _thread: &Thread) -> Result<ThreadSummary, SummaryError> {
        Ok(ThreadSummary::default())
    }
}

/// Either a full summary document or a bare `{username: persona}` map.
///
/// A full document must carry a `personas` object. Persona values are
/// strings, so a bare map never matches it, even one with users named
/// `analysis` or `personas`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SummaryDocument {
    Full(FullDocument),
    Personas(HashMap<String, String>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FullDocument {
    #[serde(default)]
    analysis: String,
    personas: HashMap<String, String>,
}

/// Summaries read from a JSON file written by an external tool.
///
/// The file is re-read on every call so it can be updated while the
/// server runs.
#[derive(Debug, Clone)]
pub struct PersonaFile {
    path: PathBuf,
}

impl PersonaFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::Io`] if the file cannot be read and
    /// [`SummaryError::Parse`] if it is neither a summary document nor a
    /// persona map.
    pub async fn load(&self) -> Result<ThreadSummary, SummaryError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SummaryError::Io {
                path: self.path.clone(),
                source,
            })?;
        let document: SummaryDocument =
            serde_json::from_slice(&bytes).map_err(|source| SummaryError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let summary = match document {
            SummaryDocument::Full(FullDocument { analysis, personas }) => ThreadSummary {
                analysis,
                personas,
            },
            SummaryDocument::Personas(personas) => ThreadSummary {
                analysis: String::new(),
                personas,
            },
        };
        debug!(
            path = %self.path.display(),
            personas = summary.personas.len(),
            "Loaded personas"
        );
        Ok(summary)
    }
}

#[async_trait]
impl Summarizer for PersonaFile {
    fn name(&self) -> &'static str {
        "persona-file"
    }

    async fn summarize(&self, _thread: &Thread) -> Result<ThreadSummary, SummaryError> {
        self.load().await
    }
}
