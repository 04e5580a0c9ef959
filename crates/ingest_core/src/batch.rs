use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Errors that reject a whole batch before any task starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch id must not be empty")]
    EmptyBatchId,
    #[error("batch id {0:?} is not a single path component")]
    UnsafeBatchId(String),
    #[error("url list must not be empty")]
    NoUrls,
    #[error("url at position {index} is blank")]
    BlankUrl { index: usize },
    #[error("batch directory unavailable: {0}")]
    OutputDir(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(label)
    }
}

/// One URL to ingest, with the metadata that travels into its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub url: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub priority: Priority,
}

impl DocumentRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            tags: BTreeSet::new(),
            priority: Priority::default(),
        }
    }
}

/// A validated batch: a path-safe id plus a non-empty list of non-blank URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    batch_id: String,
    documents: Vec<DocumentRequest>,
}

impl BatchRequest {
    pub fn new<I, S>(batch_id: &str, urls: I) -> Result<Self, BatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch_id = validate_batch_id(batch_id)?;
        let mut documents = Vec::new();
        for (index, url) in urls.into_iter().enumerate() {
            let trimmed = url.as_ref().trim();
            if trimmed.is_empty() {
                return Err(BatchError::BlankUrl { index });
            }
            documents.push(DocumentRequest::new(trimmed));
        }
        if documents.is_empty() {
            return Err(BatchError::NoUrls);
        }
        Ok(Self {
            batch_id,
            documents,
        })
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn documents(&self) -> &[DocumentRequest] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn validate_batch_id(raw: &str) -> Result<String, BatchError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(BatchError::EmptyBatchId);
    }
    let unsafe_id = id == "."
        || id == ".."
        || id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0'..='\u{1F}'));
    if unsafe_id {
        return Err(BatchError::UnsafeBatchId(id.to_string()));
    }
    Ok(id.to_string())
}

/// A successfully persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedDocument {
    pub final_path: PathBuf,
    pub extension: String,
    pub mime_type: String,
    pub source_url: String,
}

/// Metadata record handed to downstream indexing for a successful slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub title: String,
    pub tags: BTreeSet<String>,
    pub url: String,
    pub priority: Priority,
    pub final_path: PathBuf,
    pub extension: String,
    pub mime_type: String,
}

impl DocumentRecord {
    pub fn new(request: &DocumentRequest, document: CleanedDocument) -> Self {
        Self {
            title: request.title.clone(),
            tags: request.tags.clone(),
            url: document.source_url,
            priority: request.priority,
            final_path: document.final_path,
            extension: document.extension,
            mime_type: document.mime_type,
        }
    }
}

/// Outcome for one position of the batch.
///
/// Serializes as the record itself, or as the literal `false` for a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSlot {
    Downloaded(DocumentRecord),
    Failed { url: String, reason: String },
}

impl BatchSlot {
    pub fn record(&self) -> Option<&DocumentRecord> {
        match self {
            BatchSlot::Downloaded(record) => Some(record),
            BatchSlot::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BatchSlot::Failed { .. })
    }
}

impl Serialize for BatchSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BatchSlot::Downloaded(record) => record.serialize(serializer),
            BatchSlot::Failed { .. } => serializer.serialize_bool(false),
        }
    }
}

/// Positionally complete result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub batch_id: String,
    pub directory: PathBuf,
    pub slots: Vec<BatchSlot>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_failed()).count()
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.slots.iter().filter_map(BatchSlot::record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_id_is_trimmed() {
        let batch = BatchRequest::new("  bot-1 ", ["https://a.example"]).unwrap();
        assert_eq!(batch.batch_id(), "bot-1");
    }

    #[test]
    fn dotted_ids_are_rejected() {
        assert!(matches!(
            validate_batch_id(".."),
            Err(BatchError::UnsafeBatchId(_))
        ));
        assert!(validate_batch_id("v1.2").is_ok());
    }
}
