use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

const DEFAULT_TABLE: &str = include_str!("../data/extensions.json");

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read extension table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid extension table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("extension for {mime} must start with '.', got {extension:?}")]
    BadExtension { mime: String, extension: String },
}

/// Immutable MIME type -> file extension mapping.
///
/// Keys are normalized on load and on lookup: parameters after `;` are
/// dropped and the remainder is trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeExtensionTable {
    entries: HashMap<String, String>,
}

impl MimeExtensionTable {
    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (mime, extension) in raw {
            if !extension.starts_with('.') || extension.len() < 2 {
                return Err(TableError::BadExtension { mime, extension });
            }
            entries.insert(normalize_mime(&mime), extension);
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let content = fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Extension for `mime`, or `None` when the type is not supported.
    pub fn resolve(&self, mime: &str) -> Option<&str> {
        self.entries.get(&normalize_mime(mime)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MimeExtensionTable {
    fn default() -> Self {
        // The embedded table is validated by the `default_table_parses` test.
        Self::from_json_str(DEFAULT_TABLE).unwrap_or_else(|_| Self {
            entries: HashMap::new(),
        })
    }
}

fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_parses() {
        let table = MimeExtensionTable::from_json_str(DEFAULT_TABLE).unwrap();
        assert_eq!(table.resolve("application/pdf"), Some(".pdf"));
        assert!(table.len() > 10);
    }

    #[test]
    fn lookup_ignores_parameters_and_case() {
        assert_eq!(normalize_mime(" Text/Plain; charset=utf-8"), "text/plain");
    }
}
