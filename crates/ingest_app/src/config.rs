use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ingest_core::MimeExtensionTable;
use ingest_engine::{FetchSettings, IngestSettings, RenderSettings};
use ingest_logging::ingest_info;
use serde::{Deserialize, Serialize};

/// Settings read from a RON file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub output_root: PathBuf,
    pub bind: String,
    pub log_file: PathBuf,
    /// JSON MIME table; the built-in table is used when unset.
    pub extensions_path: Option<PathBuf>,
    pub stagger_ms: u64,
    pub settle_ms: u64,
    pub navigation_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_in_flight: Option<usize>,
    pub max_bytes: Option<u64>,
    pub chrome_executable: Option<PathBuf>,
    pub write_manifest: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let ingest = IngestSettings::default();
        Self {
            output_root: ingest.output_root,
            bind: "0.0.0.0:9000".to_string(),
            log_file: PathBuf::from("ingest.log"),
            extensions_path: None,
            stagger_ms: millis(ingest.stagger_interval),
            settle_ms: millis(ingest.render.settle_delay),
            navigation_timeout_ms: millis(ingest.render.navigation_timeout),
            request_timeout_ms: millis(ingest.fetch.request_timeout),
            max_in_flight: ingest.max_in_flight,
            max_bytes: ingest.fetch.max_bytes,
            chrome_executable: None,
            write_manifest: ingest.write_manifest,
        }
    }
}

impl AppConfig {
    /// Load from `path`. No path, or a file that does not exist, gives the
    /// defaults; an unreadable or malformed file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                ingest_info!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The MIME table named by `override_path`, else by the config, else the
    /// built-in one.
    pub fn mime_table(&self, override_path: Option<&Path>) -> anyhow::Result<MimeExtensionTable> {
        match override_path.or(self.extensions_path.as_deref()) {
            Some(path) => MimeExtensionTable::load(path)
                .with_context(|| format!("loading MIME table {}", path.display())),
            None => Ok(MimeExtensionTable::default()),
        }
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        let defaults = IngestSettings::default();
        IngestSettings {
            output_root: self.output_root.clone(),
            stagger_interval: Duration::from_millis(self.stagger_ms),
            max_in_flight: self.max_in_flight,
            write_manifest: self.write_manifest,
            fetch: FetchSettings {
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                max_bytes: self.max_bytes,
                ..defaults.fetch
            },
            render: RenderSettings {
                navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
                settle_delay: Duration::from_millis(self.settle_ms),
                chrome_executable: self.chrome_executable.clone(),
                ..defaults.render
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(Some(&temp.path().join("absent.ron"))).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ingest.ron");
        fs::write(
            &path,
            r#"(output_root: "/srv/docs", stagger_ms: 250, max_in_flight: Some(4))"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/srv/docs"));
        assert_eq!(config.max_in_flight, Some(4));
        assert_eq!(config.bind, "0.0.0.0:9000");

        let settings = config.ingest_settings();
        assert_eq!(settings.stagger_interval, Duration::from_millis(250));
        assert_eq!(settings.render.settle_delay, Duration::from_secs(2));
        assert_eq!(settings.render.navigation_timeout, Duration::from_secs(10));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.ron");
        fs::write(&path, "(stagger_ms: \"soon\")").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn extension_override_beats_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ext.json");
        fs::write(&path, r#"{"application/x-custom": ".cst"}"#).unwrap();

        let config = AppConfig::default();
        let table = config.mime_table(Some(&path)).unwrap();
        assert_eq!(table.resolve("application/x-custom"), Some(".cst"));
        assert_eq!(table.resolve("application/pdf"), None);

        let builtin = config.mime_table(None).unwrap();
        assert_eq!(builtin.resolve("application/pdf"), Some(".pdf"));
    }
}
