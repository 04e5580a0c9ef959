use std::fs;

use ingest_core::{MimeExtensionTable, TableError};
use tempfile::TempDir;

#[test]
fn known_mime_resolves_to_configured_extension() {
    let table = MimeExtensionTable::default();
    assert_eq!(table.resolve("application/pdf"), Some(".pdf"));
    assert_eq!(table.resolve("image/png"), Some(".png"));
    assert_eq!(
        table.resolve("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        Some(".docx")
    );
}

#[test]
fn unmapped_mime_is_reported_as_unsupported() {
    let table = MimeExtensionTable::default();
    assert_eq!(table.resolve("application/x-msdownload"), None);
    assert_eq!(table.resolve(""), None);
}

#[test]
fn table_loads_from_external_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("extensions.json");
    fs::write(&path, r#"{"Application/PDF": ".pdf", "text/x-custom": ".custom"}"#).unwrap();

    let table = MimeExtensionTable::load(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.resolve("application/pdf; version=1.7"), Some(".pdf"));
    assert_eq!(table.resolve("text/x-custom"), Some(".custom"));
    assert_eq!(table.resolve("text/plain"), None);
}

#[test]
fn malformed_tables_are_rejected() {
    assert!(matches!(
        MimeExtensionTable::from_json_str("[1, 2]"),
        Err(TableError::Parse(_))
    ));
    assert!(matches!(
        MimeExtensionTable::from_json_str(r#"{"application/pdf": "pdf"}"#),
        Err(TableError::BadExtension { .. })
    ));

    let dir = TempDir::new().unwrap();
    assert!(matches!(
        MimeExtensionTable::load(&dir.path().join("missing.json")),
        Err(TableError::Io { .. })
    ));
}
