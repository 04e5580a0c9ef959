use std::fs;
use std::io::Write;
use std::path::PathBuf;

use ingest_core::{BatchResult, BatchSlot, DocumentRecord, Priority};
use ingest_engine::{
    ensure_output_dir, prepare_batch_dir, unique_filename, write_manifest, AtomicFileWriter,
    MANIFEST_FILENAME,
};
use pretty_assertions::assert_eq;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn batch_dir_is_recreated_empty() {
    let temp = TempDir::new().unwrap();
    let stale = temp.path().join("batch-7");
    fs::create_dir_all(stale.join("nested")).unwrap();
    fs::write(stale.join("old.pdf"), "stale").unwrap();

    let dir = prepare_batch_dir(temp.path(), "batch-7").unwrap();
    assert_eq!(dir, stale);
    assert!(dir.is_dir());
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
}

#[test]
fn batch_dir_replaces_plain_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("b"), "not a dir").unwrap();

    let dir = prepare_batch_dir(temp.path(), "b").unwrap();
    assert!(dir.is_dir());
}

#[test]
fn unique_names_carry_extension_and_differ() {
    let a = unique_filename(".pdf");
    let b = unique_filename(".pdf");
    assert!(a.ends_with(".pdf"));
    assert_eq!(a.len(), 36 + 4);
    assert_ne!(a, b);
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("doc.html", "hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "doc.html");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("doc.html", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write_unique(".html", "data");
    assert!(result.is_err());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn promote_moves_scratch_file_under_unique_name() {
    let temp = TempDir::new().unwrap();
    let mut scratch = NamedTempFile::new_in(temp.path()).unwrap();
    scratch.write_all(b"%PDF-1.4").unwrap();
    let scratch_path = scratch.path().to_path_buf();

    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let target = writer.promote(scratch, ".pdf").unwrap();

    assert!(!scratch_path.exists());
    assert_eq!(target.parent().unwrap(), temp.path());
    assert_eq!(target.extension().unwrap(), "pdf");
    assert_eq!(fs::read(&target).unwrap(), b"%PDF-1.4");
}

#[test]
fn manifest_keeps_failed_slots_as_false() {
    let temp = TempDir::new().unwrap();
    let record = DocumentRecord {
        title: "report".into(),
        tags: Default::default(),
        url: "https://example.com/report.pdf".into(),
        priority: Priority::High,
        final_path: PathBuf::from("/data/b/1.pdf"),
        extension: ".pdf".into(),
        mime_type: "application/pdf".into(),
    };
    let result = BatchResult {
        batch_id: "b".into(),
        directory: temp.path().to_path_buf(),
        slots: vec![
            BatchSlot::Downloaded(record),
            BatchSlot::Failed {
                url: "https://example.com/missing".into(),
                reason: "http status 404".into(),
            },
        ],
    };

    let path = write_manifest(temp.path(), &result).unwrap();
    assert_eq!(path.file_name().unwrap(), MANIFEST_FILENAME);

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(manifest["batch_id"], "b");
    assert_eq!(manifest["document_count"], 1);
    assert_eq!(manifest["failed_count"], 1);
    let docs = manifest["documents_downloaded"].as_array().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["extension"], ".pdf");
    assert_eq!(docs[0]["priority"], "high");
    assert_eq!(docs[1], serde_json::Value::Bool(false));
}
