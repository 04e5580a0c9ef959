//! Ingest engine: classification, fetching, sanitizing and batch scheduling.
mod classify;
mod decode;
mod fetch;
mod persist;
mod policy;
mod render;
mod sanitize;
mod scheduler;
mod sniff;
mod types;

pub use classify::{ContentClassifier, HttpProbeClassifier};
pub use decode::{decode_text, DecodeError, DecodedText};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, BROWSER_USER_AGENT};
pub use persist::{
    ensure_output_dir, prepare_batch_dir, unique_filename, write_manifest, AtomicFileWriter,
    PersistError, MANIFEST_FILENAME,
};
pub use policy::{TagPolicy, TagTable, STANDARD_TAGS};
pub use render::{ChromeRenderer, RenderSettings, Renderer};
pub use sanitize::HtmlSanitizer;
pub use scheduler::{IngestSettings, Ingestor, HTML_EXTENSION, HTML_MIME};
pub use sniff::{sniff_bytes, sniff_file, EMPTY, OCTET_STREAM, SNIFF_LEN};
pub use types::{
    ContentKind, Download, FailureKind, FetchError, FetchOutcome, FetchOutput, FetchedBody,
};
