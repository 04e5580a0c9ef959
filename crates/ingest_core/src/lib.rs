//! Ingest core: batch data model, MIME extension table and text normalization.
//!
//! Nothing in this crate performs network or file-system IO beyond loading
//! the extension table.
mod batch;
mod mime_table;
mod normalize;

pub use batch::{
    BatchError, BatchRequest, BatchResult, BatchSlot, CleanedDocument, DocumentRecord,
    DocumentRequest, Priority,
};
pub use mime_table::{MimeExtensionTable, TableError};
pub use normalize::{
    normalize_mixed_text, MixedScriptNormalizer, NoCorrection, ScriptRunTokenizer,
    SpellCorrector, Tokenizer,
};
