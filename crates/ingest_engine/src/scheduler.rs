use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use ingest_core::{
    BatchError, BatchRequest, BatchResult, BatchSlot, CleanedDocument, DocumentRecord,
    DocumentRequest, MimeExtensionTable,
};
use ingest_logging::{ingest_debug, ingest_info, ingest_warn};
use tokio::sync::Semaphore;

use crate::classify::{ContentClassifier, HttpProbeClassifier};
use crate::fetch::{io_error, FetchSettings, Fetcher, ReqwestFetcher};
use crate::persist::{prepare_batch_dir, write_manifest, AtomicFileWriter, PersistError};
use crate::render::{ChromeRenderer, RenderSettings, Renderer};
use crate::sanitize::HtmlSanitizer;
use crate::sniff::sniff_file;
use crate::{ContentKind, Download, FailureKind, FetchError, FetchOutcome, FetchOutput, FetchedBody};

pub const HTML_EXTENSION: &str = ".html";
pub const HTML_MIME: &str = "text/html";

#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Batch directories are created as `{output_root}/{batch_id}`.
    pub output_root: PathBuf,
    /// Task `i` waits `i * stagger_interval` before its first request.
    pub stagger_interval: Duration,
    /// Upper bound on tasks past their stagger delay at once; `None` is unbounded.
    /// `Some(0)` is treated as `Some(1)` so a batch always makes progress.
    pub max_in_flight: Option<usize>,
    pub write_manifest: bool,
    pub fetch: FetchSettings,
    pub render: RenderSettings,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("document_chatbot"),
            stagger_interval: Duration::from_millis(100),
            max_in_flight: None,
            write_manifest: true,
            fetch: FetchSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

/// Runs batches of URLs through classification, fetching, sanitizing and
/// persistence.
pub struct Ingestor {
    settings: IngestSettings,
    table: Arc<MimeExtensionTable>,
    classifier: Arc<dyn ContentClassifier>,
    fetcher: Arc<dyn Fetcher>,
    renderer: Arc<dyn Renderer>,
    sanitizer: HtmlSanitizer,
}

impl Ingestor {
    pub fn new(settings: IngestSettings, table: MimeExtensionTable) -> Self {
        let classifier = Arc::new(HttpProbeClassifier::new(settings.fetch.clone()));
        let fetcher = Arc::new(ReqwestFetcher::new(settings.fetch.clone()));
        let renderer = Arc::new(ChromeRenderer::new(settings.render.clone()));
        Self {
            settings,
            table: Arc::new(table),
            classifier,
            fetcher,
            renderer,
            sanitizer: HtmlSanitizer::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Ingest every URL of `batch` and return one slot per URL, in order.
    ///
    /// Per-URL failures become `BatchSlot::Failed`; only an unusable batch
    /// directory fails the call.
    pub async fn run_batch(&self, batch: &BatchRequest) -> Result<BatchResult, BatchError> {
        let directory = prepare_batch_dir(&self.settings.output_root, batch.batch_id())
            .map_err(|err| BatchError::OutputDir(err.to_string()))?;
        ingest_info!(
            "Batch {} started: {} urls into {:?}",
            batch.batch_id(),
            batch.len(),
            directory
        );

        let limiter = self
            .settings
            .max_in_flight
            .map(|limit| Semaphore::new(limit.max(1)));
        let tasks = batch.documents().iter().enumerate().map(|(index, request)| {
            let delay = self
                .settings
                .stagger_interval
                .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
            self.run_task(index, request, &directory, delay, limiter.as_ref())
        });
        let slots = join_all(tasks).await;

        let result = BatchResult {
            batch_id: batch.batch_id().to_string(),
            directory: directory.clone(),
            slots,
        };
        if self.settings.write_manifest {
            if let Err(err) = write_manifest(&directory, &result) {
                ingest_warn!("Could not write manifest for {}: {}", result.batch_id, err);
            }
        }
        ingest_info!(
            "Batch {} finished: {} downloaded, {} failed",
            result.batch_id,
            result.succeeded(),
            result.failed()
        );
        Ok(result)
    }

    async fn run_task(
        &self,
        index: usize,
        request: &DocumentRequest,
        directory: &Path,
        delay: Duration,
        limiter: Option<&Semaphore>,
    ) -> BatchSlot {
        tokio::time::sleep(delay).await;
        // The semaphore is never closed, so acquiring only waits.
        let _permit = match limiter {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };

        match self.ingest(request, directory).await {
            Ok(document) => {
                ingest_info!(
                    "[{}] {} saved as {:?} ({})",
                    index,
                    request.url,
                    document.final_path,
                    document.mime_type
                );
                BatchSlot::Downloaded(DocumentRecord::new(request, document))
            }
            Err(err) => {
                ingest_warn!("[{}] {} failed: {}", index, request.url, err);
                BatchSlot::Failed {
                    url: request.url.clone(),
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn ingest(
        &self,
        request: &DocumentRequest,
        directory: &Path,
    ) -> Result<CleanedDocument, FetchError> {
        let url = request.url.as_str();
        let outcome: FetchOutcome = match self.classifier.classify(url).await {
            ContentKind::Html => self.renderer.render(url).await.map(FetchOutput::rendered),
            ContentKind::Other => self
                .fetcher
                .fetch(url, directory)
                .await
                .map(FetchOutput::streamed),
        };

        let output = outcome?;
        match output.body {
            FetchedBody::Rendered(html) => self.store_rendered(url, &html, directory),
            FetchedBody::Streamed(download) => {
                self.store_download(url, download, output.declared_mime.as_deref(), directory)
            }
        }
    }

    fn store_rendered(
        &self,
        url: &str,
        html: &str,
        directory: &Path,
    ) -> Result<CleanedDocument, FetchError> {
        let cleaned = self.sanitizer.sanitize(html);
        let final_path = AtomicFileWriter::new(directory.to_path_buf())
            .write_unique(HTML_EXTENSION, &cleaned)
            .map_err(persist_error)?;
        Ok(CleanedDocument {
            final_path,
            extension: HTML_EXTENSION.to_string(),
            mime_type: HTML_MIME.to_string(),
            source_url: url.to_string(),
        })
    }

    fn store_download(
        &self,
        url: &str,
        download: Download,
        declared_mime: Option<&str>,
        directory: &Path,
    ) -> Result<CleanedDocument, FetchError> {
        let mime = sniff_file(download.file.path()).map_err(io_error)?;
        ingest_debug!(
            "{}: declared {:?}, detected {} ({} bytes)",
            url,
            declared_mime,
            mime,
            download.byte_len
        );

        let Some(extension) = self.table.resolve(mime) else {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType {
                    content_type: mime.to_string(),
                },
                "no extension mapping",
            ));
        };

        let final_path = AtomicFileWriter::new(directory.to_path_buf())
            .promote(download.file, extension)
            .map_err(persist_error)?;
        Ok(CleanedDocument {
            final_path,
            extension: extension.to_string(),
            mime_type: mime.to_string(),
            source_url: url.to_string(),
        })
    }
}

fn persist_error(err: PersistError) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}
