use ingest_logging::ingest_debug;
use reqwest::header::CONTENT_TYPE;

use crate::fetch::{build_client, map_reqwest_error, parse_http_url, FetchSettings};
use crate::{ContentKind, FetchError};

const HTML_MARKER: &[u8] = b"<html";

/// Decides which fetch strategy a URL needs.
///
/// Implementations never fail: anything that cannot be decided is `Other`,
/// which sends the URL down the static download path.
#[async_trait::async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, url: &str) -> ContentKind;
}

/// Classifies with a streaming GET: the `Content-Type` header first, then the
/// first `probe_bytes` of the body.
#[derive(Debug, Clone)]
pub struct HttpProbeClassifier {
    settings: FetchSettings,
}

impl HttpProbeClassifier {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    async fn probe(&self, url: &str) -> Result<ContentKind, FetchError> {
        let parsed = parse_http_url(url)?;
        let client = build_client(&self.settings, self.settings.probe_timeout)?;
        let mut response = client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let declares_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));
        if declares_html {
            return Ok(ContentKind::Html);
        }

        let limit = self.settings.probe_bytes;
        let mut head = Vec::with_capacity(limit);
        while head.len() < limit {
            match response.chunk().await.map_err(map_reqwest_error)? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }
        head.truncate(limit);

        if contains_html_marker(&head) {
            Ok(ContentKind::Html)
        } else {
            Ok(ContentKind::Other)
        }
    }
}

#[async_trait::async_trait]
impl ContentClassifier for HttpProbeClassifier {
    async fn classify(&self, url: &str) -> ContentKind {
        match self.probe(url).await {
            Ok(kind) => kind,
            Err(err) => {
                ingest_debug!("Classification probe failed for {}: {}", url, err);
                ContentKind::Other
            }
        }
    }
}

fn contains_html_marker(head: &[u8]) -> bool {
    head.windows(HTML_MARKER.len())
        .any(|window| window.eq_ignore_ascii_case(HTML_MARKER))
}
