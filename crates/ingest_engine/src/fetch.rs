use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use ingest_logging::ingest_debug;
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::{Download, FailureKind, FetchError};

/// Some servers refuse requests from non-browser clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.6778.33 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Overall bound for the classification probe.
    pub probe_timeout: Duration,
    /// How much of the body the classifier inspects for an `<html` marker.
    pub probe_bytes: usize,
    pub redirect_limit: usize,
    pub max_bytes: Option<u64>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            probe_bytes: 1024,
            redirect_limit: 5,
            max_bytes: Some(100 * 1024 * 1024),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Streams a non-HTML response body into a scratch file.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, scratch_dir: &Path) -> Result<Download, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, scratch_dir: &Path) -> Result<Download, FetchError> {
        let parsed = parse_http_url(url)?;
        let client = build_client(&self.settings, self.settings.request_timeout)?;

        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let (Some(max_bytes), Some(content_len)) =
            (self.settings.max_bytes, response.content_length())
        {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let declared_mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        // Dropping `file` on any early return below deletes the partial download.
        let file = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(scratch_dir)
            .map_err(io_error)?;
        let handle = file.as_file().try_clone().map_err(io_error)?;
        let mut out = tokio::fs::File::from_std(handle);

        let mut byte_len: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            byte_len += chunk.len() as u64;
            if let Some(max_bytes) = self.settings.max_bytes {
                if byte_len > max_bytes {
                    return Err(FetchError::new(
                        FailureKind::TooLarge {
                            max_bytes,
                            actual: Some(byte_len),
                        },
                        "response too large",
                    ));
                }
            }
            out.write_all(&chunk).await.map_err(io_error)?;
        }
        out.flush().await.map_err(io_error)?;
        out.sync_all().await.map_err(io_error)?;

        ingest_debug!("Streamed {} bytes from {} to {:?}", byte_len, url, file.path());

        Ok(Download {
            file,
            declared_mime,
            final_url,
            byte_len,
        })
    }
}

pub(crate) fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed =
        Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::new(
            FailureKind::InvalidUrl,
            format!("unsupported scheme {other}"),
        )),
    }
}

pub(crate) fn build_client(
    settings: &FetchSettings,
    timeout: Duration,
) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .connect_timeout(settings.connect_timeout)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

pub(crate) fn io_error(err: std::io::Error) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}
