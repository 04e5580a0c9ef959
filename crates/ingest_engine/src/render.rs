use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures_util::StreamExt;
use ingest_logging::{ingest_debug, ingest_warn};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::fetch::{io_error, parse_http_url};
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Bound on navigation up to the page's load event.
    pub navigation_timeout: Duration,
    /// Extra wait after load for deferred client-side rendering.
    pub settle_delay: Duration,
    pub launch_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            launch_timeout: Duration::from_secs(20),
            chrome_executable: None,
            extra_args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--no-first-run".to_string(),
            ],
        }
    }
}

/// Produces the client-rendered DOM of a page as an HTML string.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;
}

/// Renders each URL in its own headless Chromium with a throw-away profile,
/// so no cookies or storage leak between concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    settings: RenderSettings,
}

impl ChromeRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let parsed = parse_http_url(url)?;
        let session = BrowserSession::launch(&self.settings).await?;
        let result = session.capture(parsed.as_str(), &self.settings).await;
        session.close(url).await;
        if result.is_ok() {
            ingest_debug!("Rendered {}", url);
        }
        result
    }
}

/// A launched browser plus the task driving its CDP connection.
///
/// `close` is the normal exit. If a session is dropped without it (panic or
/// cancelled future), `Drop` stops the handler task and chromiumoxide's own
/// `Drop` kills the child process.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl BrowserSession {
    async fn launch(settings: &RenderSettings) -> Result<Self, FetchError> {
        let profile = tempfile::Builder::new()
            .prefix("ingest-chrome-")
            .tempdir()
            .map_err(io_error)?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .launch_timeout(settings.launch_timeout)
            .request_timeout(settings.navigation_timeout)
            .args(settings.extra_args.iter().cloned());
        if let Some(executable) = &settings.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Render, err))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp_error)?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    async fn capture(&self, url: &str, settings: &RenderSettings) -> Result<String, FetchError> {
        let page = self.browser.new_page("about:blank").await.map_err(cdp_error)?;

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };
        match tokio::time::timeout(settings.navigation_timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(cdp_error(err)),
            Err(_) => {
                return Err(FetchError::new(
                    FailureKind::Timeout,
                    format!("navigation exceeded {:?}", settings.navigation_timeout),
                ))
            }
        }

        tokio::time::sleep(settings.settle_delay).await;
        page.content().await.map_err(cdp_error)
    }

    async fn close(mut self, url: &str) {
        if let Err(err) = self.browser.close().await {
            ingest_warn!("Failed to close browser for {}: {}", url, err);
        }
        if let Err(err) = self.browser.wait().await {
            ingest_debug!("Browser process for {} did not exit cleanly: {}", url, err);
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn cdp_error(err: CdpError) -> FetchError {
    match err {
        CdpError::Timeout => FetchError::new(FailureKind::Timeout, "browser request timed out"),
        other => FetchError::new(FailureKind::Render, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdp_timeouts_map_to_timeout_and_the_rest_to_render() {
        assert_eq!(cdp_error(CdpError::Timeout).kind, FailureKind::Timeout);
        assert_eq!(cdp_error(CdpError::NotFound).kind, FailureKind::Render);
    }
}
