use std::fs;
use std::time::Duration;

use ingest_engine::{FailureKind, FetchSettings, Fetcher, ReqwestFetcher, BROWSER_USER_AGENT};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    ingest_logging::initialize_for_tests();
}

fn entries(dir: &TempDir) -> usize {
    fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn fetcher_streams_body_to_scratch_file_with_browser_agent() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .and(header("user-agent", BROWSER_USER_AGENT))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7 body".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let scratch = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/report.pdf", server.uri());

    let download = fetcher.fetch(&url, scratch.path()).await.expect("fetch ok");
    assert_eq!(download.byte_len, 13);
    assert_eq!(download.declared_mime.as_deref(), Some("application/pdf"));
    assert_eq!(download.final_url, url);
    assert!(download.file.path().starts_with(scratch.path()));
    assert_eq!(fs::read(download.file.path()).unwrap(), b"%PDF-1.7 body");

    drop(download);
    assert_eq!(entries(&scratch), 0, "scratch file must be removed on drop");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let scratch = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/missing", server.uri());

    let err = fetcher.fetch(&url, scratch.path()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(entries(&scratch), 0);
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let scratch = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/slow", server.uri());

    let err = fetcher.fetch(&url, scratch.path()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/octet-stream")
                .set_body_bytes(b"01234567890".to_vec()),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: Some(10),
        ..FetchSettings::default()
    };
    let scratch = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/large", server.uri());

    let err = fetcher.fetch(&url, scratch.path()).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
    assert_eq!(entries(&scratch), 0, "partial download must not survive");
}

#[tokio::test]
async fn fetcher_rejects_non_http_urls() {
    let scratch = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());

    let err = fetcher.fetch("not a url", scratch.path()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
    let err = fetcher
        .fetch("ftp://example.com/file.pdf", scratch.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn fetcher_reports_connection_errors() {
    let scratch = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());

    let err = fetcher
        .fetch("http://127.0.0.1:1/unreachable", scratch.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
}
