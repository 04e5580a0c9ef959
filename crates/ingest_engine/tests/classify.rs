use ingest_engine::{ContentClassifier, ContentKind, FetchSettings, HttpProbeClassifier};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn classify(server: &MockServer, route: &str) -> ContentKind {
    let classifier = HttpProbeClassifier::new(FetchSettings::default());
    classifier
        .classify(&format!("{}{}", server.uri(), route))
        .await
}

#[tokio::test]
async fn html_content_type_header_classifies_as_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("no markup at all", "Text/HTML; charset=utf-8"),
        )
        .mount(&server)
        .await;

    assert_eq!(classify(&server, "/page").await, ContentKind::Html);
}

#[tokio::test]
async fn html_marker_in_first_kilobyte_classifies_as_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/untyped"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"<!doctype html>\n<HTML><body>hi</body></HTML>".to_vec()),
        )
        .mount(&server)
        .await;

    assert_eq!(classify(&server, "/untyped").await, ContentKind::Html);
}

#[tokio::test]
async fn marker_beyond_probe_window_is_ignored() {
    let server = MockServer::start().await;
    let mut body = vec![b'x'; 2048];
    body.extend_from_slice(b"<html>");
    Mock::given(method("GET"))
        .and(path("/late"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/octet-stream"))
        .mount(&server)
        .await;

    assert_eq!(classify(&server, "/late").await, ContentKind::Other);
}

#[tokio::test]
async fn binary_content_classifies_as_other() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4\n%...".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    assert_eq!(classify(&server, "/doc.pdf").await, ContentKind::Other);
}

#[tokio::test]
async fn network_errors_fail_open_to_other() {
    let classifier = HttpProbeClassifier::new(FetchSettings::default());
    assert_eq!(
        classifier.classify("http://127.0.0.1:1/down").await,
        ContentKind::Other
    );
    assert_eq!(classifier.classify("not a url").await, ContentKind::Other);
}
