//! Mock server helpers for manifest and artifact endpoints

use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// Serve `document` at [`MANIFEST_PATH`] for both HEAD and GET
pub async fn mock_manifest(server: &MockServer, document: &str) {
    Mock::given(method("HEAD"))
        .and(path(MANIFEST_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(MANIFEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(document),
        )
        .mount(server)
        .await;
}

/// Serve `document` after a delay
pub async fn mock_slow_manifest(server: &MockServer, document: &str, delay: Duration) {
    Mock::given(method("HEAD"))
        .and(path(MANIFEST_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(MANIFEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(document).set_delay(delay))
        .mount(server)
        .await;
}

/// Serve the artifact at [`ARTIFACT_PATH`], expecting exactly `calls` downloads
pub async fn mock_artifact(server: &MockServer, content: &[u8], calls: u64) {
    Mock::given(method("GET"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .expect(calls)
        .mount(server)
        .await;
}

/// Serve the artifact after a delay
pub async fn mock_slow_artifact(server: &MockServer, content: &[u8], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content).set_delay(delay))
        .mount(server)
        .await;
}

/// Respond to every request on `route` with `status`
pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn manifest_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{}", server.uri(), MANIFEST_PATH)).unwrap()
}

pub fn artifact_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{}", server.uri(), ARTIFACT_PATH)).unwrap()
}

/// URL on a local port nobody listens on
pub async fn unreachable_url() -> Url {
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    Url::parse(&format!("http://127.0.0.1:{}{}", port, MANIFEST_PATH)).unwrap()
}

/// Raw HTTP server that announces `total_len` bytes, sends `first_chunk`
/// and then holds the connection open without sending the rest
pub async fn stalled_artifact_server(
    first_chunk: &'static [u8],
    total_len: usize,
) -> (Url, tokio::task::JoinHandle<()>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
            total_len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(first_chunk).await.unwrap();
        socket.flush().await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let url = Url::parse(&format!("http://127.0.0.1:{}{}", port, ARTIFACT_PATH)).unwrap();
    (url, handle)
}
