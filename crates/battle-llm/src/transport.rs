use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::warn;

use battle_core::errors::GatewayError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client shared by every provider adapter.
pub(crate) fn build_client() -> Result<Client, GatewayError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Send a streaming request and map transport and status failures.
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, GatewayError> {
    let resp = request
        .send()
        .await
        .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "provider returned error status");
    Err(GatewayError::from_response_parts(
        status.as_u16(),
        retry_after.as_deref(),
        body,
    ))
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// One-shot HTTP server for adapter tests: answers the first request with
/// `status` and `body`, then closes. Returns the base URL and a handle
/// resolving to the raw request text.
#[cfg(test)]
pub(crate) async fn serve_once(
    status: u16,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            if n == 0 || request_complete(&raw) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status} X\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).into_owned()
    });

    (format!("http://{addr}"), handle)
}

#[cfg(test)]
fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    body.len() >= length
}
