//! Discovery over remote entry scripts.

use crate::config::DiscoveryConfig;
use crate::discoverer::discover_chunks;
use crate::error::{DiscoveryError, Result};
use crate::types::ChunkPath;
use reqwest::Client;
use std::collections::BTreeSet;

/// Fetch an entry script body. Non-success statuses are errors.
pub async fn fetch_source(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.text().await?)
}

/// Fetch `url` and discover its chunks.
///
/// Fetch failures are logged and give an empty set. Discovery itself runs on
/// the blocking pool since sandboxed evaluation is synchronous.
pub async fn discover_chunks_from_url(
    client: &Client,
    url: &str,
    config: &DiscoveryConfig,
) -> BTreeSet<ChunkPath> {
    let source = match fetch_source(client, url).await {
        Ok(source) => source,
        Err(err) => {
            log::warn!("Failed to fetch {url}: {err}");
            return BTreeSet::new();
        }
    };
    log::debug!("Fetched {} bytes from {url}", source.len());

    let config = config.clone();
    match tokio::task::spawn_blocking(move || discover_chunks(&source, &config)).await {
        Ok(chunks) => chunks,
        Err(err) => {
            log::warn!("Discovery task for {url} failed: {err}");
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the URL to request
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{addr}/main.js")
    }

    #[tokio::test]
    async fn test_discovers_from_served_script() {
        let url = serve_once(
            "200 OK",
            r#"self.__BUILD_MANIFEST = { "/": ["static/chunks/a.js"] };"#,
        )
        .await;
        let chunks = discover_chunks_from_url(&Client::new(), &url, &DiscoveryConfig::new(10)).await;
        let paths: Vec<&str> = chunks.iter().map(ChunkPath::as_str).collect();
        assert_eq!(paths, vec!["static/chunks/a.js"]);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let url = serve_once("404 Not Found", "missing").await;
        let err = fetch_source(&Client::new(), &url).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/main.js");
        let chunks = discover_chunks_from_url(&Client::new(), &url, &DiscoveryConfig::new(10)).await;
        assert!(chunks.is_empty());
    }
}
