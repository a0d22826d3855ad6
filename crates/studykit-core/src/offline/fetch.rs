use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use tracing::debug;

use super::request::{cache_key, FetchRequest, Response, ResponseKind};
use super::FetchError;

/// Network access for the cache manager.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError>;
}

/// `reqwest`-backed fetcher.
///
/// Responses from the scope's origin are classified `basic`, everything
/// else `cors`. Clone is cheap; the client shares its connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    scope: Url,
}

impl HttpFetcher {
    pub fn new(scope: Url, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, scope))
    }

    /// Use an already configured client (proxy settings, TLS roots...).
    pub fn with_client(client: Client, scope: Url) -> Self {
        Self { client, scope }
    }

    fn classify(&self, url: &Url) -> ResponseKind {
        if url.origin() == self.scope.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        }
    }
}

/// The response came from somewhere other than the requested URL.
/// Fragments never reach the server, so they do not count.
fn was_redirected(requested: &Url, final_url: &Url) -> bool {
    cache_key(requested) != cache_key(final_url)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Fetched");

        Ok(Response {
            redirected: was_redirected(&request.url, &final_url),
            kind: self.classify(&final_url),
            url: final_url.to_string(),
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_by_scope_origin() {
        let fetcher = HttpFetcher::new(url("https://study.example/app/"), None).unwrap();
        assert_eq!(
            fetcher.classify(&url("https://study.example/style.css")),
            ResponseKind::Basic
        );
        assert_eq!(
            fetcher.classify(&url("http://study.example/style.css")),
            ResponseKind::Cors
        );
        assert_eq!(
            fetcher.classify(&url("https://cdnjs.cloudflare.com/x.css")),
            ResponseKind::Cors
        );
    }

    #[test]
    fn test_was_redirected() {
        let requested = url("https://study.example/app.js");
        assert!(!was_redirected(&requested, &url("https://study.example/app.js")));
        assert!(!was_redirected(&url("https://study.example/app.js#top"), &requested));
        assert!(was_redirected(&requested, &url("https://study.example/app.v2.js")));
        assert!(was_redirected(&requested, &url("https://study.example/app.js?v=2")));
    }

    /// Minimal HTTP/1.1 server: `/old` redirects to `/new`, everything
    /// else answers 200 with a stylesheet body.
    async fn serve_local() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&request);
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let reply = if path == "/old" {
                        "HTTP/1.1 302 Found\r\nLocation: /new\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    } else {
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/css\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            path.len(),
                            path
                        )
                    };
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        url(&format!("http://{}/", addr))
    }

    fn local_fetcher(scope: Url) -> HttpFetcher {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpFetcher::with_client(client, scope)
    }

    #[tokio::test]
    async fn test_fetch_same_origin_is_basic() {
        let scope = serve_local().await;
        let fetcher = local_fetcher(scope.clone());

        let response = fetcher
            .fetch(&FetchRequest::get(scope.join("style.css").unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.kind, ResponseKind::Basic);
        assert!(!response.redirected);
        assert_eq!(response.content_type.as_deref(), Some("text/css"));
        assert_eq!(response.body, b"/style.css");
        assert!(response.is_runtime_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect_and_flags_it() {
        let scope = serve_local().await;
        let fetcher = local_fetcher(scope.clone());

        let response = fetcher
            .fetch(&FetchRequest::get(scope.join("old").unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(response.redirected);
        assert_eq!(response.url, scope.join("new").unwrap().as_str());
        assert!(!response.is_runtime_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_other_origin_is_cors() {
        let server = serve_local().await;
        // Same host, different port: a different origin
        let fetcher = local_fetcher(url("http://127.0.0.1:1/"));

        let response = fetcher
            .fetch(&FetchRequest::get(server.join("font.css").unwrap()))
            .await
            .unwrap();
        assert_eq!(response.kind, ResponseKind::Cors);
        assert!(!response.is_runtime_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = url(&format!("http://{}/app.js", addr));
        let fetcher = local_fetcher(target.clone());
        let result = fetcher.fetch(&FetchRequest::get(target)).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
