//! Minimal HTTP/1 transport shared by the registry and pager clients.
//!
//! One connection per request, driven by hyper's low-level client API.
//! Every request is bounded by the configured timeout so a hung dependency
//! cannot stall the poll loop.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

const AGENT: &str = concat!("pagewatch/", env!("CARGO_PKG_VERSION"));

/// Cap on a buffered response body. Large catalogs stay well below this.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// A fully buffered response.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
pub(crate) struct HttpClient {
    tls: TlsConnector,
    timeout: Duration,
    max_body: usize,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            timeout,
            max_body: MAX_BODY_BYTES,
        })
    }

    #[cfg(test)]
    fn with_body_limit(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    pub async fn get(&self, url: &str) -> ClientResult<HttpResponse> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post_json(&self, url: &str, body: Vec<u8>) -> ClientResult<HttpResponse> {
        self.send(Method::POST, url, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> ClientResult<HttpResponse> {
        let target = Target::parse(url)?;

        match tokio::time::timeout(self.timeout, self.exchange(method, &target, body)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%url, "request timed out");
                Err(ClientError::Timeout(self.timeout))
            }
        }
    }

    async fn exchange(
        &self,
        method: Method,
        target: &Target,
        body: Option<Vec<u8>>,
    ) -> ClientResult<HttpResponse> {
        let addr = target.addr();
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut builder = Request::builder()
            .method(method)
            .uri(target.path_and_query.as_str())
            .header(HOST, target.host_header())
            .header(USER_AGENT, AGENT);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder.body(Full::new(Bytes::from(body.unwrap_or_default())))?;

        if target.tls {
            let server_name = ServerName::try_from(target.host.clone())
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            let stream = self
                .tls
                .connect(server_name, tcp)
                .await
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            round_trip(stream, req, self.max_body).await
        } else {
            round_trip(tcp, req, self.max_body).await
        }
    }
}

async fn round_trip<S>(
    stream: S,
    req: Request<Full<Bytes>>,
    max_body: usize,
) -> ClientResult<HttpResponse>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "http connection closed with error");
        }
    });

    let resp = sender.send_request(req).await?;
    let status = resp.status();
    let body = Limited::new(resp.into_body(), max_body)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                return ClientError::BodyTooLarge { limit: max_body };
            }
            match e.downcast::<hyper::Error>() {
                Ok(e) => ClientError::Http(*e),
                Err(e) => ClientError::Body(e.to_string()),
            }
        })?
        .to_bytes();

    Ok(HttpResponse { status, body })
}

/// Where a request goes, split out of its URL.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    tls: bool,
    host: String,
    port: u16,
    path_and_query: String,
}

impl Target {
    fn parse(url: &str) -> ClientResult<Self> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        let tls = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        };
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();
        let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .filter(|pq| !pq.is_empty())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            tls,
            host,
            port,
            path_and_query,
        })
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn host_header(&self) -> String {
        let default_port = if self.tls { 443 } else { 80 };
        if self.port == default_port {
            self.host.clone()
        } else {
            self.addr()
        }
    }
}

/// Percent-encode a single URL path segment.
pub(crate) fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_http_url_with_port() {
        let target = Target::parse("http://localhost:8500/v1/catalog/services").unwrap();
        assert_eq!(
            target,
            Target {
                tls: false,
                host: "localhost".to_string(),
                port: 8500,
                path_and_query: "/v1/catalog/services".to_string(),
            }
        );
        assert_eq!(target.host_header(), "localhost:8500");
    }

    #[test]
    fn target_defaults_https_port() {
        let target = Target::parse("https://events.pagerduty.com/generic/create_event.json").unwrap();
        assert!(target.tls);
        assert_eq!(target.port, 443);
        assert_eq!(target.addr(), "events.pagerduty.com:443");
        assert_eq!(target.host_header(), "events.pagerduty.com");
    }

    #[test]
    fn target_keeps_query_string() {
        let target = Target::parse("http://consul/v1/health/checks/api?dc=eu").unwrap();
        assert_eq!(target.path_and_query, "/v1/health/checks/api?dc=eu");
        assert_eq!(target.port, 80);
    }

    #[test]
    fn target_rejects_bad_scheme_and_missing_host() {
        assert!(matches!(
            Target::parse("ftp://example.com/x"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Target::parse("/just/a/path"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_path_segment("web-api_v1.2~x"), "web-api_v1.2~x");
        assert_eq!(encode_path_segment("my service/α"), "my%20service%2F%CE%B1");
    }

    #[tokio::test]
    async fn closed_port_is_a_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(Duration::from_secs(1)).unwrap();
        let err = client.get(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = HttpClient::new(Duration::from_millis(100)).unwrap();
        let err = client.get(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)), "got {err:?}");
    }

    /// Serves one canned HTTP/1.1 response with a `len`-byte body.
    async fn serve_body(len: usize) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let head = format!("HTTP/1.1 200 OK\r\ncontent-length: {len}\r\n\r\n");
            socket.write_all(head.as_bytes()).await.unwrap();
            let _ = socket.write_all(&vec![b'x'; len]).await;
        });
        addr
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let addr = serve_body(4096).await;
        let client = HttpClient::new(Duration::from_secs(1))
            .unwrap()
            .with_body_limit(1024);
        let err = client.get(&format!("http://{addr}/")).await.unwrap_err();
        assert!(
            matches!(err, ClientError::BodyTooLarge { limit: 1024 }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn body_within_limit_is_returned() {
        let addr = serve_body(1024).await;
        let client = HttpClient::new(Duration::from_secs(1))
            .unwrap()
            .with_body_limit(1024);
        let resp = client.get(&format!("http://{addr}/")).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body.len(), 1024);
    }
}
