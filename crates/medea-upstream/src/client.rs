//! Pooled HTTP/1 client with a per-call deadline.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tracing::debug;

/// Failure to complete an upstream call. The remote status code is not an
/// error; any response that arrives in time is returned as-is.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream request to {uri}: {reason}")]
    InvalidRequest { uri: String, reason: String },

    #[error("upstream {uri} unreachable: {reason}")]
    Connect { uri: String, reason: String },

    #[error("upstream {uri} did not answer within {timeout:?}")]
    Timeout { uri: String, timeout: Duration },

    #[error("failed to read body from {uri}: {reason}")]
    Body { uri: String, reason: String },
}

/// An outbound request with a fully buffered body.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// POST with `content-type: application/json`.
    pub fn post_json(uri: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, uri)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Copy a header only when the caller supplied one.
    pub fn header_opt(self, name: HeaderName, value: Option<&HeaderValue>) -> Self {
        match value {
            Some(value) => self.header(name, value.clone()),
            None => self,
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A complete upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }
}

/// Shared outbound client. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Self {
        let inner = Client::builder(TokioExecutor::new()).build_http();
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request and buffer the response, all within the timeout.
    pub async fn send(&self, req: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let uri = req.uri.clone();
        let method = req.method.clone();

        let mut request = http::Request::builder()
            .method(req.method)
            .uri(req.uri.as_str())
            .body(Full::new(req.body))
            .map_err(|e| UpstreamError::InvalidRequest {
                uri: uri.clone(),
                reason: e.to_string(),
            })?;
        *request.headers_mut() = req.headers;

        let inner = self.inner.clone();
        let call_uri = uri.clone();
        let call = async move {
            let resp = inner
                .request(request)
                .await
                .map_err(|e| UpstreamError::Connect {
                    uri: call_uri.clone(),
                    reason: e.to_string(),
                })?;
            let (parts, body) = resp.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| UpstreamError::Body {
                    uri: call_uri.clone(),
                    reason: e.to_string(),
                })?
                .to_bytes();
            Ok(UpstreamResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(resp)) => {
                debug!(%method, %uri, status = %resp.status, bytes = resp.body.len(), "upstream call");
                Ok(resp)
            }
            Ok(Err(e)) => {
                debug!(%method, %uri, error = %e, "upstream call failed");
                Err(e)
            }
            Err(_) => {
                debug!(%method, %uri, "upstream call timed out");
                Err(UpstreamError::Timeout {
                    uri,
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Router;
    use axum::routing::{get, post};

    use super::*;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn relays_status_headers_and_body() {
        let router = Router::new().route(
            "/echo",
            post(|headers: HeaderMap, body: Bytes| async move {
                let token = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                (
                    StatusCode::CREATED,
                    [("content-type", "text/plain")],
                    format!("{token}:{}", String::from_utf8_lossy(&body)),
                )
            }),
        );
        let addr = spawn(router).await;

        let client = UpstreamClient::new(Duration::from_secs(5));
        let req = UpstreamRequest::post_json(format!("http://{addr}/echo"), "{}").header(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("secret"),
        );
        let resp = client.send(req).await.unwrap();

        assert_eq!(resp.status, StatusCode::CREATED);
        assert!(resp.is_success());
        assert_eq!(resp.content_type().unwrap(), "text/plain");
        assert_eq!(resp.body, Bytes::from("secret:{}"));
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let router = Router::new().route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );
        let addr = spawn(router).await;

        let client = UpstreamClient::new(Duration::from_secs(5));
        let resp = client
            .send(UpstreamRequest::get(format!("http://{addr}/missing")))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn connection_refused_is_connect_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::new(Duration::from_secs(5));
        let err = client
            .send(UpstreamRequest::get(format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Connect { .. }));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = spawn(router).await;

        let client = UpstreamClient::new(Duration::from_millis(100));
        let err = client
            .send(UpstreamRequest::get(format!("http://{addr}/slow")))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout { .. }));
    }

    #[tokio::test]
    async fn malformed_uri_is_rejected_before_sending() {
        let client = UpstreamClient::new(Duration::from_secs(1));
        let err = client
            .send(UpstreamRequest::get("not a uri"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidRequest { .. }));
    }
}
