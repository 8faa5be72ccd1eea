//! The seam between the client and the network.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::error::TransportError;

/// Sends one fully signed request and returns the buffered response.
///
/// The client signs immediately before calling [`Transport::send`], so an
/// implementation must not alter headers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and buffer the response body.
    async fn send(&self, request: http::Request<Bytes>)
    -> Result<http::Response<Bytes>, TransportError>;
}

/// Plain-HTTP transport over hyper, for local endpoints such as emulators.
/// HTTPS endpoints need a TLS-capable [`Transport`].
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Option<Duration>,
}

impl HyperTransport {
    /// A transport without a request timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            timeout: None,
        }
    }

    /// Fail requests that take longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        let pending = self.client.request(request.map(Full::new));
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending)
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => pending.await,
        };
        let response = result.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Other(e.into())
            }
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TransportError::Other(e.into()))?
            .to_bytes();
        Ok(http::Response::from_parts(parts, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_report_refused_connection_as_retryable() {
        // port 9 (discard) is not expected to accept connections on loopback
        let transport = HyperTransport::new().with_timeout(Duration::from_secs(5));
        let mut request = http::Request::new(Bytes::from_static(b"{}"));
        *request.uri_mut() = http::Uri::from_static("http://127.0.0.1:9/");
        let err = transport.send(request).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
