use std::time::Duration;

use reqwest::{header::HeaderMap, Method, StatusCode, Url};

use crate::{PostgrestError, Result};

/// One fully resolved outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

/// Status and raw body of one response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends one HTTP request and returns its response.
///
/// Connection reuse and TLS are the implementation's concern. Errors should be
/// reported as [`PostgrestError::Transport`].
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        // On WASM, reqwest uses AbortController for the timeout.
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| PostgrestError::Transport(Box::new(err)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PostgrestError::Transport(Box::new(err)))?;

        Ok(HttpResponse { status, body })
    }
}
