//! HTTP transport used to reach the Prefinery API.
use reqwest::{header::CONTENT_TYPE, Method, StatusCode, Url};

use crate::Result;

/// A single prepared request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL, including the `api_key` query parameter.
    pub url: Url,
    /// XML request body, if any.
    pub body: Option<String>,
}

/// A response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Status reason phrase.
    pub reason: String,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response using the canonical reason phrase for `status`.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> HttpResponse {
        HttpResponse {
            status,
            reason: reason_phrase(status),
            body: body.into(),
        }
    }
}

/// Executes requests against Prefinery.
///
/// Implementations must return `Ok` for every response that carries an HTTP status, including
/// 4xx and 5xx ones; status classification is done by the client. `Err` is reserved for failures
/// where no response was received (DNS, connection reset, timeout).
pub trait Transport {
    /// Send `request` and wait for the full response.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default [`Transport`] backed by a blocking `reqwest` client.
pub struct ReqwestTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport with default `reqwest` settings.
    pub fn new() -> ReqwestTransport {
        ReqwestTransport {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        ReqwestTransport::new()
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, request.url);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "text/xml").body(body);
        }

        // Non-2xx responses are not turned into errors here (no `error_for_status()`).
        let response = builder.send()?;
        let status = response.status();
        let body = response.bytes()?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| status.as_str().to_owned())
}
