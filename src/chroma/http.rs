//! Blocking HTTP transport backed by `reqwest`.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::trace;

use super::{ChromaRequest, ChromaResponse, LightingTransport, Method};
use crate::error::{GlowError, Result};

/// Talks to the real Chroma REST service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client whose connect and overall request timeouts are `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .http1_only()
            .build()
            .map_err(|e| GlowError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl LightingTransport for HttpTransport {
    fn send(&self, request: &ChromaRequest) -> Result<ChromaResponse> {
        let builder = match request.method {
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder.body(""),
        };

        let response = builder.send().map_err(|e| classify(&request.url, &e))?;
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        trace!(method = %request.method, url = %request.url, status, "Chroma request done");
        Ok(ChromaResponse::new(status, body))
    }
}

fn classify(url: &str, err: &reqwest::Error) -> GlowError {
    if err.is_connect() {
        GlowError::ServiceUnreachable {
            url: url.to_string(),
        }
    } else if err.is_timeout() {
        GlowError::Transport(format!("Request to {url} timed out"))
    } else {
        GlowError::Transport(err.to_string())
    }
}
