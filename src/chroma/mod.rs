//! Razer Chroma REST client.
//!
//! [`SessionManager`] owns the session state machine (registration,
//! heartbeat, recovery and replay). It talks to the service through the
//! [`LightingTransport`] trait so the HTTP stack can be swapped for the
//! in-memory [`mock::MockTransport`] in tests.

mod http;
pub mod mock;
pub mod protocol;
mod session;

pub use http::HttpTransport;
pub use protocol::{AppDescriptor, Device, Effect};
pub use session::{SessionConfig, SessionManager, SessionStatus};

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{GlowError, Result};

/// HTTP verbs the Chroma protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Post,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to the lighting service.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaRequest {
    pub method: Method,
    pub url: String,
    /// JSON body; `None` sends an empty body.
    pub body: Option<Value>,
}

impl ChromaRequest {
    pub fn post_json(url: impl Into<String>, body: &impl Serialize) -> Result<Self> {
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            body: Some(to_value(body)?),
        })
    }

    pub fn put_json(url: impl Into<String>, body: &impl Serialize) -> Result<Self> {
        Ok(Self {
            method: Method::Put,
            url: url.into(),
            body: Some(to_value(body)?),
        })
    }

    pub fn put_empty(url: impl Into<String>) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: None,
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            body: None,
        }
    }
}

fn to_value(body: &impl Serialize) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| GlowError::Other(format!("Failed to encode request: {e}")))
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromaResponse {
    pub status: u16,
    pub body: String,
}

impl ChromaResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// 404 and 410 mean the service dropped our session.
    pub const fn is_session_gone(&self) -> bool {
        matches!(self.status, 404 | 410)
    }
}

/// Sends requests to the lighting service.
///
/// Implementations return `Ok` for any HTTP response, whatever its status,
/// and `Err` only when no response arrived: [`GlowError::ServiceUnreachable`]
/// when the connection was refused, [`GlowError::Transport`] otherwise.
pub trait LightingTransport: Send + Sync {
    fn send(&self, request: &ChromaRequest) -> Result<ChromaResponse>;
}
