//! In-memory Chroma service for tests.
//!
//! [`MockTransport`] behaves like a minimal Chroma REST service: it hands
//! out session URIs, accepts heartbeats and effects for the live session and
//! answers 404 for anything else. Tests can expire the session, make the
//! service unreachable, inject transport failures and mark devices as
//! unsupported, then assert on what was sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use glow::chroma::mock::{MockTransport, Operation};
//! use glow::chroma::{SessionConfig, SessionManager};
//!
//! let mock = Arc::new(MockTransport::new());
//! let config = SessionConfig::default().with_register_url(mock.register_url());
//! let session = SessionManager::new(mock.clone(), config).unwrap();
//! session.push_frame(&ColorMatrix::empty()).unwrap();
//! mock.assert_contains(&Operation::Keyboard { session: 1, matrix: ColorMatrix::empty() });
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};
use tracing::{debug, trace};

use super::protocol::Device;
use super::{ChromaRequest, ChromaResponse, LightingTransport, Method};
use crate::color::Bgr;
use crate::error::{GlowError, Result};
use crate::matrix::ColorMatrix;

const HOST: &str = "http://mock.chroma";

/// An accepted request, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Register { session: u64 },
    Heartbeat { session: u64 },
    Keyboard { session: u64, matrix: ColorMatrix },
    Static { session: u64, device: Device, color: Bgr },
    CloseSession { session: u64 },
}

/// Every request seen, including rejected and failed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: Method,
    pub url: String,
    /// `None` when the request failed without a response.
    pub status: Option<u16>,
}

#[derive(Debug)]
struct MockState {
    next_session: u64,
    live_session: Option<u64>,
    gone_status: u16,
    unreachable: bool,
    fail_next: usize,
    registration_status: Option<u16>,
    unsupported: HashSet<Device>,
    operations: Vec<Operation>,
    requests: Vec<RequestRecord>,
}

/// Fake lighting service.
#[derive(Debug)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_session: 1,
                live_session: None,
                gone_status: 404,
                unreachable: false,
                fail_next: 0,
                registration_status: None,
                unsupported: HashSet::new(),
                operations: Vec::new(),
                requests: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// URL to register sessions at.
    pub fn register_url(&self) -> String {
        format!("{HOST}/razer/chromasdk")
    }

    /// Base URI of session `id`.
    pub fn session_uri(id: u64) -> String {
        format!("{HOST}/sessions/{id}")
    }

    // === Behavior control ===

    /// Drop the live session; later requests to it get 404.
    pub fn expire_session(&self) {
        self.expire_session_with(404);
    }

    /// Drop the live session; later requests to it get `status`.
    pub fn expire_session_with(&self, status: u16) {
        let mut state = self.lock();
        debug!(session = ?state.live_session, status, "Mock expiring session");
        state.live_session = None;
        state.gone_status = status;
    }

    /// Refuse every connection while `true`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Fail the next `count` requests with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_next = count;
    }

    /// Answer registrations with `status` instead of success.
    pub fn set_registration_status(&self, status: Option<u16>) {
        self.lock().registration_status = status;
    }

    /// Reject static effects for `device` with 400.
    pub fn mark_unsupported(&self, device: Device) {
        self.lock().unsupported.insert(device);
    }

    // === Inspection ===

    pub fn live_session(&self) -> Option<u64> {
        self.lock().live_session
    }

    /// Accepted operations, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// All requests, in order.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.lock().requests.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.lock();
        state.operations.clear();
        state.requests.clear();
    }

    pub fn register_count(&self) -> usize {
        self.count(|op| matches!(op, Operation::Register { .. }))
    }

    pub fn heartbeat_count(&self) -> usize {
        self.count(|op| matches!(op, Operation::Heartbeat { .. }))
    }

    pub fn count(&self, pred: impl Fn(&Operation) -> bool) -> usize {
        self.lock().operations.iter().filter(|op| pred(op)).count()
    }

    /// Frames accepted by the keyboard endpoint, in order.
    pub fn keyboard_frames(&self) -> Vec<ColorMatrix> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::Keyboard { matrix, .. } => Some(matrix.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_keyboard_frame(&self) -> Option<ColorMatrix> {
        self.keyboard_frames().pop()
    }

    /// Static colors accepted for `device`, in order.
    pub fn static_colors(&self, device: Device) -> Vec<Bgr> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::Static { device: d, color, .. } if *d == device => Some(*color),
                _ => None,
            })
            .collect()
    }

    /// Assert a specific operation was accepted at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    // === Service emulation ===

    fn handle(state: &mut MockState, register_url: &str, request: &ChromaRequest) -> ChromaResponse {
        if request.method == Method::Post && request.url == register_url {
            if let Some(status) = state.registration_status {
                return ChromaResponse::new(status, "registration refused");
            }
            let id = state.next_session;
            state.next_session += 1;
            state.live_session = Some(id);
            state.operations.push(Operation::Register { session: id });
            let body = json!({ "sessionid": id, "uri": Self::session_uri(id) });
            return ChromaResponse::new(200, body.to_string());
        }

        let Some(rest) = request.url.strip_prefix(&format!("{HOST}/sessions/")) else {
            return ChromaResponse::new(404, "no such route");
        };
        let (id, segment) = match rest.split_once('/') {
            Some((id, segment)) => (id, Some(segment)),
            None => (rest, None),
        };
        let Ok(id) = id.parse::<u64>() else {
            return ChromaResponse::new(404, "no such session");
        };
        if state.live_session != Some(id) {
            return ChromaResponse::new(state.gone_status, "session gone");
        }

        let op = match (request.method, segment) {
            (Method::Delete, None) => {
                state.live_session = None;
                Operation::CloseSession { session: id }
            }
            (Method::Put, Some("heartbeat")) => Operation::Heartbeat { session: id },
            (Method::Put, Some("keyboard")) => {
                match decode_matrix(request.body.as_ref()) {
                    Some(matrix) => Operation::Keyboard { session: id, matrix },
                    None => return ChromaResponse::new(400, "bad keyboard effect"),
                }
            }
            (Method::Put, Some(segment)) => {
                let Some(device) = Device::SECONDARY.into_iter().find(|d| d.as_str() == segment)
                else {
                    return ChromaResponse::new(404, "unknown device");
                };
                if state.unsupported.contains(&device) {
                    return ChromaResponse::new(400, "effect not supported");
                }
                match decode_static(request.body.as_ref()) {
                    Some(color) => Operation::Static { session: id, device, color },
                    None => return ChromaResponse::new(400, "bad static effect"),
                }
            }
            _ => return ChromaResponse::new(405, "method not allowed"),
        };

        state.operations.push(op);
        ChromaResponse::new(200, r#"{"result":0}"#)
    }
}

impl LightingTransport for MockTransport {
    fn send(&self, request: &ChromaRequest) -> Result<ChromaResponse> {
        let register_url = self.register_url();
        let mut state = self.lock();

        let outcome = if state.unreachable {
            Err(GlowError::ServiceUnreachable {
                url: request.url.clone(),
            })
        } else if state.fail_next > 0 {
            state.fail_next -= 1;
            Err(GlowError::Transport("injected transport failure".to_string()))
        } else {
            Ok(Self::handle(&mut state, &register_url, request))
        };

        let status = outcome.as_ref().ok().map(|r| r.status);
        trace!(method = %request.method, url = %request.url, ?status, "Mock request");
        state.requests.push(RequestRecord {
            method: request.method,
            url: request.url.clone(),
            status,
        });
        outcome
    }
}

fn decode_matrix(body: Option<&Value>) -> Option<ColorMatrix> {
    let body = body?;
    if body.get("effect")? != "CHROMA_CUSTOM" {
        return None;
    }
    serde_json::from_value(body.get("param")?.clone()).ok()
}

fn decode_static(body: Option<&Value>) -> Option<Bgr> {
    let body = body?;
    if body.get("effect")? != "CHROMA_STATIC" {
        return None;
    }
    let color = body.get("param")?.get("color")?.as_u64()?;
    Some(Bgr(u32::try_from(color).ok()?))
}
