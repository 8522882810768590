//! Chroma session lifecycle.
//!
//! A session moves `Unregistered → Registered → Lost → Registered`. The
//! service forgets sessions that miss heartbeats or when Synapse restarts;
//! any 404/410 puts us in `Lost`, we register again and replay the last
//! keyboard frame so the keys come back without waiting for the next
//! snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::protocol::{AppDescriptor, Device, Effect, RegisterResponse};
use super::{ChromaRequest, ChromaResponse, LightingTransport};
use crate::color::Bgr;
use crate::config::ServiceSettings;
use crate::error::{GlowError, Result};
use crate::matrix::ColorMatrix;
use crate::scheduler::Ticker;

/// Where and how often to talk to the service.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub register_url: String,
    pub descriptor: AppDescriptor,
    pub heartbeat_interval: Duration,
}

impl SessionConfig {
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self {
            register_url: settings.register_url.clone(),
            descriptor: AppDescriptor::from_settings(settings),
            heartbeat_interval: settings.heartbeat_interval(),
        }
    }

    #[must_use]
    pub fn with_register_url(mut self, url: impl Into<String>) -> Self {
        self.register_url = url.into();
        self
    }

    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&ServiceSettings::default())
    }
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unregistered,
    Registered,
    Lost,
    Closed,
}

impl SessionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Lost => "lost",
            Self::Closed => "closed",
        }
    }
}

/// A registered session and the endpoints derived from its URI.
#[derive(Debug, Clone)]
struct Session {
    base_uri: String,
    heartbeat_url: String,
    endpoints: BTreeMap<Device, String>,
}

impl Session {
    fn new(uri: &str) -> Self {
        let base_uri = uri.trim_end_matches('/').to_string();
        let endpoints = Device::ALL
            .into_iter()
            .map(|device| (device, format!("{base_uri}/{device}")))
            .collect();
        Self {
            heartbeat_url: format!("{base_uri}/heartbeat"),
            base_uri,
            endpoints,
        }
    }

    fn endpoint(&self, device: Device) -> Option<&str> {
        self.endpoints.get(&device).map(String::as_str)
    }
}

/// Endpoints exist only inside `Registered`, so they are all present or
/// all gone.
#[derive(Debug)]
enum Link {
    Unregistered,
    Registered(Session),
    Lost,
}

#[derive(Debug)]
struct SessionState {
    link: Link,
    last_frame: Option<ColorMatrix>,
    closed: bool,
}

impl SessionState {
    fn session(&self) -> Option<&Session> {
        match &self.link {
            Link::Registered(session) => Some(session),
            Link::Unregistered | Link::Lost => None,
        }
    }

    fn endpoint(&self, device: Device) -> Option<String> {
        self.session()?.endpoint(device).map(str::to_string)
    }
}

struct Inner {
    transport: Arc<dyn LightingTransport>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self) -> Result<Session> {
        let url = &self.config.register_url;
        let request = ChromaRequest::post_json(url.as_str(), &self.config.descriptor)?;
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(GlowError::HttpStatus {
                method: "POST",
                url: url.clone(),
                status: response.status,
            });
        }
        let reply: RegisterResponse = serde_json::from_str(&response.body)
            .map_err(|e| GlowError::InvalidResponse(format!("registration reply: {e}")))?;
        Ok(Session::new(&reply.uri))
    }

    /// Register unless already registered.
    fn ensure_session(&self, state: &mut SessionState) -> Result<Session> {
        if let Some(session) = state.session() {
            return Ok(session.clone());
        }
        let session = self.register()?;
        info!(uri = %session.base_uri, "Chroma session ready");
        state.link = Link::Registered(session.clone());
        Ok(session)
    }

    /// Drop the current session and register a new one.
    fn reconnect(&self, state: &mut SessionState) -> Result<Session> {
        state.link = Link::Lost;
        self.ensure_session(state)
    }

    /// Resend the last keyboard frame, if any.
    fn replay(&self, state: &SessionState) -> Result<()> {
        let (Some(frame), Some(url)) = (&state.last_frame, state.endpoint(Device::Keyboard)) else {
            return Ok(());
        };
        debug!("Replaying last keyboard frame");
        self.put_keyboard(&url, frame)
    }

    /// Reconnect and replay.
    fn recover(&self, state: &mut SessionState) -> Result<()> {
        self.reconnect(state)?;
        self.replay(state)
    }

    fn put(&self, request: &ChromaRequest) -> Result<ChromaResponse> {
        let response = self.transport.send(request)?;
        if response.is_session_gone() {
            return Err(GlowError::SessionGone {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(GlowError::HttpStatus {
                method: request.method.as_str(),
                url: request.url.clone(),
                status: response.status,
            });
        }
        Ok(response)
    }

    fn put_keyboard(&self, url: &str, frame: &ColorMatrix) -> Result<()> {
        let request = ChromaRequest::put_json(url, &Effect::Custom(frame.clone()))?;
        self.put(&request)?;
        trace!("Keyboard frame accepted");
        Ok(())
    }

    fn put_static(&self, url: &str, color: Bgr) -> Result<()> {
        let request = ChromaRequest::put_json(url, &Effect::solid(color))?;
        self.put(&request).map(drop)
    }

    fn push_frame(&self, state: &mut SessionState, frame: &ColorMatrix) -> Result<()> {
        let first = self.ensure_session(state).and_then(|session| {
            let url = session
                .endpoint(Device::Keyboard)
                .ok_or_else(|| GlowError::InvalidResponse("no keyboard endpoint".to_string()))?;
            self.put_keyboard(url, frame)
        });
        match first {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Keyboard frame rejected, re-registering");
                // The frame is already recorded as the last one, so the
                // replay is the retry.
                self.recover(state)
            }
        }
    }

    /// One static push with a single recovery on session loss. Never fails.
    fn push_static(&self, state: &mut SessionState, device: Device, color: Bgr) {
        let Some(url) = state.endpoint(device) else {
            trace!(%device, "No endpoint, skipping");
            return;
        };
        match self.put_static(&url, color) {
            Ok(()) => trace!(%device, color = %color.0, "Static color accepted"),
            Err(e) if e.is_session_gone() => {
                warn!(%device, error = %e, "Session lost during static push, re-registering");
                if let Err(e) = self.reconnect(state) {
                    warn!(error = %e, "Re-registration failed");
                    return;
                }
                if let Err(e) = self.replay(state) {
                    debug!(error = %e, "Replay after re-registration failed");
                }
                if let Some(url) = state.endpoint(device) {
                    if let Err(e) = self.put_static(&url, color) {
                        warn!(%device, error = %e, "Static color retry failed");
                    }
                }
            }
            Err(e @ GlowError::HttpStatus { .. }) => {
                warn!(%device, error = %e, "Device rejected static color (may not support it)");
            }
            Err(e) => warn!(%device, error = %e, "Static color push failed"),
        }
    }

    fn push_static_all(&self, state: &mut SessionState, color: Bgr) {
        if let Err(e) = self.ensure_session(state) {
            warn!(error = %e, "Cannot set static color: no session");
            return;
        }
        for device in Device::SECONDARY {
            self.push_static(state, device, color);
        }
    }

    fn clear_all(&self, state: &mut SessionState) {
        self.push_static_all(state, Bgr::OFF);
        if let Some(url) = state.endpoint(Device::Keyboard) {
            if let Err(e) = self.put_keyboard(&url, &ColorMatrix::empty()) {
                debug!(error = %e, "Clearing keyboard failed");
            }
        }
    }

    fn heartbeat(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        let Some(url) = state.session().map(|s| s.heartbeat_url.clone()) else {
            return;
        };
        match self.put(&ChromaRequest::put_empty(url)) {
            Ok(_) => trace!("Heartbeat"),
            Err(e) if e.is_session_gone() => {
                warn!(error = %e, "Heartbeat lost the session, re-registering");
                if let Err(e) = self.recover(&mut state) {
                    warn!(error = %e, "Session recovery failed, retrying next heartbeat");
                }
            }
            Err(e) => debug!(error = %e, "Heartbeat failed, retrying next tick"),
        }
    }
}

/// Client for one Chroma session.
///
/// All state sits behind one mutex, held across each HTTP exchange, so
/// pushes, heartbeats and recovery never interleave.
pub struct SessionManager {
    inner: Arc<Inner>,
    heartbeat: Mutex<Option<Ticker>>,
}

impl SessionManager {
    /// Try to register once and start the heartbeat thread.
    ///
    /// A failed registration is only logged; the next push tries again.
    pub fn new(transport: Arc<dyn LightingTransport>, config: SessionConfig) -> Result<Self> {
        let interval = config.heartbeat_interval;
        let inner = Arc::new(Inner {
            transport,
            config,
            state: Mutex::new(SessionState {
                link: Link::Unregistered,
                last_frame: None,
                closed: false,
            }),
        });

        if let Err(e) = inner.ensure_session(&mut inner.lock()) {
            warn!(error = %e, "Chroma registration failed, will retry on next push");
        }

        let beat = Arc::clone(&inner);
        let ticker = Ticker::spawn("chroma-heartbeat", interval, false, move || beat.heartbeat())?;

        Ok(Self {
            inner,
            heartbeat: Mutex::new(Some(ticker)),
        })
    }

    /// Send a full keyboard frame.
    ///
    /// The frame becomes the replay frame even if sending fails. On any
    /// failure the session is re-registered and the frame sent once more;
    /// the result of that retry is returned.
    pub fn push_frame(&self, frame: &ColorMatrix) -> Result<()> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(GlowError::SessionClosed);
        }
        state.last_frame = Some(frame.clone());
        self.inner.push_frame(&mut state, frame)
    }

    /// Set every non-keyboard device to one static color. Failures are logged.
    pub fn push_static_color(&self, color: Bgr) {
        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        self.inner.push_static_all(&mut state, color);
    }

    /// Turn everything off. Failures are ignored.
    pub fn clear_all(&self) {
        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        self.inner.clear_all(&mut state);
    }

    /// Stop the heartbeat, clear the devices and delete the session.
    /// Later calls do nothing.
    pub fn close(&self) {
        if let Some(mut ticker) = self
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            ticker.stop();
        }

        let mut state = self.inner.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        self.inner.clear_all(&mut state);

        if let Link::Registered(session) = std::mem::replace(&mut state.link, Link::Unregistered) {
            match self.inner.transport.send(&ChromaRequest::delete(session.base_uri.as_str())) {
                Ok(response) if response.is_success() => info!("Chroma session closed"),
                Ok(response) => debug!(status = response.status, "Session delete refused"),
                Err(e) => debug!(error = %e, "Session delete failed"),
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.inner.lock();
        if state.closed {
            return SessionStatus::Closed;
        }
        match state.link {
            Link::Unregistered => SessionStatus::Unregistered,
            Link::Registered(_) => SessionStatus::Registered,
            Link::Lost => SessionStatus::Lost,
        }
    }

    /// Base URI of the current session.
    pub fn session_uri(&self) -> Option<String> {
        self.inner.lock().session().map(|s| s.base_uri.clone())
    }

    /// The frame that would be replayed after a reconnect.
    pub fn last_frame(&self) -> Option<ColorMatrix> {
        self.inner.lock().last_frame.clone()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}
