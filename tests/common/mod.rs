//! Common test utilities for the glow integration tests.
//!
//! - `init_test_logging`: route tracing output through the test harness
//! - `ScriptedSource`: a snapshot source that plays back a fixed script
//! - `wait_until`: poll a condition with a deadline
//! - `connect_mock`: a session manager wired to a fresh `MockTransport`
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use glow::chroma::mock::MockTransport;
use glow::chroma::{LightingTransport, SessionConfig, SessionManager};
use glow::snapshot::{ResourceType, Snapshot};
use glow::sensing::SnapshotSource;
use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `cond` every 5 ms for up to 3 seconds.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// A session manager on a fresh mock service. The heartbeat is slow enough
/// not to interfere unless `heartbeat` is given.
pub fn connect_mock(heartbeat: Option<Duration>) -> (Arc<MockTransport>, SessionManager) {
    let mock = Arc::new(MockTransport::new());
    let session = connect_to(&mock, heartbeat);
    (mock, session)
}

/// A session manager on an existing mock service.
pub fn connect_to(mock: &Arc<MockTransport>, heartbeat: Option<Duration>) -> SessionManager {
    let config = SessionConfig::default()
        .with_register_url(mock.register_url())
        .with_heartbeat_interval(heartbeat.unwrap_or(Duration::from_secs(3600)));
    SessionManager::new(Arc::clone(mock) as Arc<dyn LightingTransport>, config)
        .expect("session manager")
}

pub fn mana(primary: u32, primary_max: u32, secondary: u32, secondary_max: u32) -> Snapshot {
    Snapshot::new(primary, primary_max, secondary, secondary_max, ResourceType::Mana)
}

/// Plays back a script of readings, then reports `None` forever.
///
/// Clones share the script and the read counter.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Option<Snapshot>>>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<Snapshot>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, reading: Option<Snapshot>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reading);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SnapshotSource for ScriptedSource {
    fn read(&mut self) -> Option<Snapshot> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .flatten()
    }
}
