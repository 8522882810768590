//! The lighting runtime: sensing → mapping → Chroma.
//!
//! [`LightingRuntime`] owns the session and the current overrides. While
//! running, a [`Poller`] reads snapshots into a bounded channel and one
//! consumer thread (`glow-consumer`) debounces them, maps them to frames
//! and pushes changed frames to the keyboard.

use std::sync::mpsc::{self, Receiver, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::chroma::SessionManager;
use crate::config::{
    CaptureArea, CaptureSettings, LightingOverrides, SettingsStore, load_config_or_defaults,
    load_overrides_or_defaults,
};
use crate::error::{GlowError, Result};
use crate::mapping::SnapshotToMatrix;
use crate::matrix::ColorMatrix;
use crate::scheduler::{Poller, StartOutcome};
use crate::sensing::SourceFactory;
use crate::snapshot::{BarPercentages, ObservedSnapshot, Snapshot};

/// Both bars must move at least this much before a new frame is built.
pub const DEBOUNCE_THRESHOLD: f64 = 0.01;

/// Snapshots buffered between the poller and the consumer.
pub const CHANNEL_CAPACITY: usize = 4;

/// What happened to one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Too close to the last pushed reading.
    Debounced,
    /// Mapped to the frame already on the keyboard.
    Unchanged,
    Pushed,
    /// The session refused the frame even after recovery.
    PushFailed,
}

struct RuntimeState {
    overrides: LightingOverrides,
    mapper: SnapshotToMatrix,
    capture: CaptureSettings,
    last_snapshot: Option<ObservedSnapshot>,
    last_matrix: Option<ColorMatrix>,
    last_percentages: Option<BarPercentages>,
    poller: Option<Poller>,
    /// Bumped on every start and stop; consumers of older pipelines go inert.
    generation: u64,
    shut_down: bool,
}

struct Shared {
    state: Mutex<RuntimeState>,
    session: SessionManager,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ingest(&self, state: &mut RuntimeState, snapshot: Snapshot) -> TickOutcome {
        state.last_snapshot = Some(ObservedSnapshot::now(snapshot));

        let percentages = snapshot.percentages();
        if state
            .last_percentages
            .is_some_and(|prev| percentages.within(&prev, DEBOUNCE_THRESHOLD))
        {
            trace!(%snapshot, "Debounced");
            return TickOutcome::Debounced;
        }

        let matrix = state.mapper.to_keyboard(&snapshot);
        if state.last_matrix.as_ref() == Some(&matrix) {
            trace!(%snapshot, "Frame unchanged");
            return TickOutcome::Unchanged;
        }

        match self.session.push_frame(&matrix) {
            Ok(()) => {
                debug!(
                    primary = percentages.primary,
                    secondary = percentages.secondary,
                    "Frame pushed"
                );
                state.last_matrix = Some(matrix);
                state.last_percentages = Some(percentages);
                TickOutcome::Pushed
            }
            Err(e) => {
                warn!(error = %e, "Frame push failed");
                TickOutcome::PushFailed
            }
        }
    }

    fn apply_background(&self, state: &RuntimeState) {
        if let Some(background) = state.overrides.background_bgr() {
            self.session.push_static_color(background);
        }
    }

    fn preview(state: &RuntimeState) -> ColorMatrix {
        state.last_snapshot.as_ref().map_or_else(
            || state.mapper.background(),
            |observed| state.mapper.to_keyboard(&observed.snapshot),
        )
    }

    /// Push the frame for the current snapshot, or the background-only frame.
    fn repaint(&self, state: &mut RuntimeState) {
        let matrix = Self::preview(state);
        match self.session.push_frame(&matrix) {
            Ok(()) => state.last_matrix = Some(matrix),
            Err(e) => warn!(error = %e, "Repaint failed"),
        }
    }

    /// Drain the channel until the pipeline is replaced or its poller goes away.
    fn consume(&self, generation: u64, rx: &Receiver<Snapshot>) {
        while let Ok(mut snapshot) = rx.recv() {
            let mut skipped = 0usize;
            while let Ok(newer) = rx.try_recv() {
                snapshot = newer;
                skipped += 1;
            }
            if skipped > 0 {
                trace!(skipped, "Coalesced snapshot backlog");
            }

            let mut state = self.lock();
            if state.generation != generation {
                debug!(generation, "Pipeline superseded, consumer exiting");
                break;
            }
            self.ingest(&mut state, snapshot);
        }
        trace!(generation, "Consumer finished");
    }
}

/// Drives the keyboard from live snapshots and serves the management
/// operations (start, stop, preview, override updates).
pub struct LightingRuntime {
    shared: Arc<Shared>,
    store: Arc<dyn SettingsStore>,
    sources: Arc<dyn SourceFactory>,
    poll_period: Duration,
}

impl LightingRuntime {
    /// Build a stopped runtime from stored overrides and settings.
    pub fn new(
        session: SessionManager,
        store: Arc<dyn SettingsStore>,
        sources: Arc<dyn SourceFactory>,
    ) -> Self {
        let overrides = load_overrides_or_defaults(store.as_ref());
        let config = load_config_or_defaults(store.as_ref());
        let state = RuntimeState {
            mapper: SnapshotToMatrix::new(overrides.clone()),
            overrides,
            capture: config.capture,
            last_snapshot: None,
            last_matrix: None,
            last_percentages: None,
            poller: None,
            generation: 0,
            shut_down: false,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                session,
            }),
            store,
            sources,
            poll_period: config.poller.period(),
        }
    }

    /// Override the poll period from settings.
    #[must_use]
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.shared.session
    }

    /// Start the pipeline. `Ok(false)` if it is already running.
    pub fn start(&self) -> Result<bool> {
        let mut state = self.shared.lock();
        if state.shut_down {
            return Err(GlowError::RuntimeShutDown);
        }
        if state.poller.as_ref().is_some_and(Poller::is_running) {
            info!("Lighting already running");
            return Ok(false);
        }

        self.shared.apply_background(&state);
        let source = self.sources.build(&state.capture)?;
        state.last_percentages = None;
        state.last_matrix = None;
        state.generation += 1;
        let generation = state.generation;

        let (tx, rx) = mpsc::sync_channel::<Snapshot>(CHANNEL_CAPACITY);
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name("glow-consumer".to_string())
            .spawn(move || shared.consume(generation, &rx))?;

        let sink = Box::new(move |snapshot: Snapshot| match tx.try_send(snapshot) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                trace!("Consumer busy, dropping snapshot");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(GlowError::RuntimeShutDown),
        });

        let mut poller = Poller::new(source, sink, self.poll_period);
        if poller.start()? == StartOutcome::Started {
            info!(generation, period_ms = poller.period().as_millis() as u64, "Lighting started");
        }
        state.poller = Some(poller);
        Ok(true)
    }

    /// Stop the pipeline. `false` if it was not running.
    pub fn stop(&self) -> bool {
        let mut state = self.shared.lock();
        let Some(mut poller) = state.poller.take() else {
            return false;
        };
        poller.stop();
        state.generation += 1;
        info!("Lighting stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().poller.as_ref().is_some_and(Poller::is_running)
    }

    /// Run one snapshot through debounce, mapping and push.
    pub fn ingest(&self, snapshot: Snapshot) -> TickOutcome {
        let mut state = self.shared.lock();
        self.shared.ingest(&mut state, snapshot)
    }

    /// Replace the overrides, re-apply the background, optionally persist,
    /// and repaint right away.
    pub fn update_overrides(&self, overrides: LightingOverrides, persist: bool) -> Result<()> {
        overrides.validate()?;
        let mut state = self.shared.lock();
        if state.shut_down {
            return Err(GlowError::RuntimeShutDown);
        }

        state.mapper = SnapshotToMatrix::new(overrides.clone());
        state.overrides = overrides;
        self.shared.apply_background(&state);

        if persist {
            match self.store.save_overrides(&state.overrides) {
                Ok(()) => debug!("Overrides saved"),
                Err(e) => warn!(error = %e, "Failed to save overrides"),
            }
        }

        self.shared.repaint(&mut state);
        info!("Overrides updated");
        Ok(())
    }

    pub fn overrides(&self) -> LightingOverrides {
        self.shared.lock().overrides.clone()
    }

    /// Frame for the last snapshot under the current overrides, or the
    /// background-only frame. Sends nothing.
    pub fn current_preview_matrix(&self) -> ColorMatrix {
        Shared::preview(&self.shared.lock())
    }

    pub fn last_snapshot(&self) -> Option<ObservedSnapshot> {
        self.shared.lock().last_snapshot
    }

    pub fn capture_area(&self) -> CaptureArea {
        self.shared.lock().capture.area
    }

    /// Store a new capture area; the next `start` reads from it.
    pub fn define_capture_area(&self, area: CaptureArea) -> Result<()> {
        let mut state = self.shared.lock();
        state.capture.area = area;

        let mut config = load_config_or_defaults(self.store.as_ref());
        config.capture.area = area;
        self.store.save_config(&config)?;
        info!(x = area.x, y = area.y, width = area.width, height = area.height, "Capture area saved");
        Ok(())
    }

    /// Stop polling for good and close the session. Later calls do nothing.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.generation += 1;
            if let Some(mut poller) = state.poller.take() {
                poller.shutdown();
            }
        }
        self.shared.session.close();
        info!("Lighting runtime shut down");
    }
}

impl Drop for LightingRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
