//! Sensing sources: where snapshots come from.
//!
//! The screen recognizer itself lives outside this crate. Anything that can
//! produce a [`Snapshot`] implements [`SnapshotSource`]; the runtime builds
//! a fresh source through a [`SourceFactory`] every time it starts.

mod readout;
mod simulated;

pub use readout::{ReadoutFileSource, ReadoutParser};
pub use simulated::SimulatedSource;

use std::path::PathBuf;

use tracing::info;

use crate::config::CaptureSettings;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// A provider of HUD readings.
///
/// `read` must not panic; an unreadable frame is `None` and the tick is
/// skipped.
pub trait SnapshotSource: Send {
    fn read(&mut self) -> Option<Snapshot>;
}

impl<F> SnapshotSource for F
where
    F: FnMut() -> Option<Snapshot> + Send,
{
    fn read(&mut self) -> Option<Snapshot> {
        self()
    }
}

/// Builds a sensing source for the current capture settings.
pub trait SourceFactory: Send + Sync {
    fn build(&self, capture: &CaptureSettings) -> Result<Box<dyn SnapshotSource>>;
}

impl<F> SourceFactory for F
where
    F: Fn(&CaptureSettings) -> Result<Box<dyn SnapshotSource>> + Send + Sync,
{
    fn build(&self, capture: &CaptureSettings) -> Result<Box<dyn SnapshotSource>> {
        self(capture)
    }
}

/// Factory for [`SimulatedSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSourceFactory;

impl SourceFactory for SimulatedSourceFactory {
    fn build(&self, _capture: &CaptureSettings) -> Result<Box<dyn SnapshotSource>> {
        info!("Using simulated HUD readings");
        Ok(Box::new(SimulatedSource::new()))
    }
}

/// Factory for [`ReadoutFileSource`]: an external recognizer writes the text
/// it sees in the capture area to `path`.
#[derive(Debug, Clone)]
pub struct ReadoutFileFactory {
    path: PathBuf,
}

impl ReadoutFileFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceFactory for ReadoutFileFactory {
    fn build(&self, capture: &CaptureSettings) -> Result<Box<dyn SnapshotSource>> {
        info!(
            path = %self.path.display(),
            x = capture.area.x,
            y = capture.area.y,
            width = capture.area.width,
            height = capture.area.height,
            language = %capture.language,
            "Reading HUD text from recognizer output file"
        );
        Ok(Box::new(ReadoutFileSource::new(&self.path)))
    }
}
