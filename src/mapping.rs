//! Snapshot → keyboard frame mapping.

use tracing::trace;

use crate::config::LightingOverrides;
use crate::matrix::ColorMatrix;
use crate::snapshot::Snapshot;

/// Maps snapshots to frames for one set of overrides.
#[derive(Debug, Clone)]
pub struct SnapshotToMatrix {
    overrides: LightingOverrides,
}

impl SnapshotToMatrix {
    pub const fn new(overrides: LightingOverrides) -> Self {
        Self { overrides }
    }

    pub const fn overrides(&self) -> &LightingOverrides {
        &self.overrides
    }

    /// The frame shown before any snapshot: background everywhere, or off.
    pub fn background(&self) -> ColorMatrix {
        self.overrides
            .background_bgr()
            .map_or_else(ColorMatrix::empty, ColorMatrix::full)
    }

    /// Build the keyboard frame for `snapshot`.
    pub fn to_keyboard(&self, snapshot: &Snapshot) -> ColorMatrix {
        let o = &self.overrides;
        let mut matrix = self.background();

        let primary_pct = snapshot.primary_pct();
        matrix.apply_bar(
            o.primary.row,
            o.primary.first_col,
            o.primary.last_col,
            o.primary_bgr(),
            primary_pct,
        );

        let secondary_pct = snapshot.secondary_pct();
        matrix.apply_bar(
            o.secondary.row,
            o.secondary.first_col,
            o.secondary.last_col,
            o.secondary_bgr_for(snapshot.secondary_type),
            secondary_pct,
        );

        trace!(
            primary_pct,
            secondary_pct,
            resource = %snapshot.secondary_type,
            "Mapped snapshot to keyboard frame"
        );
        matrix
    }
}

/// One-shot form of [`SnapshotToMatrix::to_keyboard`].
pub fn snapshot_to_matrix(snapshot: &Snapshot, overrides: &LightingOverrides) -> ColorMatrix {
    SnapshotToMatrix::new(overrides.clone()).to_keyboard(snapshot)
}
