//! Keyboard color matrix.
//!
//! The Chroma custom keyboard effect takes a fixed 6x22 grid of packed BGR
//! colors. [`ColorMatrix`] always holds exactly that many cells.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Bgr;

/// Number of key rows in the Chroma keyboard grid.
pub const ROWS: usize = 6;
/// Number of key columns in the Chroma keyboard grid.
pub const COLS: usize = 22;

/// A full keyboard frame.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorMatrix {
    cells: [[Bgr; COLS]; ROWS],
}

impl ColorMatrix {
    /// All cells off.
    pub const fn empty() -> Self {
        Self::full(Bgr::OFF)
    }

    /// Every cell set to `color`.
    pub const fn full(color: Bgr) -> Self {
        Self {
            cells: [[color; COLS]; ROWS],
        }
    }

    /// Draw a horizontal bar on `row` over `first_col..=last_col`.
    ///
    /// The whole range is cleared first so a shrinking bar leaves no stale
    /// lit cells. `pct` is clamped to `[0, 1]` and lights
    /// `floor(pct * width)` cells from the left, except that any positive
    /// `pct` lights at least one. Out-of-range rows and empty ranges are
    /// ignored; `last_col` is clamped to the grid.
    pub fn apply_bar(&mut self, row: usize, first_col: usize, last_col: usize, color: Bgr, pct: f64) {
        if row >= ROWS {
            return;
        }
        let last_col = last_col.min(COLS - 1);
        if last_col < first_col {
            return;
        }

        let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 1.0) };
        let width = last_col - first_col + 1;

        let cells = &mut self.cells[row][first_col..=last_col];
        cells.fill(Bgr::OFF);

        let mut lit = (pct * width as f64).floor() as usize;
        if pct > 0.0 && lit == 0 {
            lit = 1;
        }
        cells[..lit.min(width)].fill(color);
    }

    /// Color at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Bgr> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[Bgr; COLS]> {
        self.cells.get(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Bgr; COLS]> {
        self.cells.iter()
    }

    /// Number of cells in `row` holding exactly `color`.
    pub fn count_in_row(&self, row: usize, color: Bgr) -> usize {
        self.row(row)
            .map_or(0, |r| r.iter().filter(|&&c| c == color).count())
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ColorMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ColorMatrix [")?;
        for row in &self.cells {
            let line: Vec<String> = row.iter().map(|c| format!("{:06X}", c.0)).collect();
            writeln!(f, "  {}", line.join(" "))?;
        }
        write!(f, "]")
    }
}
