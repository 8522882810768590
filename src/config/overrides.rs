//! User-tunable lighting overrides: bar zones and colors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{Bgr, Rgb};
use crate::error::{GlowError, Result};
use crate::matrix::{COLS, ROWS};
use crate::snapshot::ResourceType;

/// A contiguous column range on one keyboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl Zone {
    pub const fn new(row: usize, first_col: usize, last_col: usize) -> Self {
        Self {
            row,
            first_col,
            last_col,
        }
    }

    /// A zone spanning the whole width of `row`.
    pub const fn full_row(row: usize) -> Self {
        Self::new(row, 0, COLS - 1)
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        if self.row < ROWS && self.first_col <= self.last_col && self.last_col < COLS {
            return Ok(());
        }
        Err(GlowError::InvalidZone {
            name,
            row: self.row,
            first_col: self.first_col,
            last_col: self.last_col,
            rows: ROWS,
            cols: COLS,
        })
    }
}

/// Zone and color configuration for both bars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LightingOverrides {
    /// Zone of the primary (health) bar.
    pub primary: Zone,
    /// Zone of the secondary (resource) bar.
    pub secondary: Zone,
    pub primary_color: Rgb,
    /// Fallback color for resource types without their own entry.
    pub secondary_color: Rgb,
    /// Per-resource colors; `null` entries fall back to `secondary_color`.
    #[serde(default)]
    pub secondary_colors: BTreeMap<ResourceType, Option<Rgb>>,
    /// Color for every key outside the bars, and for secondary devices.
    #[serde(default)]
    pub background: Option<Rgb>,
}

impl Default for LightingOverrides {
    fn default() -> Self {
        Self {
            primary: Zone::full_row(0),
            secondary: Zone::full_row(1),
            primary_color: Rgb::new(0x0000FF),
            secondary_color: Rgb::new(0x00FF00),
            secondary_colors: BTreeMap::new(),
            background: Some(Rgb::new(0x102040)),
        }
    }
}

impl LightingOverrides {
    /// Check that both zones fit inside the keyboard grid.
    pub fn validate(&self) -> Result<()> {
        self.primary.validate("primary")?;
        self.secondary.validate("secondary")
    }

    /// Parse and validate overrides from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let overrides: Self = serde_json::from_str(text)
            .map_err(|e| GlowError::ConfigParse(format!("Invalid lighting overrides: {e}")))?;
        overrides.validate()?;
        debug!(
            resource_colors = overrides.secondary_colors.len(),
            has_background = overrides.background.is_some(),
            "Parsed lighting overrides"
        );
        Ok(overrides)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GlowError::Other(format!("Failed to serialize overrides: {e}")))
    }

    pub fn primary_bgr(&self) -> Bgr {
        self.primary_color.to_bgr()
    }

    /// Device color for `resource`, falling back to the generic secondary color.
    pub fn secondary_bgr_for(&self, resource: ResourceType) -> Bgr {
        self.secondary_colors
            .get(&resource)
            .copied()
            .flatten()
            .unwrap_or(self.secondary_color)
            .to_bgr()
    }

    pub fn background_bgr(&self) -> Option<Bgr> {
        self.background.map(Rgb::to_bgr)
    }

    /// Set or clear the color for one resource type.
    pub fn set_resource_color(&mut self, resource: ResourceType, color: Option<Rgb>) {
        self.secondary_colors.insert(resource, color);
    }
}
