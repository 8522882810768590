//! Game-state snapshots read from the HUD.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GlowError;

/// Secondary resource kinds shown on the second bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Mana,
    Rage,
    Energy,
    RunicPower,
    Focus,
    Maelstrom,
    Fury,
    Insanity,
    #[default]
    Unknown,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Mana,
        Self::Rage,
        Self::Energy,
        Self::RunicPower,
        Self::Focus,
        Self::Maelstrom,
        Self::Fury,
        Self::Insanity,
        Self::Unknown,
    ];

    /// Configuration key for this type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mana => "MANA",
            Self::Rage => "RAGE",
            Self::Energy => "ENERGY",
            Self::RunicPower => "RUNIC_POWER",
            Self::Focus => "FOCUS",
            Self::Maelstrom => "MAELSTROM",
            Self::Fury => "FURY",
            Self::Insanity => "INSANITY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = GlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| GlowError::UnknownResourceType(s.to_string()))
    }
}

/// One sampled reading of both bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub primary_current: u32,
    pub primary_max: u32,
    pub secondary_current: u32,
    pub secondary_max: u32,
    pub secondary_type: ResourceType,
}

impl Snapshot {
    pub const fn new(
        primary_current: u32,
        primary_max: u32,
        secondary_current: u32,
        secondary_max: u32,
        secondary_type: ResourceType,
    ) -> Self {
        Self {
            primary_current,
            primary_max,
            secondary_current,
            secondary_max,
            secondary_type,
        }
    }

    pub fn primary_pct(&self) -> f64 {
        ratio(self.primary_current, self.primary_max)
    }

    pub fn secondary_pct(&self) -> f64 {
        ratio(self.secondary_current, self.secondary_max)
    }

    pub fn percentages(&self) -> BarPercentages {
        BarPercentages {
            primary: self.primary_pct(),
            secondary: self.secondary_pct(),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "primary={}/{} secondary={}/{} ({})",
            self.primary_current,
            self.primary_max,
            self.secondary_current,
            self.secondary_max,
            self.secondary_type
        )
    }
}

/// `current / max` clamped to `[0, 1]`; 0 when `max` is 0 (value unavailable).
pub fn ratio(current: u32, max: u32) -> f64 {
    if max == 0 {
        return 0.0;
    }
    (f64::from(current) / f64::from(max)).clamp(0.0, 1.0)
}

/// Fill fractions of both bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarPercentages {
    pub primary: f64,
    pub secondary: f64,
}

impl BarPercentages {
    /// True when both bars moved less than `threshold` since `previous`.
    pub fn within(&self, previous: &Self, threshold: f64) -> bool {
        (self.primary - previous.primary).abs() < threshold
            && (self.secondary - previous.secondary).abs() < threshold
    }
}

/// A snapshot plus the time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObservedSnapshot {
    pub snapshot: Snapshot,
    pub observed_at: DateTime<Utc>,
}

impl ObservedSnapshot {
    pub fn now(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            observed_at: Utc::now(),
        }
    }
}
