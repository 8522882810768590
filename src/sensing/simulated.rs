//! Deterministic fake HUD for demos and tests without a game running.

use crate::snapshot::{ResourceType, Snapshot};

const PERIOD: u32 = 200;
const TYPE_SWITCH_EVERY: u32 = 120;
const MAX: u32 = 1000;

/// Health follows a slow sine wave, the resource a faster rectified one,
/// and the resource type rotates MANA → RAGE → ENERGY → RUNIC_POWER.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    t: u32,
    resource: ResourceType,
}

impl SimulatedSource {
    pub const fn new() -> Self {
        Self {
            t: 0,
            resource: ResourceType::Mana,
        }
    }

    /// Advance one step and return the reading.
    pub fn next_snapshot(&mut self) -> Snapshot {
        self.t = (self.t + 1) % PERIOD;
        let t = f64::from(self.t);
        let primary = 0.6 + 0.4 * (t / 20.0).sin();
        let secondary = 0.2 + 0.8 * (t / 15.0).sin().abs();

        if self.t % TYPE_SWITCH_EVERY == 0 {
            self.resource = match self.resource {
                ResourceType::Mana => ResourceType::Rage,
                ResourceType::Rage => ResourceType::Energy,
                ResourceType::Energy => ResourceType::RunicPower,
                _ => ResourceType::Mana,
            };
        }

        Snapshot::new(
            scale(primary),
            MAX,
            scale(secondary),
            MAX,
            self.resource,
        )
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl super::SnapshotSource for SimulatedSource {
    fn read(&mut self) -> Option<Snapshot> {
        Some(self.next_snapshot())
    }
}

fn scale(fraction: f64) -> u32 {
    (fraction.clamp(0.0, 1.0) * f64::from(MAX)).round() as u32
}
