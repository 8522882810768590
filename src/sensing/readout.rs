//! Turning recognized HUD text into snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::SnapshotSource;
use crate::snapshot::{ResourceType, Snapshot};

/// Maximum assumed before any maximum has been read.
const INITIAL_MAX: u32 = 1000;

/// First `current/max` pair in the text is the primary bar.
static PRIMARY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,4})\s*/\s*(\d{1,4})").expect("valid primary pattern"));

/// The secondary bar needs a resource name in front of its numbers.
/// English and French labels are recognized.
static SECONDARY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(MANA|RAGE|[EÉ]NERGY|[EÉ]NERGIE|FOCUS|FURY|INSANITY|MAELSTROM|RUNIC(?:\s*POWER)?|PUISSANCE\s*RUNIQUE)\s*[:=]?\s*(\d{1,4})\s*/\s*(\d{1,4})",
    )
    .expect("valid secondary pattern")
});

/// Stateful text → snapshot parser.
///
/// Remembers the last maxima and resource type so a frame where only the
/// current values were legible still yields a usable snapshot.
#[derive(Debug, Clone)]
pub struct ReadoutParser {
    last_type: ResourceType,
    last_primary_max: u32,
    last_secondary_max: u32,
}

impl Default for ReadoutParser {
    fn default() -> Self {
        Self {
            last_type: ResourceType::Mana,
            last_primary_max: INITIAL_MAX,
            last_secondary_max: INITIAL_MAX,
        }
    }
}

impl ReadoutParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one frame of recognized text. `None` if it holds no reading.
    pub fn parse(&mut self, text: &str) -> Option<Snapshot> {
        let primary = PRIMARY_PATTERN
            .captures(text)
            .and_then(|c| Some((number(c.get(1)?.as_str())?, number(c.get(2)?.as_str())?)));

        let secondary = SECONDARY_PATTERN.captures_iter(text).find_map(|c| {
            let resource = resource_from_label(c.get(1)?.as_str());
            let current = number(c.get(2)?.as_str())?;
            let max = number(c.get(3)?.as_str())?;
            (resource != ResourceType::Unknown && max > 0).then_some((resource, current, max))
        });

        if primary.is_none() && secondary.is_none() {
            trace!("Readout contains no bar values");
            return None;
        }

        let (primary_current, primary_max) = match primary {
            Some((current, max)) if max > 0 => {
                self.last_primary_max = max;
                (current, max)
            }
            Some((current, _)) => (current, self.last_primary_max),
            None => (0, self.last_primary_max),
        };

        let (secondary_current, secondary_max) = match secondary {
            Some((resource, current, max)) => {
                self.last_type = resource;
                self.last_secondary_max = max;
                (current, max)
            }
            None => (0, self.last_secondary_max),
        };

        Some(Snapshot::new(
            primary_current.min(primary_max),
            primary_max,
            secondary_current.min(secondary_max),
            secondary_max,
            self.last_type,
        ))
    }
}

fn number(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

/// Map an English or French resource label to its type.
fn resource_from_label(label: &str) -> ResourceType {
    let key: String = label
        .to_uppercase()
        .replace('É', "E")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match key.as_str() {
        "MANA" => ResourceType::Mana,
        "RAGE" => ResourceType::Rage,
        "ENERGY" | "ENERGIE" => ResourceType::Energy,
        "FOCUS" => ResourceType::Focus,
        "FURY" => ResourceType::Fury,
        "INSANITY" => ResourceType::Insanity,
        "MAELSTROM" => ResourceType::Maelstrom,
        "RUNIC" | "RUNICPOWER" | "PUISSANCERUNIQUE" => ResourceType::RunicPower,
        _ => ResourceType::Unknown,
    }
}

/// Reads the recognizer's latest text from a file on every tick.
#[derive(Debug)]
pub struct ReadoutFileSource {
    path: PathBuf,
    parser: ReadoutParser,
}

impl ReadoutFileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            parser: ReadoutParser::new(),
        }
    }
}

impl SnapshotSource for ReadoutFileSource {
    fn read(&mut self) -> Option<Snapshot> {
        match fs::read_to_string(&self.path) {
            Ok(text) => self.parser.parse(&text),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Readout file unavailable");
                None
            }
        }
    }
}
