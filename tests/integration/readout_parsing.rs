//! Integration tests for recognizer text → snapshot, alone and in the pipeline.

use std::fs;
use std::sync::Arc;

use glow::chroma::mock::MockTransport;
use glow::config::{LightingOverrides, MemorySettingsStore};
use glow::mapping::snapshot_to_matrix;
use glow::runtime::LightingRuntime;
use glow::scheduler::MIN_POLL_PERIOD;
use glow::sensing::{ReadoutFileFactory, ReadoutParser, SimulatedSource, SnapshotSource};
use glow::snapshot::{ResourceType, Snapshot};
use tempfile::TempDir;

use crate::common::{connect_to, init_test_logging, wait_until};

/// Test a multi-line HUD dump with recognizer noise around the numbers.
#[test]
fn test_noisy_multiline_readout() {
    let mut parser = ReadoutParser::new();
    let text = "Lvl 60  Orc Warrior\n\
                 HP  1 234 / 2000 |||||||||\n\
                 Rage: 45 / 100\n\
                 [Target] Kobold 300/300";
    let s = parser.parse(text).unwrap();
    // "1 234" is two tokens; the pair is "234 / 2000".
    assert_eq!(s, Snapshot::new(234, 2000, 45, 100, ResourceType::Rage));
}

/// Test every resource label the recognizer may produce.
#[test]
fn test_all_resource_labels() {
    let cases = [
        ("MANA 1/2", ResourceType::Mana),
        ("rage 1/2", ResourceType::Rage),
        ("Energy 1/2", ResourceType::Energy),
        ("ÉNERGIE 1/2", ResourceType::Energy),
        ("Energie 1/2", ResourceType::Energy),
        ("Focus 1/2", ResourceType::Focus),
        ("Fury 1/2", ResourceType::Fury),
        ("Insanity 1/2", ResourceType::Insanity),
        ("Maelstrom 1/2", ResourceType::Maelstrom),
        ("Runic 1/2", ResourceType::RunicPower),
        ("Runic Power 1/2", ResourceType::RunicPower),
        ("Puissance runique 1/2", ResourceType::RunicPower),
    ];
    for (label, expected) in cases {
        let mut parser = ReadoutParser::new();
        let s = parser.parse(&format!("100/200 {label}")).unwrap();
        assert_eq!(s.secondary_type, expected, "{label}");
        assert_eq!((s.secondary_current, s.secondary_max), (1, 2), "{label}");
    }
}

/// Test that a frame with only the health bar keeps the last resource.
#[test]
fn test_primary_only_frame() {
    let mut parser = ReadoutParser::new();
    parser.parse("500/500 Fury 30/120").unwrap();
    let s = parser.parse("480/500").unwrap();
    assert_eq!(s, Snapshot::new(480, 500, 0, 120, ResourceType::Fury));
}

/// Test the starting assumptions before anything was read.
#[test]
fn test_initial_defaults() {
    let mut parser = ReadoutParser::new();
    let s = parser.parse("HP 42/0").unwrap();
    assert_eq!(s, Snapshot::new(42, 1000, 0, 1000, ResourceType::Mana));
}

/// Test that the simulated source always has a reading.
#[test]
fn test_simulated_source_never_skips() {
    let mut source = SimulatedSource::new();
    for _ in 0..500 {
        let s = source.read().unwrap();
        assert_eq!(s.primary_max, 1000);
        assert!(s.secondary_type != ResourceType::Unknown);
    }
}

/// Test the whole path from a readout file to the keyboard.
#[test]
fn test_readout_file_drives_keyboard() {
    init_test_logging();
    let tmp = TempDir::new().unwrap();
    let readout = tmp.path().join("hud.txt");

    let mock = Arc::new(MockTransport::new());
    let runtime = LightingRuntime::new(
        connect_to(&mock, None),
        Arc::new(MemorySettingsStore::new()),
        Arc::new(ReadoutFileFactory::new(&readout)),
    )
    .with_poll_period(MIN_POLL_PERIOD);
    runtime.start().unwrap();

    // No file yet: nothing is pushed.
    std::thread::sleep(MIN_POLL_PERIOD * 3);
    assert!(mock.keyboard_frames().is_empty());

    fs::write(&readout, "HP 750/1000\nMana 250/1000").unwrap();
    let expected = snapshot_to_matrix(
        &Snapshot::new(750, 1000, 250, 1000, ResourceType::Mana),
        &LightingOverrides::default(),
    );
    assert!(wait_until(|| mock.last_keyboard_frame() == Some(expected.clone())));

    fs::write(&readout, "HP 100/1000\nInsanity 90/100").unwrap();
    let expected = snapshot_to_matrix(
        &Snapshot::new(100, 1000, 90, 100, ResourceType::Insanity),
        &LightingOverrides::default(),
    );
    assert!(wait_until(|| mock.last_keyboard_frame() == Some(expected.clone())));

    runtime.shutdown();
}
