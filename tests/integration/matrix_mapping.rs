//! Integration tests for snapshot → keyboard frame mapping.

use glow::color::{Bgr, Rgb};
use glow::config::{LightingOverrides, Zone};
use glow::mapping::{SnapshotToMatrix, snapshot_to_matrix};
use glow::matrix::{COLS, ColorMatrix, ROWS};
use glow::snapshot::{ResourceType, Snapshot};

use crate::common::mana;

const BLUE: Rgb = Rgb::new(0x0000FF);
const GREEN: Rgb = Rgb::new(0x00FF00);

/// Lit prefix length of `row`: cells equal to `color` from column 0.
fn lit(matrix: &ColorMatrix, row: usize, color: Bgr) -> usize {
    matrix
        .row(row)
        .unwrap()
        .iter()
        .take_while(|&&c| c == color)
        .count()
}

/// Test the reference scenario under the shipped defaults.
#[test]
fn test_default_overrides_scenario() {
    let overrides = LightingOverrides::default();
    let m = snapshot_to_matrix(&mana(50, 100, 30, 100), &overrides);

    // Row 0: 11 primary cells, then the rest of the bar zone cleared.
    assert_eq!(lit(&m, 0, BLUE.to_bgr()), 11);
    assert_eq!(m.count_in_row(0, Bgr::OFF), 11);
    // Row 1: floor(0.3 * 22) = 6 secondary cells.
    assert_eq!(lit(&m, 1, GREEN.to_bgr()), 6);
    assert_eq!(m.count_in_row(1, Bgr::OFF), 16);
    // Everything outside the bars is background.
    for row in 2..ROWS {
        assert_eq!(m.count_in_row(row, Bgr(0x402010)), COLS);
    }
}

/// Test that each configured resource gets its own color and the rest share
/// the generic one.
#[test]
fn test_resource_colors() {
    let mut overrides = LightingOverrides::default();
    overrides.set_resource_color(ResourceType::Rage, Some(Rgb::new(0xFF0000)));
    overrides.set_resource_color(ResourceType::Energy, Some(Rgb::new(0xFFFF00)));
    overrides.set_resource_color(ResourceType::Focus, None);
    let mapper = SnapshotToMatrix::new(overrides);

    for resource in ResourceType::ALL {
        let m = mapper.to_keyboard(&Snapshot::new(0, 100, 100, 100, resource));
        let expected = match resource {
            ResourceType::Rage => Bgr(0x0000FF),
            ResourceType::Energy => Bgr(0x00FFFF),
            _ => GREEN.to_bgr(),
        };
        assert_eq!(m.count_in_row(1, expected), COLS, "{resource}");
    }
}

/// Test bars in a partial zone leave the rest of their row alone.
#[test]
fn test_partial_zones() {
    let overrides = LightingOverrides {
        primary: Zone::new(4, 2, 11),
        secondary: Zone::new(4, 14, 21),
        ..LightingOverrides::default()
    };
    let m = snapshot_to_matrix(&mana(70, 100, 50, 100), &overrides);
    let row = m.row(4).unwrap();
    let bg = Bgr(0x402010);

    assert_eq!(&row[..2], &[bg; 2]);
    // floor(0.7 * 10) = 7
    assert_eq!(&row[2..9], &[BLUE.to_bgr(); 7]);
    assert_eq!(&row[9..12], &[Bgr::OFF; 3]);
    assert_eq!(&row[12..14], &[bg; 2]);
    // floor(0.5 * 8) = 4
    assert_eq!(&row[14..18], &[GREEN.to_bgr(); 4]);
    assert_eq!(&row[18..], &[Bgr::OFF; 4]);

    // Rows 0 and 1 are plain background now.
    assert_eq!(m.count_in_row(0, bg), COLS);
    assert_eq!(m.count_in_row(1, bg), COLS);
}

/// Test that any non-zero reading lights at least one key.
#[test]
fn test_tiny_values_light_one_key() {
    let m = snapshot_to_matrix(&mana(1, 1000, 1, 9999), &LightingOverrides::default());
    assert_eq!(lit(&m, 0, BLUE.to_bgr()), 1);
    assert_eq!(lit(&m, 1, GREEN.to_bgr()), 1);

    let m = snapshot_to_matrix(&mana(0, 1000, 0, 1000), &LightingOverrides::default());
    assert_eq!(m.count_in_row(0, Bgr::OFF), COLS);
    assert_eq!(m.count_in_row(1, Bgr::OFF), COLS);
}

/// Test the floor rule just below a full bar.
#[test]
fn test_floor_below_full() {
    // 0.99 * 22 = 21.78 → 21 keys.
    let m = snapshot_to_matrix(&mana(99, 100, 100, 100), &LightingOverrides::default());
    assert_eq!(lit(&m, 0, BLUE.to_bgr()), 21);
    assert_eq!(lit(&m, 1, GREEN.to_bgr()), 22);
}

/// Test apply_bar's edge handling directly.
#[test]
fn test_apply_bar_edges() {
    let color = Bgr(0x123456);

    let mut m = ColorMatrix::full(Bgr(1));
    m.apply_bar(ROWS, 0, 5, color, 1.0);
    assert_eq!(m, ColorMatrix::full(Bgr(1)), "row out of range is a no-op");

    m.apply_bar(0, 8, 3, color, 1.0);
    assert_eq!(m, ColorMatrix::full(Bgr(1)), "empty range is a no-op");

    m.apply_bar(0, 18, 40, color, 1.0);
    assert_eq!(m.count_in_row(0, color), 4, "last column is clamped");

    m.apply_bar(1, 0, 9, color, f64::NAN);
    assert_eq!(m.count_in_row(1, Bgr::OFF), 10, "NaN clears the zone");

    m.apply_bar(2, 0, 9, color, 7.5);
    assert_eq!(m.count_in_row(2, color), 10, "over 100% fills the zone");

    m.apply_bar(3, 0, 9, color, -1.0);
    assert_eq!(m.count_in_row(3, Bgr::OFF), 10);
}

/// Test that the frame serializes as 6 rows of 22 packed BGR integers.
#[test]
fn test_frame_wire_shape() {
    let m = snapshot_to_matrix(&mana(100, 100, 0, 100), &LightingOverrides::default());
    let value = serde_json::to_value(&m).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), ROWS);
    assert!(rows.iter().all(|r| r.as_array().unwrap().len() == COLS));
    assert_eq!(rows[0][0], serde_json::json!(0xFF0000));
    assert_eq!(rows[5][21], serde_json::json!(0x402010));

    let back: ColorMatrix = serde_json::from_value(value).unwrap();
    assert_eq!(back, m);
}
