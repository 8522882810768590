//! Integration tests for overrides and settings files on disk.

use std::fs;

use glow::color::Rgb;
use glow::config::{
    AppConfig, FileSettingsStore, LightingOverrides, SettingsStore, Zone,
    load_config_or_defaults, load_overrides_or_defaults,
};
use glow::error::GlowError;
use glow::snapshot::ResourceType;
use tempfile::TempDir;

fn store() -> (TempDir, FileSettingsStore) {
    let tmp = TempDir::new().unwrap();
    let store = FileSettingsStore::new(tmp.path().join("glow"));
    (tmp, store)
}

/// Test that a hand-written overrides file with every color form loads.
#[test]
fn test_hand_written_overrides() {
    let (_tmp, store) = store();
    fs::create_dir_all(store.dir()).unwrap();
    fs::write(
        store.overrides_path(),
        r##"{
            "primary": { "row": 0, "firstCol": 1, "lastCol": 20 },
            "secondary": { "row": 2, "firstCol": 0, "lastCol": 9 },
            "primaryColor": "#FF0000",
            "secondaryColor": 65280,
            "secondaryColors": {
                "MANA": "0x0000ff",
                "RAGE": "ff8000",
                "ENERGY": "16776960",
                "FOCUS": null
            },
            "background": null
        }"##,
    )
    .unwrap();

    let o = store.load_overrides().unwrap().unwrap();
    assert_eq!(o.primary, Zone::new(0, 1, 20));
    assert_eq!(o.secondary, Zone::new(2, 0, 9));
    assert_eq!(o.primary_color, Rgb::new(0xFF0000));
    assert_eq!(o.secondary_color, Rgb::new(0x00FF00));
    assert_eq!(o.secondary_colors[&ResourceType::Mana], Some(Rgb::new(0x0000FF)));
    assert_eq!(o.secondary_colors[&ResourceType::Rage], Some(Rgb::new(0xFF8000)));
    assert_eq!(o.secondary_colors[&ResourceType::Energy], Some(Rgb::new(0xFFFF00)));
    assert_eq!(o.secondary_colors[&ResourceType::Focus], None);
    assert_eq!(o.background, None);

    // Null and missing entries fall back to the generic color.
    assert_eq!(o.secondary_bgr_for(ResourceType::Focus), Rgb::new(0x00FF00).to_bgr());
    assert_eq!(o.secondary_bgr_for(ResourceType::Fury), Rgb::new(0x00FF00).to_bgr());
}

/// Test that saved overrides come back identical.
#[test]
fn test_overrides_survive_save_and_load() {
    let (_tmp, store) = store();
    let mut overrides = LightingOverrides::default();
    overrides.secondary = Zone::new(5, 4, 17);
    overrides.set_resource_color(ResourceType::RunicPower, Some(Rgb::new(0x00CCFF)));
    overrides.set_resource_color(ResourceType::Insanity, None);

    store.save_overrides(&overrides).unwrap();
    assert_eq!(load_overrides_or_defaults(&store), overrides);

    let text = fs::read_to_string(store.overrides_path()).unwrap();
    assert!(text.contains("\"RUNIC_POWER\": \"#00CCFF\""), "{text}");
    assert!(text.contains("\"INSANITY\": null"), "{text}");
}

/// Test that an unknown resource key makes the whole file unusable.
#[test]
fn test_unknown_resource_key_is_rejected() {
    let mut json = serde_json::to_value(LightingOverrides::default()).unwrap();
    json["secondaryColors"] = serde_json::json!({ "SHADOW_ORBS": "#123456" });

    let err = LightingOverrides::from_json(&json.to_string()).unwrap_err();
    assert!(matches!(err, GlowError::ConfigParse(_)), "got {err:?}");
    assert!(err.to_string().contains("SHADOW_ORBS"), "{err}");
}

/// Test that a zone outside the grid is rejected at load time.
#[test]
fn test_out_of_grid_zone_is_rejected() {
    let mut json = serde_json::to_value(LightingOverrides::default()).unwrap();
    json["primary"] = serde_json::json!({ "row": 0, "firstCol": 5, "lastCol": 22 });

    let err = LightingOverrides::from_json(&json.to_string()).unwrap_err();
    assert!(matches!(err, GlowError::InvalidZone { name: "primary", .. }), "got {err:?}");
}

/// Test that broken files fall back to defaults instead of failing.
#[test]
fn test_malformed_files_fall_back_to_defaults() {
    let (_tmp, store) = store();
    fs::create_dir_all(store.dir()).unwrap();
    fs::write(store.overrides_path(), r#"{"primary": 7}"#).unwrap();
    fs::write(store.config_path(), "[poller]\nperiod_ms = \"fast\"\n").unwrap();

    assert!(store.load_overrides().is_err());
    assert!(store.load_config().is_err());
    assert_eq!(load_overrides_or_defaults(&store), LightingOverrides::default());
    assert_eq!(load_config_or_defaults(&store), AppConfig::default());
}

/// Test that a partial config.toml keeps defaults for everything omitted.
#[test]
fn test_partial_config_file() {
    let (_tmp, store) = store();
    fs::create_dir_all(store.dir()).unwrap();
    fs::write(
        store.config_path(),
        "[capture.area]\nx = -50\ny = 0\nwidth = 200\nheight = 40\n\n[service]\nheartbeat_ms = 500\n",
    )
    .unwrap();

    let config = store.load_config().unwrap();
    assert_eq!(config.capture.area.x, -50);
    assert_eq!(config.capture.area.width, 200);
    assert_eq!(config.capture.language, "eng");
    assert_eq!(config.poller.period_ms, 100);
    assert_eq!(config.service.heartbeat_ms, 500);
    assert_eq!(config.service.timeout_ms, 2000);
    assert_eq!(
        config.service.register_url,
        "http://localhost:54235/razer/chromasdk"
    );
}

/// Test that saving creates the config directory.
#[test]
fn test_save_creates_directory() {
    let (_tmp, store) = store();
    assert!(!store.dir().exists());
    store.save_config(&AppConfig::default()).unwrap();
    assert!(store.config_path().is_file());
    assert_eq!(store.load_config().unwrap(), AppConfig::default());
}

/// Test the accepted color string forms.
#[test]
fn test_color_string_forms() {
    let cases = [
        ("#102040", 0x102040),
        ("0x102040", 0x102040),
        ("0XABCDEF", 0xABCDEF),
        ("abcdef", 0xABCDEF),
        ("1024", 1024),
        (" #FFFFFF ", 0xFFFFFF),
        ("0x1FFFFFF", 0xFFFFFF),
    ];
    for (text, expected) in cases {
        assert_eq!(text.parse::<Rgb>().unwrap(), Rgb::new(expected), "{text}");
    }

    for bad in ["", "#", "0x", "#GGGGGG", "blue"] {
        assert!(
            matches!(bad.parse::<Rgb>(), Err(GlowError::InvalidColor(_))),
            "{bad:?} should be rejected"
        );
    }
}
