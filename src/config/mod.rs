//! Configuration: lighting overrides, application settings and their storage.

pub mod overrides;
pub mod path;
pub mod settings;
pub mod store;

pub use overrides::{LightingOverrides, Zone};
pub use path::{CONFIG_DIR_ENV, resolve_config_dir};
pub use settings::{
    AppConfig, CaptureArea, CaptureSettings, MIN_HEARTBEAT_INTERVAL, MIN_REQUEST_TIMEOUT,
    PollerSettings, ServiceSettings,
};
pub use store::{
    FileSettingsStore, MemorySettingsStore, SettingsStore, load_config_or_defaults,
    load_overrides_or_defaults,
};
