//! Config directory resolution.
//!
//! Resolution order: explicit directory (CLI flag), `GLOW_CONFIG_DIR`, then
//! the platform config directory (`~/.config/glow` on Linux). Paths may start
//! with `~`.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{GlowError, Result};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "GLOW_CONFIG_DIR";

/// File name of the application settings.
pub const CONFIG_FILE: &str = "config.toml";

/// File name of the lighting overrides.
pub const OVERRIDES_FILE: &str = "lighting_overrides.json";

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() { home } else { home.join(rest) };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    Ok(path.to_path_buf())
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| GlowError::ConfigParse("Could not determine home directory".to_string()))
}

/// Pick the config directory.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        trace!(dir = %dir.display(), "Using explicit config directory");
        return expand_home(dir);
    }

    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        trace!(env = CONFIG_DIR_ENV, "Using config directory from environment");
        return expand_home(Path::new(&dir));
    }

    let base = dirs::config_dir().ok_or_else(|| {
        GlowError::ConfigParse("Could not determine platform config directory".to_string())
    })?;
    Ok(base.join("glow"))
}
