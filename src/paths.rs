//! Centralized path resolution for i3-xfce
//!
//! # Environment Variables
//!
//! - `I3XFCE_CONFIG` - Override the config file (default `/etc/i3-xfce/config.toml`)
//! - `I3XFCE_ROLES_DIR` - Override the roles directory
//!
//! # Roles Directory Resolution Priority
//!
//! 1. `I3XFCE_ROLES_DIR` environment variable
//! 2. `roles_dir` from the config file
//! 3. `<exe_dir>/../share/i3-xfce/roles` (relocatable install)
//! 4. `/usr/share/i3-xfce/roles`
//!
//! The roles directory holds one sub-directory per action (`install`,
//! `uninstall`), each holding one role directory per part.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable for config file override
pub const ENV_CONFIG_FILE: &str = "I3XFCE_CONFIG";

/// Environment variable for roles directory override
pub const ENV_ROLES_DIR: &str = "I3XFCE_ROLES_DIR";

/// Config file used when no override is set
pub const SYSTEM_CONFIG_FILE: &str = "/etc/i3-xfce/config.toml";

/// Roles directory used when nothing else is found
pub const SYSTEM_ROLES_DIR: &str = "/usr/share/i3-xfce/roles";

/// Action directory listing the parts that can be selected
const PARTS_SOURCE: &str = "install";

/// Get the config file path
pub fn config_file() -> PathBuf {
    match std::env::var(ENV_CONFIG_FILE) {
        Ok(file) => {
            let path = expand(&file);
            log::debug!("Using config file from {}: {}", ENV_CONFIG_FILE, path.display());
            path
        }
        Err(_) => PathBuf::from(SYSTEM_CONFIG_FILE),
    }
}

/// Get the roles directory
pub fn roles_dir(configured: Option<&str>) -> PathBuf {
    let from_env = std::env::var(ENV_ROLES_DIR).ok();
    resolve_roles_dir(from_env.as_deref(), configured, bundled_roles_dir())
}

fn resolve_roles_dir(
    from_env: Option<&str>,
    configured: Option<&str>,
    bundled: Option<PathBuf>,
) -> PathBuf {
    // 1. Environment variable override
    if let Some(dir) = from_env {
        let path = expand(dir);
        log::debug!("Using roles dir from {}: {}", ENV_ROLES_DIR, path.display());
        return path;
    }

    // 2. Config file
    if let Some(dir) = configured {
        let path = expand(dir);
        log::debug!("Using roles dir from config: {}", path.display());
        return path;
    }

    // 3. Next to the executable
    if let Some(path) = bundled {
        log::debug!("Using bundled roles dir: {}", path.display());
        return path;
    }

    // 4. System default
    PathBuf::from(SYSTEM_ROLES_DIR)
}

/// `<exe_dir>/../share/i3-xfce/roles`, if it exists
fn bundled_roles_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let path = exe
        .parent()?
        .parent()?
        .join("share")
        .join("i3-xfce")
        .join("roles");
    path.is_dir().then_some(path)
}

/// Parts that can be applied, sorted by name
pub fn available_parts(roles_dir: &Path) -> Result<Vec<String>> {
    let dir = roles_dir.join(PARTS_SOURCE);
    let entries =
        fs::read_dir(&dir).with_context(|| format!("Could not read roles from {}", dir.display()))?;

    let mut parts = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            parts.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    parts.sort();
    Ok(parts)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
