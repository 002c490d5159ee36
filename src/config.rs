//! Optional installer settings (`/etc/i3-xfce/config.toml`)

use anyhow::{Context, Result};
use playbook::{Error, RendererSettings};
use playbook::ansible::DEFAULT_PROGRAM;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Roles directory, `~` and `$VARS` expanded
    pub roles_dir: Option<String>,
    /// Engine executable name or path
    pub engine: String,
    /// Progress repaint interval
    pub tick_ms: u64,
    /// Delay after each task start
    pub pacing_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roles_dir: None,
            engine: DEFAULT_PROGRAM.to_string(),
            tick_ms: 100,
            pacing_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings from the configured file, defaults if it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            anyhow::Error::from(Error::Configuration(format!(
                "Invalid config file {}: {}",
                path.display(),
                e
            )))
        })
    }

    pub fn renderer(&self) -> RendererSettings {
        RendererSettings {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            pacing: Duration::from_millis(self.pacing_ms),
            hidden: !console::user_attended_stderr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine, "ansible-playbook");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "roles_dir = \"/opt/roles\"\npacing_ms = 0\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.roles_dir.as_deref(), Some("/opt/roles"));
        assert_eq!(settings.pacing_ms, 0);
        assert_eq!(settings.tick_ms, 100);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_ms = \"fast\"").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_renderer_settings() {
        let settings = Settings {
            tick_ms: 0,
            pacing_ms: 250,
            ..Settings::default()
        };
        let renderer = settings.renderer();
        assert_eq!(renderer.tick, Duration::from_millis(1));
        assert_eq!(renderer.pacing, Duration::from_millis(250));
    }
}
