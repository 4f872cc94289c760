// Configuration management for the localnotify CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/localnotify/config.json
// - Linux: ~/.config/localnotify/config.json
// - Windows: %APPDATA%\localnotify\config.json

use anyhow::{Context, Result};
use localnotify_core::{BridgeConfig, Platform};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Platform the simulated native side reports when none is configured.
pub const DEFAULT_PLATFORM: &str = "Android";

#[derive(Debug, Clone)]
pub struct Config {
    pub bridge: BridgeConfig,
    path: PathBuf,
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("localnotify");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load from `path` (or the platform config file), creating a default
    /// config if none exists yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file()?,
        };

        if path.exists() {
            let bridge = BridgeConfig::load(&path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            Ok(Self { bridge, path })
        } else {
            let config = Self {
                bridge: BridgeConfig::default(),
                path,
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        self.bridge
            .save(&self.path)
            .with_context(|| format!("Failed to write config file {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Platform to simulate: `--platform` wins, then the config file.
    pub fn platform(&self, requested: Option<&str>) -> Platform {
        match requested {
            Some(id) => Platform::from_identifier(id),
            None => self
                .bridge
                .platform
                .clone()
                .unwrap_or_else(|| Platform::from_identifier(DEFAULT_PLATFORM)),
        }
    }

    /// Persist a default override. Values are parsed as JSON when they can
    /// be (`3`, `true`) and kept as text otherwise.
    pub fn set_default(&mut self, key: &str, raw: &str) -> Result<()> {
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        self.bridge.defaults.insert(key.to_string(), value);
        self.bridge.validate()?;
        self.save()
    }

    pub fn unset_default(&mut self, key: &str) -> Result<bool> {
        let removed = self.bridge.defaults.remove(key).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}
