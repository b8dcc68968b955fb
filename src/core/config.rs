use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::alert_level::AlertLevel;
use crate::core::monitor_tree::StateDirs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Default probe period for leaves whose worker has no own interval
    pub check_interval_secs: u64,
    /// How often `run` re-reads the inventory file
    pub reload_interval_secs: u64,
    /// Root levels at or above this are reported
    pub notify_threshold: AlertLevel,
    /// Threads of the probe runtime
    pub probe_threads: usize,
    /// Base for per-node state directories
    pub state_dir: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            reload_interval_secs: 5,
            notify_threshold: AlertLevel::High,
            probe_threads: 2,
            state_dir: None,
        }
    }
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(MonitorConfig::default());
        }

        let data = fs::read(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // If the file is empty or corrupted, return default config
        if data.is_empty() {
            return Ok(MonitorConfig::default());
        }

        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", config_path, e);
            MonitorConfig::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data =
            serde_json::to_vec_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("fleetmon").join("config.json"))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs.max(1))
    }

    pub fn state_dirs(&self) -> StateDirs {
        match &self.state_dir {
            Some(dir) => StateDirs::new(dir),
            None => StateDirs::new(StateDirs::default_base()),
        }
    }
}
