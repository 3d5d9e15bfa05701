// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration for apphub-assembler
//!
//! All apphub-assembler data is stored under ~/.apphub-assembler/:
//! - ~/.apphub-assembler/config.json - classification tables and tunables
//! - ~/.apphub-assembler/log/ - rolling log files
//!
//! Every field is optional; anything missing falls back to the built-in value.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::classify::Classification;
use crate::pipeline::discovery::DiscoverySettings;

/// Shortest interval between long-running operation polls
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Get the base directory (~/.apphub-assembler/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".apphub-assembler"))
        .context("Could not determine home directory")
}

/// Directory holding the rolling log files
pub fn log_dir() -> Result<PathBuf> {
    Ok(base_dir()?.join("log"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Asset-type and location tables
    #[serde(flatten)]
    pub classification: Classification,
    /// Cloud Asset search page size
    pub page_size: u32,
    /// Interval between long-running operation polls
    pub poll_interval_ms: u64,
    /// Process a resource matched by several auto-detect searches only once
    pub dedupe_auto_detect: bool,
}

impl Default for Config {
    fn default() -> Self {
        let discovery = DiscoverySettings::default();
        Self {
            classification: Classification::default(),
            page_size: discovery.page_size,
            poll_interval_ms: 2000,
            dedupe_auto_detect: discovery.dedupe_auto_detect,
        }
    }
}

impl Config {
    /// Load config from the default location, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`, or return default if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path (~/.apphub-assembler/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    pub fn discovery_settings(&self, dedupe_override: bool) -> DiscoverySettings {
        DiscoverySettings {
            page_size: self.page_size,
            dedupe_auto_detect: self.dedupe_auto_detect || dedupe_override,
        }
    }

    /// Poll interval, never shorter than MIN_POLL_INTERVAL
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }
}
