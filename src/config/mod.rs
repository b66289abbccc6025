// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::range::{AutoRangeSettings, IsothermSettings};

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Rule engine configuration
    pub detection: DetectionConfig,

    /// Range controller configuration
    pub range: RangeConfig,

    /// Notification fan-out configuration
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            detection: DetectionConfig::default(),
            range: RangeConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("thermalert"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Rule engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Maximum historical alerts retained (oldest evicted)
    pub history_limit: usize,

    /// Cluster absorption radius for temperature-threshold rules (px)
    pub threshold_cluster_radius: f64,

    /// Cluster absorption radius for anomaly rules (px); wider, since
    /// statistical outliers cohere more loosely in space
    pub anomaly_cluster_radius: f64,

    /// Edge length of the grid cell used to discretize trigger locations (px)
    pub location_cell_px: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            threshold_cluster_radius: 5.0,
            anomaly_cluster_radius: 10.0,
            location_cell_px: 8.0,
        }
    }
}

/// Range controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeConfig {
    /// Rolling per-pixel sample window length
    pub sample_window: usize,

    /// Rolling per-frame median window length, for background estimation
    pub frame_window: usize,

    /// Smoothing factor for the background EMA (0-1, slow)
    pub background_alpha: f64,

    /// Initial active range lower bound (°C)
    pub initial_min: f64,

    /// Initial active range upper bound (°C)
    pub initial_max: f64,

    /// Auto-ranging policy
    pub auto_range: AutoRangeSettings,

    /// Isotherm generation settings
    pub isotherms: IsothermSettings,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            sample_window: 1000,
            frame_window: 50,
            background_alpha: 0.05,
            initial_min: 0.0,
            initial_max: 100.0,
            auto_range: AutoRangeSettings::default(),
            isotherms: IsothermSettings::default(),
        }
    }
}

/// Notification fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Broadcast channel capacity for alert fan-out
    pub bus_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { bus_capacity: 1000 }
    }
}
