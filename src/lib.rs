// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Thermalert - Thermal Alert Engine
//!
//! Turns a stream of calibrated 2-D temperature-grid frames into actionable
//! alerts:
//! - Hot/cold cluster detection with spatial grouping
//! - Statistical (z-score) anomaly scoring
//! - Noise-tolerant gating: hysteresis, minimum duration, per-location cooldown
//! - Standing per-pixel thresholds with edge-triggered latching
//! - Continuous, smoothed auto-ranging to the observed distribution
//! - Atomically-swappable temperature profiles and derived isotherms
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Thermal Engine                         │
//! ├────────────────────────────────────────────────────────────┤
//! │ ThermalFrame ──┬─▶ ┌──────────────┐ ─▶ alerts ─┐           │
//! │                │   │ AlertRule    │            │           │
//! │                │   │ Engine       │            ▼           │
//! │                │   └──────────────┘      ┌───────────┐     │
//! │                │   ┌──────────────┐  ──▶ │ Alert Bus │ ──▶ │ sinks
//! │                └─▶ │ Range        │      └───────────┘     │
//! │                    │ Controller   │ ─▶ adaptive range      │
//! │                    └──────────────┘                        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Acquisition, encoding, and rendering are external collaborators: the
//! engine accepts already-calibrated frames and emits structured events.

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod frame;
pub mod notify;
pub mod range;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::ThermalEngine;
pub use detection::{
    AlertPriority, AlertRule, AlertRuleEngine, AlertStatistics, RuleDetector, RuleType,
    SpatialClusterer, ThermalAlert,
};
pub use error::{Result, ThermalError};
pub use frame::ThermalFrame;
pub use notify::{AlertBus, LogSink, NotificationMethod, NotificationSink};
pub use range::{
    AlertThreshold, AutoRangeSettings, RangeController, TemperatureProfile, TemperatureRange,
};

/// Thermalert version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Thermalert name
pub const NAME: &str = "Thermalert";
