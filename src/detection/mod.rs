// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Detection module - alert rules, detectors, clustering, and the rule engine

mod clustering;
mod detectors;
mod engine;

pub use clustering::*;
pub use detectors::*;
pub use engine::*;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::NotificationMethod;

/// Detection policy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    /// Pixels at or above the threshold (°C)
    HighTemperature,
    /// Pixels at or below the threshold (°C)
    LowTemperature,
    /// Frame-to-frame change rate (extension point, no built-in detector)
    RapidChange,
    /// Statistical outliers; threshold is a sigma count
    Anomaly,
    /// Shape/gradient analysis (extension point, no built-in detector)
    Pattern,
}

impl RuleType {
    /// Stable label used for statistics keys and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighTemperature => "high_temperature",
            Self::LowTemperature => "low_temperature",
            Self::RapidChange => "rapid_change",
            Self::Anomaly => "anomaly",
            Self::Pattern => "pattern",
        }
    }
}

/// Alert priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertPriority {
    /// Informational
    Low,
    /// Worth attention
    Medium,
    /// Needs action
    High,
    /// Needs immediate action
    Critical,
}

impl AlertPriority {
    /// Stable label used for statistics keys and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// A point in pixel space (fractional for centroids).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Column coordinate
    pub x: f64,
    /// Row coordinate
    pub y: f64,
}

/// Axis-aligned bounding box in pixel space, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Leftmost column
    pub min_x: usize,
    /// Topmost row
    pub min_y: usize,
    /// Rightmost column
    pub max_x: usize,
    /// Bottommost row
    pub max_y: usize,
}

impl BoundingBox {
    /// Single-pixel box.
    pub fn pixel(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// True when `(x, y)` lies inside the box.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Optional spatial restriction on a rule: only pixels inside the region are
/// scanned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleRegion {
    /// Left edge
    pub x: usize,
    /// Top edge
    pub y: usize,
    /// Region width
    pub width: usize,
    /// Region height
    pub height: usize,
}

impl RuleRegion {
    /// True when `(x, y)` lies inside the region.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Secondary gating conditions on a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConditions {
    /// Minimum number of violating pixels before an alert is considered
    pub min_pixel_count: usize,

    /// Apply spatial clustering to the flagged set
    pub spatial_filtering: bool,

    /// Apply min-duration/hysteresis gating across frames
    pub temporal_filtering: bool,
}

impl Default for RuleConditions {
    fn default() -> Self {
        Self {
            min_pixel_count: 1,
            spatial_filtering: true,
            temporal_filtering: true,
        }
    }
}

/// A named detection policy evaluated against every frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule id
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Detection policy kind
    pub rule_type: RuleType,

    /// °C for temperature rules, sigma count for anomaly rules
    pub threshold: f64,

    /// Priority stamped on emitted alerts
    pub priority: AlertPriority,

    /// Disabled rules are skipped entirely
    pub enabled: bool,

    /// Optional spatial restriction
    pub region: Option<RuleRegion>,

    /// °C of slack the metric must cross back through before re-arming
    pub hysteresis: f64,

    /// Milliseconds a violation must persist before triggering
    pub min_duration_ms: u64,

    /// Milliseconds of suppression after a trigger, per location
    pub cooldown_ms: u64,

    /// Delivery channels for this rule's alerts
    pub notification_methods: Vec<NotificationMethod>,

    /// Secondary gating conditions
    pub conditions: RuleConditions,
}

impl AlertRule {
    /// A rule with permissive gating defaults; callers adjust fields as needed.
    pub fn new(id: &str, name: &str, rule_type: RuleType, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rule_type,
            threshold,
            priority: AlertPriority::Medium,
            enabled: true,
            region: None,
            hysteresis: 0.0,
            min_duration_ms: 0,
            cooldown_ms: 0,
            notification_methods: vec![NotificationMethod::Log],
            conditions: RuleConditions::default(),
        }
    }
}

/// A materialized detection event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalAlert {
    /// Unique alert id
    pub id: String,

    /// Rule id (or standing-threshold name) that produced the alert
    pub rule_id: String,

    /// Kind of the producing rule
    pub rule_type: RuleType,

    /// Priority inherited from the rule
    pub priority: AlertPriority,

    /// Frame-clock trigger time in milliseconds
    pub timestamp_ms: u64,

    /// Wall-clock trigger time, for display/export
    pub observed_at: DateTime<Utc>,

    /// Human-readable description
    pub message: String,

    /// Cluster centroid (or violating pixel)
    pub location: Point,

    /// Representative temperature: cluster max (high), min (low), mean (anomaly)
    pub temperature: f64,

    /// Bounding box of the detected cluster
    pub region: BoundingBox,

    /// Free-form diagnostics: pixel count, average, z-score, threshold
    pub metadata: HashMap<String, serde_json::Value>,

    /// Set by `acknowledge_alert`
    pub acknowledged: bool,

    /// Set by `resolve_alert`
    pub resolved: bool,
}

/// Lifecycle state of one `(rule, location)` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    /// Ready to trigger once a violation persists long enough
    Armed,
    /// A trigger was emitted this frame
    Triggered,
    /// Suppressing re-triggers until the cooldown deadline passes
    Cooling,
}

/// Running counters over everything the engine has emitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStatistics {
    /// Total alerts emitted since engine creation
    pub total_alerts: u64,

    /// Alerts by rule type label
    pub by_type: HashMap<String, u64>,

    /// Alerts by priority label
    pub by_priority: HashMap<String, u64>,

    /// Alerts by rule id
    pub by_rule: HashMap<String, u64>,

    /// Wall-clock time the engine started counting
    pub started_at: Option<DateTime<Utc>>,
}

impl AlertStatistics {
    pub(crate) fn record(&mut self, alert: &ThermalAlert) {
        self.total_alerts += 1;
        *self
            .by_type
            .entry(alert.rule_type.label().to_string())
            .or_insert(0) += 1;
        *self
            .by_priority
            .entry(alert.priority.label().to_string())
            .or_insert(0) += 1;
        *self.by_rule.entry(alert.rule_id.clone()).or_insert(0) += 1;
    }
}
