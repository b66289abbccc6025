// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Range module - active temperature range, thresholds, profiles, auto-ranging

mod controller;
mod isotherm;

pub use controller::*;
pub use isotherm::*;

use serde::{Deserialize, Serialize};

use crate::detection::AlertPriority;
use crate::error::{Result, ThermalError};

/// The active detection/display temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    /// Lower bound (°C)
    pub min: f64,
    /// Upper bound (°C); always strictly greater than `min`
    pub max: f64,
}

impl TemperatureRange {
    /// Construct a validated range. `min < max` is an invariant, not a hint.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ThermalError::config("range bounds must be finite"));
        }
        if min >= max {
            return Err(ThermalError::config(format!(
                "invalid range: min {min} >= max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Width of the range in °C.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Midpoint of the range.
    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// True when `temp` falls inside the range, bounds included.
    pub fn contains(&self, temp: f64) -> bool {
        temp >= self.min && temp <= self.max
    }
}

/// Detection-sensitivity parameters shared with the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Minimum °C delta treated as signal
    pub temperature_threshold: f64,

    /// Noise suppression strength, 0 (off) to 1 (maximum)
    pub noise_reduction: f64,

    /// Temporal smoothing window (ms)
    pub temporal_window_ms: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            temperature_threshold: 2.0,
            noise_reduction: 0.3,
            temporal_window_ms: 1000,
        }
    }
}

/// Trigger condition of a standing threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdCondition {
    /// Fires when a pixel is at or above `temperature`
    Above,
    /// Fires when a pixel is at or below `temperature`
    Below,
    /// Fires when a pixel is between `temperature` and `upper`, inclusive
    Range,
}

/// A simpler standing rule owned by the range controller, evaluated per
/// pixel with no clustering. Independent from `AlertRule`; both can fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThreshold {
    /// Unique threshold name; stamped on alerts as the rule id
    pub name: String,

    /// Trigger temperature (°C); lower bound for `Range`
    pub temperature: f64,

    /// Upper bound for `Range`; unused otherwise
    pub upper: Option<f64>,

    /// Trigger condition
    pub condition: ThresholdCondition,

    /// °C a pixel must cross back beyond before it can fire again
    pub hysteresis: f64,

    /// Alert priority; violations default to `Low` when unset
    pub priority: Option<AlertPriority>,

    /// Disabled thresholds are skipped
    pub enabled: bool,

    /// Display color (hex)
    pub color: String,
}

impl AlertThreshold {
    /// A threshold with no hysteresis and default priority.
    pub fn new(name: &str, temperature: f64, condition: ThresholdCondition) -> Self {
        Self {
            name: name.to_string(),
            temperature,
            upper: None,
            condition,
            hysteresis: 0.0,
            priority: None,
            enabled: true,
            color: "#ff4040".to_string(),
        }
    }

    /// True when `temp` violates the threshold.
    pub fn violates(&self, temp: f64) -> bool {
        match self.condition {
            ThresholdCondition::Above => temp >= self.temperature,
            ThresholdCondition::Below => temp <= self.temperature,
            ThresholdCondition::Range => {
                let upper = self.upper.unwrap_or(self.temperature);
                temp >= self.temperature && temp <= upper
            }
        }
    }

    /// True when `temp` is back beyond the hysteresis dead band, clearing
    /// the pixel's latch.
    pub fn cleared(&self, temp: f64) -> bool {
        match self.condition {
            ThresholdCondition::Above => temp < self.temperature - self.hysteresis,
            ThresholdCondition::Below => temp > self.temperature + self.hysteresis,
            ThresholdCondition::Range => {
                let upper = self.upper.unwrap_or(self.temperature);
                temp < self.temperature - self.hysteresis || temp > upper + self.hysteresis
            }
        }
    }
}

/// Profile category, for grouping in selection UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileCategory {
    /// Body-temperature work: screening, search
    Person,
    /// Electrical inspection: panels, connections
    Electrical,
    /// Building envelope: insulation, moisture
    Building,
    /// Industrial equipment: bearings, motors
    Industrial,
    /// User-created
    Custom,
}

/// A named, atomically-swappable bundle of range, detection settings, and
/// standing thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureProfile {
    /// Unique profile id
    pub id: String,

    /// Display name
    pub name: String,

    /// Grouping category
    pub category: ProfileCategory,

    /// Active range the profile installs
    pub range: TemperatureRange,

    /// Detection settings the profile installs
    pub detection: DetectionSettings,

    /// Standing thresholds the profile installs
    pub thresholds: Vec<AlertThreshold>,
}

/// Auto-ranging adaptation policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoRangeSettings {
    /// Whether the interval-driven adaptation runs
    pub enabled: bool,

    /// Exponential smoothing factor toward the computed bounds (0-1)
    pub adaptation_rate: f64,

    /// Percentile trimmed from each tail; strictly between 1 and 50
    pub percentile: f64,

    /// °C of padding added outside the trimmed bounds
    pub margin: f64,

    /// Seconds between adaptations
    pub update_interval_secs: u64,

    /// Minimum span of the adapted range (°C)
    pub min_range: f64,

    /// Maximum span of the adapted range (°C)
    pub max_range: f64,
}

impl Default for AutoRangeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            adaptation_rate: 0.3,
            percentile: 5.0,
            margin: 5.0,
            update_interval_secs: 5,
            min_range: 5.0,
            max_range: 150.0,
        }
    }
}

impl AutoRangeSettings {
    /// Check the invariants: percentile strictly in (1, 50), rate in [0, 1],
    /// positive span bounds with `min_range < max_range`.
    pub fn validate(&self) -> Result<()> {
        if !(self.percentile > 1.0 && self.percentile < 50.0) {
            return Err(ThermalError::config(format!(
                "percentile {} must be strictly between 1 and 50",
                self.percentile
            )));
        }
        if !(0.0..=1.0).contains(&self.adaptation_rate) {
            return Err(ThermalError::config(format!(
                "adaptation rate {} must be within [0, 1]",
                self.adaptation_rate
            )));
        }
        if self.min_range <= 0.0 || self.min_range >= self.max_range {
            return Err(ThermalError::config(format!(
                "span bounds {}..{} are invalid",
                self.min_range, self.max_range
            )));
        }
        if self.margin < 0.0 {
            return Err(ThermalError::config("margin must be non-negative"));
        }
        Ok(())
    }
}

/// One-shot environmental context for detection-sensitivity adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalContext {
    /// Ambient air temperature (°C)
    pub ambient_temp: f64,

    /// Relative humidity (0-100 %)
    pub humidity: f64,

    /// Airflow speed (m/s)
    pub airflow: f64,
}

/// Summary statistics over the rolling sample window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemperatureStatistics {
    /// Samples in the window
    pub count: usize,
    /// Mean of the window
    pub mean: f64,
    /// Median of the window
    pub median: f64,
    /// Sample standard deviation of the window
    pub std_dev: f64,
    /// Coldest sample
    pub min: f64,
    /// Hottest sample
    pub max: f64,
    /// Slow EMA of per-frame medians
    pub background: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(TemperatureRange::new(50.0, 10.0).is_err());
        assert!(TemperatureRange::new(10.0, 10.0).is_err());
        assert!(TemperatureRange::new(10.0, 50.0).is_ok());
    }

    #[test]
    fn test_threshold_conditions() {
        let above = AlertThreshold::new("hot", 60.0, ThresholdCondition::Above);
        assert!(above.violates(60.0));
        assert!(!above.violates(59.9));

        let below = AlertThreshold::new("cold", 0.0, ThresholdCondition::Below);
        assert!(below.violates(-5.0));
        assert!(!below.violates(0.1));

        let mut band = AlertThreshold::new("band", 30.0, ThresholdCondition::Range);
        band.upper = Some(40.0);
        assert!(band.violates(35.0));
        assert!(!band.violates(45.0));
    }

    #[test]
    fn test_threshold_hysteresis_clearing() {
        let mut above = AlertThreshold::new("hot", 60.0, ThresholdCondition::Above);
        above.hysteresis = 3.0;
        assert!(!above.cleared(58.0)); // inside the dead band
        assert!(above.cleared(56.9));
    }

    #[test]
    fn test_auto_range_settings_invariants() {
        assert!(AutoRangeSettings::default().validate().is_ok());

        let mut bad = AutoRangeSettings::default();
        bad.percentile = 50.0;
        assert!(bad.validate().is_err());

        let mut bad = AutoRangeSettings::default();
        bad.percentile = 1.0;
        assert!(bad.validate().is_err());

        let mut bad = AutoRangeSettings::default();
        bad.adaptation_rate = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = AutoRangeSettings::default();
        bad.min_range = 200.0;
        assert!(bad.validate().is_err());
    }
}
