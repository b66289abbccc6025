// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Per-rule detectors and the detector registry

use std::collections::HashMap;

use serde_json::json;
use tracing::trace;

use crate::error::Result;
use crate::frame::ThermalFrame;
use super::{AlertRule, BoundingBox, Cluster, FlaggedPoint, RuleType, SpatialClusterer};

/// One pre-gating detection produced by a detector: a cluster plus the values
/// the engine needs to gate and materialize an alert.
#[derive(Debug, Clone)]
pub struct Finding {
    /// The detected cluster
    pub cluster: Cluster,
    /// Representative temperature for the alert
    pub temperature: f64,
    /// Value compared against the rule threshold; drives hysteresis gating
    pub metric: f64,
    /// Human-readable description
    pub message: String,
    /// Diagnostic fields copied onto the alert
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A detector evaluates one rule against one frame.
///
/// Detectors are stateless over frames; anything temporal lives in the rule
/// engine. New rule types plug in through `DetectorRegistry::register`, so
/// the engine dispatch loop never enumerates rule types.
pub trait RuleDetector: Send + Sync {
    /// Scan the frame and return every violation cluster, pre-gating.
    fn evaluate(&self, frame: &ThermalFrame, rule: &AlertRule) -> Result<Vec<Finding>>;

    /// Current metric within a previously-triggered region, used for
    /// hysteresis re-arm checks. `None` when the concept does not apply.
    fn region_metric(
        &self,
        _frame: &ThermalFrame,
        _rule: &AlertRule,
        _region: &BoundingBox,
    ) -> Option<f64> {
        None
    }
}

/// Maps rule types to their detectors.
///
/// `RapidChange` and `Pattern` ship without a default detector; rules of
/// those types evaluate to nothing until a caller registers one.
pub struct DetectorRegistry {
    detectors: HashMap<RuleType, Box<dyn RuleDetector>>,
}

impl DetectorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            detectors: HashMap::new(),
        }
    }

    /// Registry with the built-in detectors: threshold scans for
    /// high/low temperature, z-score for anomaly.
    pub fn with_defaults(threshold_radius: f64, anomaly_radius: f64) -> Self {
        let mut registry = Self::new();
        registry.register(
            RuleType::HighTemperature,
            Box::new(ThresholdDetector::new(threshold_radius)),
        );
        registry.register(
            RuleType::LowTemperature,
            Box::new(ThresholdDetector::new(threshold_radius)),
        );
        registry.register(
            RuleType::Anomaly,
            Box::new(StatisticalDetector::new(anomaly_radius)),
        );
        registry
    }

    /// Register (or replace) the detector for a rule type.
    pub fn register(&mut self, rule_type: RuleType, detector: Box<dyn RuleDetector>) {
        self.detectors.insert(rule_type, detector);
    }

    /// Detector for a rule type, if one is registered.
    pub fn get(&self, rule_type: RuleType) -> Option<&dyn RuleDetector> {
        self.detectors.get(&rule_type).map(|d| d.as_ref())
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_defaults(5.0, 10.0)
    }
}

/// Pixel scan against an absolute °C threshold, for `HighTemperature` and
/// `LowTemperature` rules.
pub struct ThresholdDetector {
    clusterer: SpatialClusterer,
}

impl ThresholdDetector {
    /// Detector clustering flagged pixels within `cluster_radius`.
    pub fn new(cluster_radius: f64) -> Self {
        Self {
            clusterer: SpatialClusterer::new(cluster_radius),
        }
    }

    fn violates(rule: &AlertRule, temp: f64) -> bool {
        match rule.rule_type {
            RuleType::HighTemperature => temp >= rule.threshold,
            RuleType::LowTemperature => temp <= rule.threshold,
            _ => false,
        }
    }
}

impl RuleDetector for ThresholdDetector {
    fn evaluate(&self, frame: &ThermalFrame, rule: &AlertRule) -> Result<Vec<Finding>> {
        let mut flagged = Vec::new();
        for (x, y, temp) in frame.iter_pixels() {
            if let Some(region) = &rule.region {
                if !region.contains(x, y) {
                    continue;
                }
            }
            if Self::violates(rule, temp) {
                flagged.push(FlaggedPoint {
                    x,
                    y,
                    temperature: temp,
                });
            }
        }

        if flagged.len() < rule.conditions.min_pixel_count {
            trace!(
                rule = %rule.id,
                flagged = flagged.len(),
                min = rule.conditions.min_pixel_count,
                "flagged set below minimum pixel count"
            );
            return Ok(Vec::new());
        }

        let clusters = if rule.conditions.spatial_filtering {
            self.clusterer.cluster(&flagged)
        } else {
            // Unfiltered: the whole flagged set is one cluster
            SpatialClusterer::new(f64::MAX).cluster(&flagged)
        };

        let high = rule.rule_type == RuleType::HighTemperature;
        let findings = clusters
            .into_iter()
            .map(|cluster| {
                let temperature = if high { cluster.max_temp } else { cluster.min_temp };
                let message = format!(
                    "{} temperature {:.1}°C at ({:.0}, {:.0}), {} px",
                    if high { "High" } else { "Low" },
                    temperature,
                    cluster.centroid.x,
                    cluster.centroid.y,
                    cluster.pixel_count()
                );
                let metadata = HashMap::from([
                    ("pixel_count".to_string(), json!(cluster.pixel_count())),
                    ("average_temperature".to_string(), json!(cluster.mean_temp)),
                    ("threshold".to_string(), json!(rule.threshold)),
                ]);
                Finding {
                    temperature,
                    metric: temperature,
                    message,
                    metadata,
                    cluster,
                }
            })
            .collect();

        Ok(findings)
    }

    fn region_metric(
        &self,
        frame: &ThermalFrame,
        rule: &AlertRule,
        region: &BoundingBox,
    ) -> Option<f64> {
        let mut metric: Option<f64> = None;
        for (x, y, temp) in frame.iter_pixels() {
            if !region.contains(x, y) {
                continue;
            }
            metric = Some(match (metric, rule.rule_type) {
                (None, _) => temp,
                (Some(m), RuleType::LowTemperature) => m.min(temp),
                (Some(m), _) => m.max(temp),
            });
        }
        metric
    }
}

/// Z-score scan against the frame's own distribution, for `Anomaly` rules.
/// The rule threshold is a sigma count.
pub struct StatisticalDetector {
    clusterer: SpatialClusterer,
}

impl StatisticalDetector {
    /// Detector clustering anomalous pixels within `cluster_radius`. Anomaly
    /// clustering uses a wider radius than threshold clustering since
    /// statistical outliers cohere more loosely in space.
    pub fn new(cluster_radius: f64) -> Self {
        Self {
            clusterer: SpatialClusterer::new(cluster_radius),
        }
    }

    /// Population standard deviation over the whole frame.
    fn std_dev(frame: &ThermalFrame) -> f64 {
        let n = frame.temperature_data.len() as f64;
        if n < 1.0 {
            return 0.0;
        }
        let mean = frame.avg_temp;
        let variance = frame
            .temperature_data
            .iter()
            .map(|&t| (t - mean).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }
}

impl RuleDetector for StatisticalDetector {
    fn evaluate(&self, frame: &ThermalFrame, rule: &AlertRule) -> Result<Vec<Finding>> {
        let mean = frame.avg_temp;
        let std = Self::std_dev(frame);

        // A flat frame has no outliers
        if std < 1e-10 {
            return Ok(Vec::new());
        }

        let mut flagged = Vec::new();
        for (x, y, temp) in frame.iter_pixels() {
            if let Some(region) = &rule.region {
                if !region.contains(x, y) {
                    continue;
                }
            }
            if (temp - mean).abs() / std >= rule.threshold {
                flagged.push(FlaggedPoint {
                    x,
                    y,
                    temperature: temp,
                });
            }
        }

        if flagged.len() < rule.conditions.min_pixel_count {
            return Ok(Vec::new());
        }

        let clusters = self.clusterer.cluster(&flagged);
        let findings = clusters
            .into_iter()
            .map(|cluster| {
                let z_score = (cluster.mean_temp - mean) / std;
                let message = format!(
                    "Statistical anomaly ({:+.1}σ) at ({:.0}, {:.0}), {} px",
                    z_score,
                    cluster.centroid.x,
                    cluster.centroid.y,
                    cluster.pixel_count()
                );
                let metadata = HashMap::from([
                    ("pixel_count".to_string(), json!(cluster.pixel_count())),
                    ("z_score".to_string(), json!(z_score)),
                    ("frame_mean".to_string(), json!(mean)),
                    ("threshold".to_string(), json!(rule.threshold)),
                ]);
                Finding {
                    temperature: cluster.mean_temp,
                    metric: z_score.abs(),
                    message,
                    metadata,
                    cluster,
                }
            })
            .collect();

        Ok(findings)
    }

    fn region_metric(
        &self,
        frame: &ThermalFrame,
        _rule: &AlertRule,
        region: &BoundingBox,
    ) -> Option<f64> {
        let std = Self::std_dev(frame);
        if std < 1e-10 {
            return Some(0.0);
        }
        let mean = frame.avg_temp;
        frame
            .iter_pixels()
            .filter(|&(x, y, _)| region.contains(x, y))
            .map(|(_, _, t)| (t - mean).abs() / std)
            .fold(None, |acc: Option<f64>, z| {
                Some(acc.map_or(z, |m| m.max(z)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_hotspot(width: usize, height: usize, base: f64, hot: &[(usize, usize)], hot_temp: f64) -> ThermalFrame {
        let mut data = vec![base; width * height];
        for &(x, y) in hot {
            data[y * width + x] = hot_temp;
        }
        ThermalFrame::from_data(0, 1, width, height, data).unwrap()
    }

    #[test]
    fn test_high_threshold_flags_cluster() {
        let hot: Vec<(usize, usize)> = (0..4).flat_map(|y| (0..3).map(move |x| (x, y))).collect();
        let frame = frame_with_hotspot(16, 16, 20.0, &hot, 85.0);
        let rule = AlertRule::new("r1", "hot", RuleType::HighTemperature, 80.0);

        let detector = ThresholdDetector::new(5.0);
        let findings = detector.evaluate(&frame, &rule).unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].temperature, 85.0);
        assert_eq!(findings[0].cluster.pixel_count(), 12);
    }

    #[test]
    fn test_min_pixel_count_rejects_small_set() {
        let hot = vec![(0, 0), (1, 0), (0, 1), (1, 1), (2, 0)];
        let frame = frame_with_hotspot(16, 16, 20.0, &hot, 85.0);
        let mut rule = AlertRule::new("r1", "hot", RuleType::HighTemperature, 80.0);
        rule.conditions.min_pixel_count = 10;

        let detector = ThresholdDetector::new(5.0);
        assert!(detector.evaluate(&frame, &rule).unwrap().is_empty());
    }

    #[test]
    fn test_low_threshold_uses_cluster_min() {
        let mut data = vec![20.0; 64];
        data[4 * 8 + 4] = -12.0;
        data[4 * 8 + 5] = -8.0;
        let frame = ThermalFrame::from_data(0, 1, 8, 8, data).unwrap();

        let rule = AlertRule::new("r1", "cold", RuleType::LowTemperature, 0.0);
        let detector = ThresholdDetector::new(5.0);
        let findings = detector.evaluate(&frame, &rule).unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].temperature, -12.0);
    }

    #[test]
    fn test_region_restriction() {
        let frame = frame_with_hotspot(16, 16, 20.0, &[(0, 0), (15, 15)], 90.0);
        let mut rule = AlertRule::new("r1", "hot", RuleType::HighTemperature, 80.0);
        rule.region = Some(crate::detection::RuleRegion {
            x: 8,
            y: 8,
            width: 8,
            height: 8,
        });

        let detector = ThresholdDetector::new(5.0);
        let findings = detector.evaluate(&frame, &rule).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].cluster.points[0].x, 15);
    }

    #[test]
    fn test_anomaly_flat_frame_is_silent() {
        let frame = ThermalFrame::from_data(0, 1, 8, 8, vec![25.0; 64]).unwrap();
        let rule = AlertRule::new("a1", "anomaly", RuleType::Anomaly, 3.0);

        let detector = StatisticalDetector::new(10.0);
        assert!(detector.evaluate(&frame, &rule).unwrap().is_empty());
    }

    #[test]
    fn test_anomaly_flags_outlier_with_z_score() {
        let mut data = vec![20.0; 256];
        data[8 * 16 + 8] = 60.0;
        let frame = ThermalFrame::from_data(0, 1, 16, 16, data).unwrap();
        let rule = AlertRule::new("a1", "anomaly", RuleType::Anomaly, 3.0);

        let detector = StatisticalDetector::new(10.0);
        let findings = detector.evaluate(&frame, &rule).unwrap();

        assert_eq!(findings.len(), 1);
        let z = findings[0].metadata.get("z_score").unwrap().as_f64().unwrap();
        assert!(z > 3.0);
        assert_eq!(findings[0].temperature, 60.0);
    }

    #[test]
    fn test_unregistered_types_have_no_default() {
        let registry = DetectorRegistry::default();
        assert!(registry.get(RuleType::RapidChange).is_none());
        assert!(registry.get(RuleType::Pattern).is_none());
        assert!(registry.get(RuleType::HighTemperature).is_some());
    }
}
