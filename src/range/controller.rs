// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Range controller - adaptive range, standing thresholds, profiles

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RangeConfig;
use crate::detection::{AlertPriority, BoundingBox, Point, RuleType, ThermalAlert};
use crate::error::{Result, ThermalError};
use crate::frame::ThermalFrame;
use super::{
    generate_isotherms, AlertThreshold, AutoRangeSettings, DetectionSettings,
    EnvironmentalContext, Isotherm, IsothermSettings, ProfileCategory, TemperatureProfile,
    TemperatureRange, TemperatureStatistics, ThresholdCondition,
};

/// Ambient baseline the environmental adaptation measures against (°C).
const AMBIENT_BASELINE_C: f64 = 22.0;

/// Minimum trailing samples before auto-ranging adapts.
const MIN_AUTORANGE_SAMPLES: usize = 10;

/// Owns the shared mutable state rules read: the active temperature range,
/// detection-sensitivity parameters, standing thresholds, isotherms, and the
/// rolling temperature history that drives auto-ranging.
///
/// All methods take `&mut self`; callers serialize access (the engine facade
/// holds this behind a lock) because auto-ranging may be driven by a timer
/// independent of frame delivery.
pub struct RangeController {
    range: TemperatureRange,
    detection: DetectionSettings,
    thresholds: Vec<AlertThreshold>,
    isotherm_settings: IsothermSettings,
    isotherms: Vec<Isotherm>,
    auto_range: AutoRangeSettings,

    samples: VecDeque<f64>,
    sample_window: usize,
    frame_medians: VecDeque<f64>,
    frame_window: usize,
    background_alpha: f64,
    background: Option<f64>,

    profiles: HashMap<String, TemperatureProfile>,
    active_profile: Option<String>,
    manually_edited: bool,

    last_auto_range_ms: Option<u64>,

    /// Pixels currently latched per threshold; a latched pixel cannot fire
    /// again until its value clears the hysteresis dead band
    latched: HashSet<(String, usize)>,
}

impl RangeController {
    /// Controller with the built-in profile library installed.
    pub fn new(config: &RangeConfig) -> Self {
        let range = TemperatureRange {
            min: config.initial_min.min(config.initial_max - 1.0),
            max: config.initial_max,
        };
        let isotherms = generate_isotherms(&range, &config.isotherms);

        // Configured policy goes through the same invariant check as the
        // setter; a bad config falls back rather than poisoning adaptation
        let auto_range = match config.auto_range.validate() {
            Ok(()) => config.auto_range,
            Err(e) => {
                warn!(error = %e, "invalid auto-range policy in config, using defaults");
                AutoRangeSettings::default()
            }
        };

        let mut controller = Self {
            range,
            detection: DetectionSettings::default(),
            thresholds: Vec::new(),
            isotherm_settings: config.isotherms,
            isotherms,
            auto_range,
            samples: VecDeque::with_capacity(config.sample_window),
            sample_window: config.sample_window.max(1),
            frame_medians: VecDeque::with_capacity(config.frame_window),
            frame_window: config.frame_window.max(1),
            background_alpha: config.background_alpha.clamp(0.0, 1.0),
            background: None,
            profiles: HashMap::new(),
            active_profile: None,
            manually_edited: false,
            last_auto_range_ms: None,
            latched: HashSet::new(),
        };
        for profile in Self::builtin_profiles() {
            controller.profiles.insert(profile.id.clone(), profile);
        }
        controller
    }

    fn builtin_profiles() -> Vec<TemperatureProfile> {
        let mut fever = AlertThreshold::new("fever", 38.0, ThresholdCondition::Above);
        fever.priority = Some(AlertPriority::High);
        fever.hysteresis = 0.3;

        let mut hot_connection =
            AlertThreshold::new("hot_connection", 90.0, ThresholdCondition::Above);
        hot_connection.priority = Some(AlertPriority::Critical);
        hot_connection.hysteresis = 5.0;

        let mut condensation =
            AlertThreshold::new("condensation_risk", 12.0, ThresholdCondition::Below);
        condensation.priority = Some(AlertPriority::Medium);
        condensation.hysteresis = 1.0;

        vec![
            TemperatureProfile {
                id: "person_screening".to_string(),
                name: "Person Screening".to_string(),
                category: ProfileCategory::Person,
                range: TemperatureRange {
                    min: 25.0,
                    max: 40.0,
                },
                detection: DetectionSettings {
                    temperature_threshold: 0.5,
                    noise_reduction: 0.5,
                    temporal_window_ms: 2000,
                },
                thresholds: vec![fever],
            },
            TemperatureProfile {
                id: "electrical_inspection".to_string(),
                name: "Electrical Inspection".to_string(),
                category: ProfileCategory::Electrical,
                range: TemperatureRange {
                    min: 0.0,
                    max: 120.0,
                },
                detection: DetectionSettings {
                    temperature_threshold: 5.0,
                    noise_reduction: 0.2,
                    temporal_window_ms: 500,
                },
                thresholds: vec![hot_connection],
            },
            TemperatureProfile {
                id: "building_envelope".to_string(),
                name: "Building Envelope".to_string(),
                category: ProfileCategory::Building,
                range: TemperatureRange {
                    min: -10.0,
                    max: 40.0,
                },
                detection: DetectionSettings {
                    temperature_threshold: 1.0,
                    noise_reduction: 0.4,
                    temporal_window_ms: 3000,
                },
                thresholds: vec![condensation],
            },
        ]
    }

    // ---- frame processing ---------------------------------------------

    /// Fold a frame into the temperature history, evaluate every standing
    /// threshold against every pixel, and run the auto-ranging interval.
    /// Threshold violations are reported per discrete violating pixel.
    pub fn process_frame(&mut self, frame: &ThermalFrame) -> Vec<ThermalAlert> {
        let now_ms = frame.timestamp_ms;
        self.ingest_samples(frame);

        let mut alerts = Vec::new();
        let enabled: Vec<AlertThreshold> = self
            .thresholds
            .iter()
            .filter(|t| t.enabled)
            .cloned()
            .collect();

        for threshold in enabled {
            for (x, y, temp) in frame.iter_pixels() {
                let pixel = y * frame.width + x;
                let key = (threshold.name.clone(), pixel);
                if threshold.violates(temp) {
                    // Edge-triggered per pixel: a latched pixel stays quiet
                    if self.latched.insert(key) {
                        alerts.push(Self::threshold_alert(&threshold, x, y, temp, now_ms));
                    }
                } else if threshold.cleared(temp) {
                    self.latched.remove(&key);
                }
            }
        }

        if self.auto_range.enabled {
            let due = match self.last_auto_range_ms {
                None => {
                    self.last_auto_range_ms = Some(now_ms);
                    false
                }
                Some(last) => {
                    now_ms.saturating_sub(last) >= self.auto_range.update_interval_secs * 1000
                }
            };
            if due {
                self.perform_auto_ranging();
                self.last_auto_range_ms = Some(now_ms);
            }
        }

        alerts
    }

    fn ingest_samples(&mut self, frame: &ThermalFrame) {
        let mut plausible = Vec::with_capacity(frame.temperature_data.len());
        let mut dropped = 0usize;
        for &t in &frame.temperature_data {
            if ThermalFrame::is_plausible(t) {
                plausible.push(t);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(
                frame = frame.frame_number,
                dropped, "implausible samples dropped from history"
            );
        }
        if plausible.is_empty() {
            return;
        }

        for &t in &plausible {
            if self.samples.len() >= self.sample_window {
                self.samples.pop_front();
            }
            self.samples.push_back(t);
        }

        let median = Self::median(&mut plausible);
        if self.frame_medians.len() >= self.frame_window {
            self.frame_medians.pop_front();
        }
        self.frame_medians.push_back(median);

        // Slow EMA of per-frame medians approximates the scene background
        self.background = Some(match self.background {
            None => median,
            Some(bg) => bg + (median - bg) * self.background_alpha,
        });
    }

    fn threshold_alert(
        threshold: &AlertThreshold,
        x: usize,
        y: usize,
        temp: f64,
        now_ms: u64,
    ) -> ThermalAlert {
        let rule_type = match threshold.condition {
            ThresholdCondition::Below => RuleType::LowTemperature,
            _ => RuleType::HighTemperature,
        };
        let condition = match threshold.condition {
            ThresholdCondition::Above => "above",
            ThresholdCondition::Below => "below",
            ThresholdCondition::Range => "range",
        };
        ThermalAlert {
            id: Uuid::new_v4().to_string(),
            rule_id: threshold.name.clone(),
            rule_type,
            priority: threshold.priority.unwrap_or(AlertPriority::Low),
            timestamp_ms: now_ms,
            observed_at: Utc::now(),
            message: format!(
                "Threshold '{}' {} {:.1}°C at ({x}, {y}): {temp:.1}°C",
                threshold.name, condition, threshold.temperature
            ),
            location: Point {
                x: x as f64,
                y: y as f64,
            },
            temperature: temp,
            region: BoundingBox::pixel(x, y),
            metadata: HashMap::from([
                ("threshold".to_string(), json!(threshold.temperature)),
                ("condition".to_string(), json!(condition)),
            ]),
            acknowledged: false,
            resolved: false,
        }
    }

    // ---- auto-ranging -------------------------------------------------

    /// Adapt the active range toward the trailing temperature distribution:
    /// trim the configured percentile from each tail, pad by the margin, and
    /// blend toward the result by the adaptation rate. The adapted span is
    /// clamped into `[min_range, max_range]`.
    pub fn perform_auto_ranging(&mut self) {
        if self.samples.len() < MIN_AUTORANGE_SAMPLES {
            return;
        }

        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let p = self.auto_range.percentile;
        let lo = Self::percentile(&sorted, p);
        let hi = Self::percentile(&sorted, 100.0 - p);

        let target_min = lo - self.auto_range.margin;
        let target_max = hi + self.auto_range.margin;

        // Exponential smoothing toward the target, never a hard jump
        let rate = self.auto_range.adaptation_rate;
        let mut new_min = self.range.min + (target_min - self.range.min) * rate;
        let mut new_max = self.range.max + (target_max - self.range.max) * rate;

        let center = (new_min + new_max) / 2.0;
        let span = new_max - new_min;
        if span < self.auto_range.min_range {
            new_min = center - self.auto_range.min_range / 2.0;
            new_max = center + self.auto_range.min_range / 2.0;
        } else if span > self.auto_range.max_range {
            new_min = center - self.auto_range.max_range / 2.0;
            new_max = center + self.auto_range.max_range / 2.0;
        }

        debug!(
            min = new_min,
            max = new_max,
            target_min,
            target_max,
            "auto-range adapted"
        );
        self.range = TemperatureRange {
            min: new_min,
            max: new_max,
        };
        if self.isotherm_settings.auto_generate {
            self.regenerate_isotherms();
        }
    }

    /// Turn the interval-driven adaptation on.
    pub fn enable_auto_range(&mut self) {
        self.auto_range.enabled = true;
    }

    /// Turn the interval-driven adaptation off.
    pub fn disable_auto_range(&mut self) {
        self.auto_range.enabled = false;
        self.last_auto_range_ms = None;
    }

    /// Replace the adaptation policy after validating its invariants.
    pub fn set_auto_range_settings(&mut self, settings: AutoRangeSettings) -> Result<()> {
        settings.validate()?;
        self.auto_range = settings;
        Ok(())
    }

    // ---- configuration ------------------------------------------------

    /// Set the range directly. A direct mutation clears the active-profile
    /// association.
    pub fn set_temperature_range(&mut self, min: f64, max: f64) -> Result<()> {
        let range = TemperatureRange::new(min, max)?;
        self.range = range;
        self.mark_manual_edit();
        if self.isotherm_settings.auto_generate {
            self.regenerate_isotherms();
        }
        Ok(())
    }

    /// Replace the detection-sensitivity parameters.
    pub fn set_detection_settings(&mut self, settings: DetectionSettings) -> Result<()> {
        if !(0.0..=1.0).contains(&settings.noise_reduction) {
            return Err(ThermalError::config(format!(
                "noise reduction {} must be within [0, 1]",
                settings.noise_reduction
            )));
        }
        self.detection = settings;
        self.mark_manual_edit();
        Ok(())
    }

    /// Add a standing threshold. Names are unique.
    pub fn add_alert_threshold(&mut self, threshold: AlertThreshold) -> Result<()> {
        if self.thresholds.iter().any(|t| t.name == threshold.name) {
            return Err(ThermalError::config(format!(
                "threshold '{}' already exists",
                threshold.name
            )));
        }
        info!(threshold = %threshold.name, "standing threshold added");
        self.thresholds.push(threshold);
        self.mark_manual_edit();
        Ok(())
    }

    /// Replace an existing standing threshold by name.
    pub fn update_alert_threshold(&mut self, threshold: AlertThreshold) -> Result<()> {
        let Some(slot) = self.thresholds.iter_mut().find(|t| t.name == threshold.name) else {
            return Err(ThermalError::config(format!(
                "unknown threshold '{}'",
                threshold.name
            )));
        };
        *slot = threshold;
        self.mark_manual_edit();
        Ok(())
    }

    /// Remove a standing threshold, clearing its pixel latches.
    pub fn remove_alert_threshold(&mut self, name: &str) -> Result<()> {
        let before = self.thresholds.len();
        self.thresholds.retain(|t| t.name != name);
        if self.thresholds.len() == before {
            return Err(ThermalError::config(format!("unknown threshold '{name}'")));
        }
        self.latched.retain(|(n, _)| n != name);
        self.mark_manual_edit();
        Ok(())
    }

    fn mark_manual_edit(&mut self) {
        self.manually_edited = true;
        self.active_profile = None;
    }

    // ---- profiles -----------------------------------------------------

    /// Atomically install a stored profile: range, detection settings, and
    /// thresholds swap together or not at all. Clears the manual-edit flag.
    pub fn apply_profile(&mut self, profile_id: &str) -> Result<()> {
        let Some(profile) = self.profiles.get(profile_id).cloned() else {
            return Err(ThermalError::config(format!(
                "unknown profile '{profile_id}'"
            )));
        };

        self.range = profile.range;
        self.detection = profile.detection;
        self.thresholds = profile.thresholds;
        self.latched.clear();
        self.active_profile = Some(profile.id.clone());
        self.manually_edited = false;
        if self.isotherm_settings.auto_generate {
            self.regenerate_isotherms();
        }
        info!(profile = %profile_id, "profile applied");
        Ok(())
    }

    /// Snapshot the current range/settings/thresholds into a new stored
    /// profile under `id`.
    pub fn create_custom_profile(&mut self, id: &str, name: &str) -> Result<()> {
        if self.profiles.contains_key(id) {
            return Err(ThermalError::config(format!("profile '{id}' already exists")));
        }
        let profile = TemperatureProfile {
            id: id.to_string(),
            name: name.to_string(),
            category: ProfileCategory::Custom,
            range: self.range,
            detection: self.detection,
            thresholds: self.thresholds.clone(),
        };
        self.profiles.insert(id.to_string(), profile);
        Ok(())
    }

    /// The profile currently associated with the active state, if the state
    /// has not been directly edited since it was applied.
    pub fn current_profile(&self) -> Option<&TemperatureProfile> {
        self.active_profile
            .as_deref()
            .and_then(|id| self.profiles.get(id))
    }

    /// All stored profiles, built-in and custom.
    pub fn profiles(&self) -> Vec<&TemperatureProfile> {
        self.profiles.values().collect()
    }

    // ---- environmental adaptation -------------------------------------

    /// Deterministic, bounded, one-shot sensitivity adjustment for a new
    /// environmental context. Not a continuous controller.
    pub fn set_environmental_context(&mut self, ctx: EnvironmentalContext) {
        let deviation = ctx.ambient_temp - AMBIENT_BASELINE_C;
        let nudge = (deviation * 0.05).clamp(-1.0, 1.0);
        self.detection.temperature_threshold =
            (self.detection.temperature_threshold + nudge).max(0.1);

        if ctx.humidity > 70.0 {
            self.detection.noise_reduction = (self.detection.noise_reduction + 0.1).min(0.9);
        }

        if ctx.airflow > 2.0 {
            self.detection.temporal_window_ms =
                ((self.detection.temporal_window_ms as f64 * 1.5) as u64).min(10_000);
        }

        debug!(
            ambient = ctx.ambient_temp,
            humidity = ctx.humidity,
            airflow = ctx.airflow,
            threshold = self.detection.temperature_threshold,
            "environmental context applied"
        );
    }

    // ---- queries ------------------------------------------------------

    /// The active temperature range.
    pub fn range(&self) -> TemperatureRange {
        self.range
    }

    /// The active detection-sensitivity parameters.
    pub fn detection_settings(&self) -> DetectionSettings {
        self.detection
    }

    /// The standing thresholds.
    pub fn thresholds(&self) -> &[AlertThreshold] {
        &self.thresholds
    }

    /// The current isotherm set.
    pub fn isotherms(&self) -> &[Isotherm] {
        &self.isotherms
    }

    /// The active adaptation policy.
    pub fn auto_range_settings(&self) -> AutoRangeSettings {
        self.auto_range
    }

    /// True once the state has been directly edited since the last profile
    /// application.
    pub fn is_manually_edited(&self) -> bool {
        self.manually_edited
    }

    /// Update isotherm spacing/generation and recompute the derived set.
    pub fn set_isotherm_settings(&mut self, settings: IsothermSettings) -> Result<()> {
        if settings.spacing <= 0.0 {
            return Err(ThermalError::config("isotherm spacing must be positive"));
        }
        self.isotherm_settings = settings;
        self.regenerate_isotherms();
        Ok(())
    }

    /// Recompute the isotherm set from the active range and spacing.
    pub fn regenerate_isotherms(&mut self) {
        self.isotherms = generate_isotherms(&self.range, &self.isotherm_settings);
    }

    /// Summary statistics over the rolling sample window.
    pub fn temperature_statistics(&self) -> TemperatureStatistics {
        if self.samples.is_empty() {
            return TemperatureStatistics {
                background: self.background,
                ..TemperatureStatistics::default()
            };
        }

        let count = self.samples.len();
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = Self::percentile(&sorted, 50.0);
        let variance = if count > 1 {
            sorted.iter().map(|&t| (t - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };

        TemperatureStatistics {
            count,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[count - 1],
            background: self.background,
        }
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let k = p / 100.0 * (sorted.len() - 1) as f64;
        let f = k.floor() as usize;
        let c = k.ceil() as usize;
        if f == c || c >= sorted.len() {
            sorted[f.min(sorted.len() - 1)]
        } else {
            sorted[f] + (sorted[c] - sorted[f]) * (k - f as f64)
        }
    }

    fn median(values: &mut [f64]) -> f64 {
        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RangeConfig {
        RangeConfig::default()
    }

    fn controller() -> RangeController {
        RangeController::new(&config())
    }

    fn flat_frame(t_ms: u64, n: u64, temp: f64) -> ThermalFrame {
        ThermalFrame::from_data(t_ms, n, 8, 8, vec![temp; 64]).unwrap()
    }

    #[test]
    fn test_auto_range_blends_toward_target() {
        let mut c = controller();
        c.set_auto_range_settings(AutoRangeSettings {
            enabled: true,
            adaptation_rate: 0.5,
            percentile: 5.0,
            margin: 5.0,
            update_interval_secs: 1,
            min_range: 5.0,
            max_range: 200.0,
        })
        .unwrap();

        // Uniform 10..30 window
        let data: Vec<f64> = (0..100).map(|i| 10.0 + 20.0 * i as f64 / 99.0).collect();
        let frame = ThermalFrame::from_data(0, 1, 10, 10, data).unwrap();
        c.process_frame(&frame);

        let before = c.range();
        c.perform_auto_ranging();
        let after = c.range();

        // Target is roughly [P5 - 5, P95 + 5] = [~6, ~34]; blending moves
        // halfway there from [0, 100], never jumping to the raw bounds
        assert!(after.min > before.min && after.min < 6.5);
        assert!(after.max < before.max && after.max > 33.5);
        assert!((after.min - 3.0).abs() < 1.0);
        assert!((after.max - 67.0).abs() < 1.0);
    }

    #[test]
    fn test_auto_range_enforces_min_span() {
        let mut c = controller();
        let mut settings = AutoRangeSettings::default();
        settings.adaptation_rate = 1.0;
        settings.min_range = 20.0;
        settings.margin = 0.0;
        c.set_auto_range_settings(settings).unwrap();

        c.process_frame(&flat_frame(0, 1, 25.0));
        c.perform_auto_ranging();

        let range = c.range();
        assert!(range.span() >= 20.0 - 1e-9);
        assert!((range.center() - 25.0).abs() < 1e-6);
        assert!(range.min < range.max);
    }

    #[test]
    fn test_auto_range_enforces_max_span() {
        let mut c = controller();
        let mut settings = AutoRangeSettings::default();
        settings.adaptation_rate = 1.0;
        settings.margin = 40.0;
        settings.max_range = 60.0;
        c.set_auto_range_settings(settings).unwrap();

        let mut data = vec![20.0; 64];
        data[0] = -50.0;
        data[1] = 150.0;
        let frame = ThermalFrame::from_data(0, 1, 8, 8, data).unwrap();
        c.process_frame(&frame);
        c.perform_auto_ranging();

        assert!(c.range().span() <= 60.0 + 1e-9);
    }

    #[test]
    fn test_auto_range_runs_on_interval() {
        let mut c = controller();
        let mut settings = AutoRangeSettings::default();
        settings.update_interval_secs = 5;
        settings.adaptation_rate = 1.0;
        c.set_auto_range_settings(settings).unwrap();

        let before = c.range();
        c.process_frame(&flat_frame(0, 1, 25.0));
        assert_eq!(c.range(), before); // first frame only arms the interval
        c.process_frame(&flat_frame(2_000, 2, 25.0));
        assert_eq!(c.range(), before); // interval not yet elapsed
        c.process_frame(&flat_frame(6_000, 3, 25.0));
        assert_ne!(c.range(), before);
    }

    #[test]
    fn test_threshold_fires_per_pixel_and_latches() {
        let mut c = controller();
        let mut hot = AlertThreshold::new("hot", 60.0, ThresholdCondition::Above);
        hot.hysteresis = 5.0;
        c.add_alert_threshold(hot).unwrap();

        let mut data = vec![20.0; 64];
        data[10] = 70.0;
        data[20] = 75.0;
        let frame = ThermalFrame::from_data(0, 1, 8, 8, data.clone()).unwrap();

        let alerts = c.process_frame(&frame);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.rule_id == "hot"));
        assert!(alerts.iter().all(|a| a.priority == AlertPriority::Low));

        // Same pixels still hot: latched, no re-emission
        let frame2 = ThermalFrame::from_data(1_000, 2, 8, 8, data.clone()).unwrap();
        assert!(c.process_frame(&frame2).is_empty());

        // Pixel 10 drops inside the dead band: still latched
        data[10] = 57.0;
        let frame3 = ThermalFrame::from_data(2_000, 3, 8, 8, data.clone()).unwrap();
        assert!(c.process_frame(&frame3).is_empty());

        // Pixel 10 clears the dead band, then violates again
        data[10] = 50.0;
        let frame4 = ThermalFrame::from_data(3_000, 4, 8, 8, data.clone()).unwrap();
        assert!(c.process_frame(&frame4).is_empty());
        data[10] = 70.0;
        let frame5 = ThermalFrame::from_data(4_000, 5, 8, 8, data).unwrap();
        assert_eq!(c.process_frame(&frame5).len(), 1);
    }

    #[test]
    fn test_threshold_priority_passes_through() {
        let mut c = controller();
        let mut hot = AlertThreshold::new("critical_hot", 60.0, ThresholdCondition::Above);
        hot.priority = Some(AlertPriority::Critical);
        c.add_alert_threshold(hot).unwrap();

        let mut data = vec![20.0; 64];
        data[0] = 70.0;
        let frame = ThermalFrame::from_data(0, 1, 8, 8, data).unwrap();
        let alerts = c.process_frame(&frame);
        assert_eq!(alerts[0].priority, AlertPriority::Critical);
    }

    #[test]
    fn test_apply_profile_swaps_bundle() {
        let mut c = controller();
        c.apply_profile("electrical_inspection").unwrap();

        assert_eq!(c.range().max, 120.0);
        assert_eq!(c.detection_settings().temperature_threshold, 5.0);
        assert_eq!(c.thresholds().len(), 1);
        assert_eq!(c.thresholds()[0].name, "hot_connection");
        assert_eq!(c.current_profile().unwrap().id, "electrical_inspection");
        assert!(!c.is_manually_edited());
    }

    #[test]
    fn test_apply_unknown_profile_changes_nothing() {
        let mut c = controller();
        let range = c.range();
        let thresholds = c.thresholds().len();

        assert!(c.apply_profile("nope").is_err());
        assert_eq!(c.range(), range);
        assert_eq!(c.thresholds().len(), thresholds);
        assert!(c.current_profile().is_none());
    }

    #[test]
    fn test_manual_edit_clears_profile_association() {
        let mut c = controller();
        c.apply_profile("person_screening").unwrap();
        assert!(c.current_profile().is_some());

        c.set_temperature_range(10.0, 50.0).unwrap();
        assert!(c.current_profile().is_none());
        assert!(c.is_manually_edited());
    }

    #[test]
    fn test_custom_profile_round_trip() {
        let mut c = controller();
        c.set_temperature_range(-5.0, 55.0).unwrap();
        c.create_custom_profile("site_a", "Site A").unwrap();
        assert!(c.create_custom_profile("site_a", "dup").is_err());

        c.set_temperature_range(0.0, 100.0).unwrap();
        c.apply_profile("site_a").unwrap();
        assert_eq!(c.range().min, -5.0);
        assert_eq!(c.range().max, 55.0);
    }

    #[test]
    fn test_invalid_configured_policy_falls_back_to_defaults() {
        let mut cfg = config();
        cfg.auto_range.percentile = 0.5;
        let c = RangeController::new(&cfg);
        assert_eq!(c.auto_range_settings(), AutoRangeSettings::default());

        let mut cfg = config();
        cfg.auto_range.min_range = cfg.auto_range.max_range + 1.0;
        let c = RangeController::new(&cfg);
        assert_eq!(c.auto_range_settings(), AutoRangeSettings::default());
    }

    #[test]
    fn test_invalid_range_rejected_without_change() {
        let mut c = controller();
        let before = c.range();
        assert!(c.set_temperature_range(80.0, 20.0).is_err());
        assert_eq!(c.range(), before);
    }

    #[test]
    fn test_implausible_samples_excluded_from_history() {
        let mut c = controller();
        let mut data = vec![25.0; 64];
        data[0] = 400.0;
        data[1] = -200.0;
        let frame = ThermalFrame::from_data(0, 1, 8, 8, data).unwrap();
        c.process_frame(&frame);

        let stats = c.temperature_statistics();
        assert_eq!(stats.count, 62);
        assert_eq!(stats.max, 25.0);
    }

    #[test]
    fn test_background_tracks_frame_medians() {
        let mut c = controller();
        c.process_frame(&flat_frame(0, 1, 20.0));
        let bg1 = c.temperature_statistics().background.unwrap();
        assert!((bg1 - 20.0).abs() < 1e-9);

        for i in 1..30 {
            c.process_frame(&flat_frame(i * 100, i + 1, 30.0));
        }
        let bg2 = c.temperature_statistics().background.unwrap();
        assert!(bg2 > 20.0 && bg2 < 30.0);
    }

    #[test]
    fn test_environmental_adaptation_is_bounded() {
        let mut c = controller();
        let base = c.detection_settings();

        c.set_environmental_context(EnvironmentalContext {
            ambient_temp: 60.0,
            humidity: 90.0,
            airflow: 5.0,
        });
        let adapted = c.detection_settings();
        assert!(adapted.temperature_threshold <= base.temperature_threshold + 1.0);
        assert!(adapted.noise_reduction <= 0.9);
        assert!(adapted.temporal_window_ms <= 10_000);

        // Extreme cold nudges the other way but stays positive
        c.set_environmental_context(EnvironmentalContext {
            ambient_temp: -40.0,
            humidity: 10.0,
            airflow: 0.0,
        });
        assert!(c.detection_settings().temperature_threshold >= 0.1);
    }

    #[test]
    fn test_isotherms_follow_range() {
        let mut c = controller();
        c.set_temperature_range(0.0, 40.0).unwrap();
        let temps: Vec<f64> = c.isotherms().iter().map(|i| i.temperature).collect();
        assert_eq!(temps, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_remove_threshold_clears_latches() {
        let mut c = controller();
        c.add_alert_threshold(AlertThreshold::new("hot", 60.0, ThresholdCondition::Above))
            .unwrap();

        let mut data = vec![20.0; 64];
        data[5] = 80.0;
        let frame = ThermalFrame::from_data(0, 1, 8, 8, data).unwrap();
        assert_eq!(c.process_frame(&frame).len(), 1);

        c.remove_alert_threshold("hot").unwrap();
        assert!(c.remove_alert_threshold("hot").is_err());

        // Re-adding starts from a clean latch set
        c.add_alert_threshold(AlertThreshold::new("hot", 60.0, ThresholdCondition::Above))
            .unwrap();
        let frame2 = ThermalFrame::from_data(1_000, 2, 8, 8, {
            let mut d = vec![20.0; 64];
            d[5] = 80.0;
            d
        })
        .unwrap();
        assert_eq!(c.process_frame(&frame2).len(), 1);
    }
}
