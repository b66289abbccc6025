// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Core module - the engine facade tying rules, ranging, and fan-out together

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::info;

use crate::config::Config;
use crate::detection::{
    AlertRule, AlertRuleEngine, AlertStatistics, RuleDetector, RuleType, ThermalAlert,
};
use crate::error::Result;
use crate::frame::ThermalFrame;
use crate::notify::{AlertBus, EngineStatus, NotificationMethod};
use crate::range::{
    AlertThreshold, AutoRangeSettings, DetectionSettings, EnvironmentalContext, Isotherm,
    IsothermSettings, RangeController, TemperatureProfile, TemperatureRange,
    TemperatureStatistics,
};

/// The thermal alert engine: one rule engine, one range controller, one
/// alert bus.
///
/// Frame processing is synchronous and push-based; the caller pushes one
/// frame at a time and frames are never processed concurrently. The two
/// sub-engines sit behind their own locks because auto-ranging may be driven
/// by an external timer independent of frame delivery; each lock has exactly
/// one holder at a time, which is the whole serialization story.
pub struct ThermalEngine {
    config: Arc<Config>,
    rules: Mutex<AlertRuleEngine>,
    range: Mutex<RangeController>,
    bus: Arc<AlertBus>,
    enabled: AtomicBool,
    started_at: Instant,
}

impl ThermalEngine {
    /// Engine with the built-in detectors and profile library.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            rules: Mutex::new(AlertRuleEngine::new(&config.detection)),
            range: Mutex::new(RangeController::new(&config.range)),
            bus: Arc::new(AlertBus::new(config.notify.bus_capacity)),
            enabled: AtomicBool::new(true),
            started_at: Instant::now(),
            config,
        }
    }

    /// The alert bus; subscribe here to drain alert events.
    pub fn bus(&self) -> Arc<AlertBus> {
        Arc::clone(&self.bus)
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Seconds since the engine was constructed.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    // ---- lifecycle ----------------------------------------------------

    /// Enable or disable frame processing globally. Disabling clears every
    /// active alert and pending cooldown; the engine goes fully dormant.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was == enabled {
            return;
        }
        if enabled {
            info!("engine enabled");
            self.bus.publish_status(EngineStatus::Enabled);
        } else {
            self.rules.lock().clear_runtime_state();
            info!("engine disabled, runtime state cleared");
            self.bus.publish_status(EngineStatus::Disabled);
        }
    }

    /// True while the engine accepts frames.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // ---- frame processing ---------------------------------------------

    /// Run one frame through both sub-engines and fan emitted alerts out to
    /// their configured delivery channels. Returns everything emitted.
    pub fn process_frame(&self, frame: &ThermalFrame) -> Vec<ThermalAlert> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let mut emitted = Vec::new();

        {
            let mut rules = self.rules.lock();
            let alerts = rules.process_frame(frame);
            for alert in &alerts {
                let methods = rules
                    .rule(&alert.rule_id)
                    .map(|r| r.notification_methods.clone())
                    .unwrap_or_else(|| vec![NotificationMethod::Log]);
                for method in methods {
                    self.bus.publish_alert(alert.clone(), method);
                }
            }
            emitted.extend(alerts);
        }

        {
            let mut range = self.range.lock();
            let alerts = range.process_frame(frame);
            for alert in &alerts {
                // Standing thresholds have no per-rule channel config
                self.bus.publish_alert(alert.clone(), NotificationMethod::Log);
            }
            emitted.extend(alerts);
        }

        emitted
    }

    // ---- rule configuration -------------------------------------------

    /// Add a detection rule.
    pub fn add_rule(&self, rule: AlertRule) -> Result<()> {
        self.rules.lock().add_rule(rule)
    }

    /// Replace a detection rule.
    pub fn update_rule(&self, rule: AlertRule) -> Result<()> {
        self.rules.lock().update_rule(rule)
    }

    /// Remove a detection rule, clearing its alerts and cooldowns.
    pub fn remove_rule(&self, rule_id: &str) -> Result<()> {
        self.rules.lock().remove_rule(rule_id)
    }

    /// Register (or replace) the detector backing a rule type.
    pub fn register_detector(&self, rule_type: RuleType, detector: Box<dyn RuleDetector>) {
        self.rules.lock().register_detector(rule_type, detector);
    }

    /// Current rule set.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.lock().rules().into_iter().cloned().collect()
    }

    // ---- alert lifecycle ----------------------------------------------

    /// Mark an alert acknowledged.
    pub fn acknowledge_alert(&self, alert_id: &str) -> Result<()> {
        self.rules.lock().acknowledge_alert(alert_id)
    }

    /// Mark an alert resolved and drop it from the active set.
    pub fn resolve_alert(&self, alert_id: &str) -> Result<()> {
        self.rules.lock().resolve_alert(alert_id)
    }

    /// Alerts not yet resolved or cleared.
    pub fn active_alerts(&self) -> Vec<ThermalAlert> {
        self.rules.lock().active_alerts().to_vec()
    }

    /// Most recent `limit` historical alerts, newest first.
    pub fn alert_history(&self, limit: usize) -> Vec<ThermalAlert> {
        self.rules.lock().alert_history(limit)
    }

    /// Running alert counters.
    pub fn statistics(&self) -> AlertStatistics {
        self.rules.lock().statistics().clone()
    }

    // ---- range configuration ------------------------------------------

    /// Set the active range directly.
    pub fn set_temperature_range(&self, min: f64, max: f64) -> Result<()> {
        self.range.lock().set_temperature_range(min, max)
    }

    /// The active range.
    pub fn temperature_range(&self) -> TemperatureRange {
        self.range.lock().range()
    }

    /// Replace the detection-sensitivity parameters.
    pub fn set_detection_settings(&self, settings: DetectionSettings) -> Result<()> {
        self.range.lock().set_detection_settings(settings)
    }

    /// The active detection-sensitivity parameters.
    pub fn detection_settings(&self) -> DetectionSettings {
        self.range.lock().detection_settings()
    }

    /// Add a standing threshold.
    pub fn add_alert_threshold(&self, threshold: AlertThreshold) -> Result<()> {
        self.range.lock().add_alert_threshold(threshold)
    }

    /// Replace a standing threshold.
    pub fn update_alert_threshold(&self, threshold: AlertThreshold) -> Result<()> {
        self.range.lock().update_alert_threshold(threshold)
    }

    /// Remove a standing threshold.
    pub fn remove_alert_threshold(&self, name: &str) -> Result<()> {
        self.range.lock().remove_alert_threshold(name)
    }

    /// Current standing thresholds.
    pub fn alert_thresholds(&self) -> Vec<AlertThreshold> {
        self.range.lock().thresholds().to_vec()
    }

    /// Atomically install a stored profile.
    pub fn apply_profile(&self, profile_id: &str) -> Result<()> {
        self.range.lock().apply_profile(profile_id)
    }

    /// Snapshot the current range state into a new stored profile.
    pub fn create_custom_profile(&self, id: &str, name: &str) -> Result<()> {
        self.range.lock().create_custom_profile(id, name)
    }

    /// The profile the active state is associated with, if any.
    pub fn current_profile(&self) -> Option<TemperatureProfile> {
        self.range.lock().current_profile().cloned()
    }

    /// Turn interval-driven auto-ranging on.
    pub fn enable_auto_range(&self) {
        self.range.lock().enable_auto_range();
    }

    /// Turn interval-driven auto-ranging off.
    pub fn disable_auto_range(&self) {
        self.range.lock().disable_auto_range();
    }

    /// Replace the auto-ranging policy.
    pub fn set_auto_range_settings(&self, settings: AutoRangeSettings) -> Result<()> {
        self.range.lock().set_auto_range_settings(settings)
    }

    /// Force one auto-ranging adaptation now, for timer-driven callers.
    pub fn perform_auto_ranging(&self) {
        self.range.lock().perform_auto_ranging();
    }

    /// Apply a one-shot environmental sensitivity adjustment.
    pub fn set_environmental_context(&self, ctx: EnvironmentalContext) {
        self.range.lock().set_environmental_context(ctx);
    }

    /// Update isotherm settings and regenerate the derived set.
    pub fn set_isotherm_settings(&self, settings: IsothermSettings) -> Result<()> {
        self.range.lock().set_isotherm_settings(settings)
    }

    /// The current isotherm set.
    pub fn isotherms(&self) -> Vec<Isotherm> {
        self.range.lock().isotherms().to_vec()
    }

    /// Summary statistics over the rolling temperature window.
    pub fn temperature_statistics(&self) -> TemperatureStatistics {
        self.range.lock().temperature_statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::ThresholdCondition;

    fn engine() -> ThermalEngine {
        ThermalEngine::new(Config::default())
    }

    fn hot_frame(t_ms: u64, n: u64) -> ThermalFrame {
        let mut data = vec![20.0; 256];
        for i in 0..12 {
            data[(i / 4) * 16 + i % 4] = 85.0;
        }
        ThermalFrame::from_data(t_ms, n, 16, 16, data).unwrap()
    }

    #[test]
    fn test_disabled_engine_is_dormant() {
        let engine = engine();
        engine
            .add_rule(AlertRule::new(
                "r1",
                "hot",
                RuleType::HighTemperature,
                80.0,
            ))
            .unwrap();

        engine.process_frame(&hot_frame(0, 1));
        assert_eq!(engine.active_alerts().len(), 1);

        engine.set_enabled(false);
        assert!(engine.active_alerts().is_empty());
        assert!(engine.process_frame(&hot_frame(1_000, 2)).is_empty());

        engine.set_enabled(true);
        assert_eq!(engine.process_frame(&hot_frame(2_000, 3)).len(), 1);
    }

    #[test]
    fn test_both_sources_fire() {
        let engine = engine();
        engine
            .add_rule(AlertRule::new(
                "r1",
                "hot",
                RuleType::HighTemperature,
                80.0,
            ))
            .unwrap();
        engine
            .add_alert_threshold(AlertThreshold::new(
                "warm",
                84.0,
                ThresholdCondition::Above,
            ))
            .unwrap();

        let alerts = engine.process_frame(&hot_frame(0, 1));
        // One clustered rule alert plus twelve per-pixel threshold alerts
        assert_eq!(alerts.len(), 13);
        assert!(alerts.iter().any(|a| a.rule_id == "r1"));
        assert_eq!(alerts.iter().filter(|a| a.rule_id == "warm").count(), 12);
    }

    #[tokio::test]
    async fn test_alerts_reach_the_bus() {
        let engine = engine();
        let mut rx = engine.bus().subscribe_alerts();
        engine
            .add_rule(AlertRule::new(
                "r1",
                "hot",
                RuleType::HighTemperature,
                80.0,
            ))
            .unwrap();

        engine.process_frame(&hot_frame(0, 1));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.alert.rule_id, "r1");
        assert_eq!(event.method, NotificationMethod::Log);
    }

    #[test]
    fn test_profile_queries_round_trip() {
        let engine = engine();
        engine.apply_profile("person_screening").unwrap();
        assert_eq!(engine.current_profile().unwrap().id, "person_screening");
        assert_eq!(engine.temperature_range().max, 40.0);

        engine.set_temperature_range(0.0, 60.0).unwrap();
        assert!(engine.current_profile().is_none());
    }
}
