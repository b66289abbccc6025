// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Alert rule engine - rule CRUD, gating state machine, alert lifecycle

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::error::{Result, ThermalError};
use crate::frame::ThermalFrame;
use super::{
    AlertRule, AlertState, AlertStatistics, BoundingBox, DetectorRegistry, Finding, Point,
    RuleDetector, RuleType, ThermalAlert,
};

/// One gating slot: a rule at a discretized location.
type InstanceKey = (String, i64, i64);

/// Per-(rule, location) temporal state.
#[derive(Debug, Clone)]
struct RuleInstance {
    /// False while latched inside the hysteresis dead band
    armed: bool,
    /// Frame time the current continuous violation started
    violating_since_ms: Option<u64>,
    /// Cooldown deadline; suppressed until the frame clock passes it
    cooldown_until_ms: Option<u64>,
    /// Frame time of the last emitted trigger
    triggered_at_ms: Option<u64>,
    /// Bounding box of the last finding, used for re-arm metric checks
    region: BoundingBox,
}

impl RuleInstance {
    fn new(region: BoundingBox) -> Self {
        Self {
            armed: true,
            violating_since_ms: None,
            cooldown_until_ms: None,
            triggered_at_ms: None,
            region,
        }
    }

    /// `Triggered` is only observable at the emission instant; afterwards the
    /// slot reads `Cooling` until its deadline passes, then `Armed`.
    fn state(&self, now_ms: u64) -> AlertState {
        if self.triggered_at_ms == Some(now_ms) {
            return AlertState::Triggered;
        }
        match self.cooldown_until_ms {
            Some(deadline) if now_ms < deadline => AlertState::Cooling,
            _ => AlertState::Armed,
        }
    }

    /// True once every temporal field has decayed; the slot can be dropped.
    fn is_idle(&self, now_ms: u64) -> bool {
        self.armed
            && self.violating_since_ms.is_none()
            && self.cooldown_until_ms.map_or(true, |d| now_ms >= d)
    }
}

/// Owns the rule set and runs the full evaluate-cluster-gate-emit cycle for
/// every frame.
///
/// Gating is per `(rule, location cell)`: nearby repeated triggers share one
/// cooldown slot, and hysteresis latches each slot until the metric crosses
/// back past `threshold ∓ hysteresis`. All temporal logic runs on the
/// monotonic frame clock, so there are no timers to leak; removing a rule or
/// disabling the engine simply drops the relevant slots.
pub struct AlertRuleEngine {
    rules: HashMap<String, AlertRule>,
    registry: DetectorRegistry,
    instances: HashMap<InstanceKey, RuleInstance>,
    active_alerts: Vec<ThermalAlert>,
    history: VecDeque<ThermalAlert>,
    history_limit: usize,
    location_cell_px: f64,
    stats: AlertStatistics,
}

impl AlertRuleEngine {
    /// Engine with the built-in detector registry.
    pub fn new(config: &DetectionConfig) -> Self {
        let registry = DetectorRegistry::with_defaults(
            config.threshold_cluster_radius,
            config.anomaly_cluster_radius,
        );
        Self {
            rules: HashMap::new(),
            registry,
            instances: HashMap::new(),
            active_alerts: Vec::new(),
            history: VecDeque::with_capacity(config.history_limit),
            history_limit: config.history_limit,
            location_cell_px: config.location_cell_px,
            stats: AlertStatistics {
                started_at: Some(Utc::now()),
                ..AlertStatistics::default()
            },
        }
    }

    /// Register (or replace) the detector backing a rule type. This is the
    /// extension point for `RapidChange` and `Pattern` rules.
    pub fn register_detector(&mut self, rule_type: RuleType, detector: Box<dyn RuleDetector>) {
        self.registry.register(rule_type, detector);
    }

    // ---- rule CRUD ----------------------------------------------------

    /// Add a rule. Fails without state change if the id is taken or the rule
    /// is malformed.
    pub fn add_rule(&mut self, rule: AlertRule) -> Result<()> {
        Self::validate_rule(&rule)?;
        if self.rules.contains_key(&rule.id) {
            return Err(ThermalError::config(format!(
                "rule '{}' already exists",
                rule.id
            )));
        }
        info!(rule = %rule.id, rule_type = rule.rule_type.label(), "rule added");
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Replace an existing rule. Fails without state change on unknown id.
    pub fn update_rule(&mut self, rule: AlertRule) -> Result<()> {
        Self::validate_rule(&rule)?;
        if !self.rules.contains_key(&rule.id) {
            return Err(ThermalError::config(format!("unknown rule '{}'", rule.id)));
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Remove a rule, clearing its active alerts and every pending gating
    /// slot (cooldowns included).
    pub fn remove_rule(&mut self, rule_id: &str) -> Result<()> {
        if self.rules.remove(rule_id).is_none() {
            return Err(ThermalError::config(format!("unknown rule '{rule_id}'")));
        }
        self.instances.retain(|(id, _, _), _| id != rule_id);
        self.active_alerts.retain(|a| a.rule_id != rule_id);
        info!(rule = %rule_id, "rule removed");
        Ok(())
    }

    /// Current rule set, in no particular order.
    pub fn rules(&self) -> Vec<&AlertRule> {
        self.rules.values().collect()
    }

    /// Look up a rule by id.
    pub fn rule(&self, rule_id: &str) -> Option<&AlertRule> {
        self.rules.get(rule_id)
    }

    fn validate_rule(rule: &AlertRule) -> Result<()> {
        if rule.id.is_empty() {
            return Err(ThermalError::config("rule id must not be empty"));
        }
        if !rule.threshold.is_finite() {
            return Err(ThermalError::config(format!(
                "rule '{}': non-finite threshold",
                rule.id
            )));
        }
        if rule.hysteresis < 0.0 {
            return Err(ThermalError::config(format!(
                "rule '{}': negative hysteresis",
                rule.id
            )));
        }
        Ok(())
    }

    // ---- frame processing ---------------------------------------------

    /// Evaluate every enabled rule against the frame and return newly
    /// emitted alerts. A failing detector degrades only its own rule.
    pub fn process_frame(&mut self, frame: &ThermalFrame) -> Vec<ThermalAlert> {
        let now_ms = frame.timestamp_ms;
        let mut emitted = Vec::new();

        let mut rule_ids: Vec<String> = self.rules.keys().cloned().collect();
        rule_ids.sort();

        for rule_id in rule_ids {
            let rule = self.rules[&rule_id].clone();
            if !rule.enabled {
                continue;
            }

            let Some(detector) = self.registry.get(rule.rule_type) else {
                debug!(rule = %rule.id, rule_type = rule.rule_type.label(),
                    "no detector registered for rule type");
                continue;
            };

            Self::rearm_slots(&mut self.instances, detector, frame, &rule);

            let findings = match detector.evaluate(frame, &rule) {
                Ok(findings) => findings,
                Err(e) => {
                    // Isolation contract: one bad rule never aborts the frame
                    let err = ThermalError::Evaluation {
                        rule_id: rule.id.clone(),
                        message: e.to_string(),
                    };
                    warn!(rule = %rule.id, error = %err, "detector failed, skipping rule");
                    continue;
                }
            };

            let mut violated_keys = HashSet::new();
            for finding in findings {
                let key = self.instance_key(&rule.id, &finding.cluster.centroid);
                violated_keys.insert(key.clone());
                if let Some(alert) = self.gate_finding(&rule, finding, key, now_ms) {
                    emitted.push(alert);
                }
            }

            // A violation that disappears resets its persistence clock
            for (key, instance) in self.instances.iter_mut() {
                if key.0 == rule.id && !violated_keys.contains(key) {
                    instance.violating_since_ms = None;
                }
            }
        }

        // Drop fully decayed slots so transient rules leave no residue
        self.instances.retain(|_, inst| !inst.is_idle(now_ms));

        for alert in &emitted {
            self.active_alerts.push(alert.clone());
            if self.history.len() >= self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(alert.clone());
            self.stats.record(alert);
        }

        emitted
    }

    /// Advance latched instances back to armed once the metric has crossed
    /// the hysteresis boundary.
    fn rearm_slots(
        instances: &mut HashMap<InstanceKey, RuleInstance>,
        detector: &dyn RuleDetector,
        frame: &ThermalFrame,
        rule: &AlertRule,
    ) {
        for (key, instance) in instances.iter_mut() {
            if key.0 != rule.id || instance.armed {
                continue;
            }
            let crossed_back = match detector.region_metric(frame, rule, &instance.region) {
                Some(metric) => match rule.rule_type {
                    RuleType::LowTemperature => metric > rule.threshold + rule.hysteresis,
                    _ => metric < rule.threshold - rule.hysteresis,
                },
                // No way to observe the metric: fail open
                None => true,
            };
            if crossed_back {
                instance.armed = true;
                instance.violating_since_ms = None;
            }
        }
    }

    fn gate_finding(
        &mut self,
        rule: &AlertRule,
        finding: Finding,
        key: InstanceKey,
        now_ms: u64,
    ) -> Option<ThermalAlert> {
        let instance = self
            .instances
            .entry(key)
            .or_insert_with(|| RuleInstance::new(finding.cluster.bounding_box));
        instance.region = finding.cluster.bounding_box;

        // Cooldown: evaluated but suppressed
        if let Some(deadline) = instance.cooldown_until_ms {
            if now_ms < deadline {
                return None;
            }
            instance.cooldown_until_ms = None;
        }

        // Hysteresis latch: still inside the dead band
        if !instance.armed {
            return None;
        }

        // Minimum duration: the violation must persist
        if rule.conditions.temporal_filtering && rule.min_duration_ms > 0 {
            let since = *instance.violating_since_ms.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) < rule.min_duration_ms {
                return None;
            }
        }

        if rule.cooldown_ms > 0 {
            instance.cooldown_until_ms = Some(now_ms + rule.cooldown_ms);
        }
        if rule.hysteresis > 0.0 {
            instance.armed = false;
        }
        instance.triggered_at_ms = Some(now_ms);

        Some(ThermalAlert {
            id: Uuid::new_v4().to_string(),
            rule_id: rule.id.clone(),
            rule_type: rule.rule_type,
            priority: rule.priority,
            timestamp_ms: now_ms,
            observed_at: Utc::now(),
            message: finding.message,
            location: finding.cluster.centroid,
            temperature: finding.temperature,
            region: finding.cluster.bounding_box,
            metadata: finding.metadata,
            acknowledged: false,
            resolved: false,
        })
    }

    fn instance_key(&self, rule_id: &str, centroid: &Point) -> InstanceKey {
        let cell = self.location_cell_px.max(1.0);
        (
            rule_id.to_string(),
            (centroid.x / cell).floor() as i64,
            (centroid.y / cell).floor() as i64,
        )
    }

    // ---- alert lifecycle ----------------------------------------------

    /// Mark an alert acknowledged. Idempotent; unknown ids fail.
    pub fn acknowledge_alert(&mut self, alert_id: &str) -> Result<()> {
        let mut found = false;
        for alert in self.history.iter_mut().chain(self.active_alerts.iter_mut()) {
            if alert.id == alert_id {
                alert.acknowledged = true;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(ThermalError::config(format!("unknown alert '{alert_id}'")))
        }
    }

    /// Mark an alert resolved and drop it from the active set. Idempotent;
    /// unknown ids fail.
    pub fn resolve_alert(&mut self, alert_id: &str) -> Result<()> {
        let mut found = false;
        for alert in self.history.iter_mut() {
            if alert.id == alert_id {
                alert.resolved = true;
                found = true;
            }
        }
        let before = self.active_alerts.len();
        self.active_alerts.retain(|a| a.id != alert_id);
        if found || before != self.active_alerts.len() {
            Ok(())
        } else {
            Err(ThermalError::config(format!("unknown alert '{alert_id}'")))
        }
    }

    /// Clear every active alert and every gating slot. Used on global
    /// disable; the engine goes fully dormant.
    pub fn clear_runtime_state(&mut self) {
        self.active_alerts.clear();
        self.instances.clear();
    }

    // ---- queries ------------------------------------------------------

    /// Alerts that have neither been resolved nor cleared.
    pub fn active_alerts(&self) -> &[ThermalAlert] {
        &self.active_alerts
    }

    /// Most recent `limit` historical alerts, newest first.
    pub fn alert_history(&self, limit: usize) -> Vec<ThermalAlert> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    /// Running counters.
    pub fn statistics(&self) -> &AlertStatistics {
        &self.stats
    }

    /// Gating state of the slot covering `location`, if one exists.
    pub fn instance_state(&self, rule_id: &str, location: Point, now_ms: u64) -> Option<AlertState> {
        let key = self.instance_key(rule_id, &location);
        self.instances.get(&key).map(|i| i.state(now_ms))
    }

    /// Number of live gating slots (latched or cooling).
    pub fn pending_instance_count(&self) -> usize {
        self.instances.len()
    }
}
