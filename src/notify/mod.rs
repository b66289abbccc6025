// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Notification fan-out - alert bus and delivery sinks

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::detection::{AlertPriority, ThermalAlert};

/// Delivery channel for a triggered alert. The engine does not know how
/// these are rendered; sinks do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationMethod {
    /// On-screen popup
    Popup,
    /// Audible alarm
    Sound,
    /// Email delivery
    Email,
    /// Structured log line
    Log,
}

/// One alert paired with one delivery channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Monotonic event counter
    pub id: u64,
    /// Wall-clock publish time
    pub published_at: DateTime<Utc>,
    /// The triggered alert
    pub alert: ThermalAlert,
    /// The channel to deliver it on
    pub method: NotificationMethod,
}

/// Engine status change broadcast alongside alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineStatus {
    /// The engine started accepting frames
    Enabled,
    /// The engine went dormant; runtime state was cleared
    Disabled,
}

/// Broadcast fan-out for alert events and engine status.
///
/// Publishing never blocks: a send to a channel with no subscribers (or a
/// lagging subscriber) is dropped, so a slow consumer cannot stall frame
/// ingestion.
pub struct AlertBus {
    alert_tx: broadcast::Sender<AlertEvent>,
    status_tx: broadcast::Sender<EngineStatus>,
    event_counter: std::sync::atomic::AtomicU64,
}

impl AlertBus {
    /// Bus with the given per-channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (alert_tx, _) = broadcast::channel(capacity.max(1));
        let (status_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            alert_tx,
            status_tx,
            event_counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Publish one alert to one delivery channel.
    pub fn publish_alert(&self, alert: ThermalAlert, method: NotificationMethod) {
        let id = self
            .event_counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let _ = self.alert_tx.send(AlertEvent {
            id,
            published_at: Utc::now(),
            alert,
            method,
        });
    }

    /// Publish an engine status change.
    pub fn publish_status(&self, status: EngineStatus) {
        let _ = self.status_tx.send(status);
    }

    /// Subscribe to alert events.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertEvent> {
        self.alert_tx.subscribe()
    }

    /// Subscribe to engine status changes.
    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatus> {
        self.status_tx.subscribe()
    }
}

/// A delivery backend for one or more notification methods.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one alert on one channel. Delivery errors are the sink's to
    /// report; the engine never waits on them.
    async fn dispatch(&self, alert: &ThermalAlert, method: NotificationMethod)
        -> anyhow::Result<()>;
}

/// Sink that renders alerts as structured log lines, leveled by priority.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn dispatch(
        &self,
        alert: &ThermalAlert,
        _method: NotificationMethod,
    ) -> anyhow::Result<()> {
        match alert.priority {
            AlertPriority::Low => debug!(
                rule = %alert.rule_id,
                temp = alert.temperature,
                "{}", alert.message
            ),
            AlertPriority::Medium => info!(
                rule = %alert.rule_id,
                temp = alert.temperature,
                "{}", alert.message
            ),
            AlertPriority::High => warn!(
                rule = %alert.rule_id,
                temp = alert.temperature,
                "{}", alert.message
            ),
            AlertPriority::Critical => error!(
                rule = %alert.rule_id,
                temp = alert.temperature,
                "{}", alert.message
            ),
        }
        Ok(())
    }
}

/// Drains the bus and forwards each alert event to a sink, off the frame
/// path. Runs until the bus closes or `shutdown` fires.
pub async fn run_dispatch(
    bus: Arc<AlertBus>,
    sink: Arc<dyn NotificationSink>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut alerts = bus.subscribe_alerts();
    loop {
        tokio::select! {
            event = alerts.recv() => {
                match event {
                    Ok(event) => {
                        if let Err(e) = sink.dispatch(&event.alert, event.method).await {
                            warn!(error = %e, "notification delivery failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "notification dispatch lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    debug!("notification dispatch stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Point, RuleType};
    use std::collections::HashMap;

    fn alert() -> ThermalAlert {
        ThermalAlert {
            id: "a1".to_string(),
            rule_id: "r1".to_string(),
            rule_type: RuleType::HighTemperature,
            priority: AlertPriority::High,
            timestamp_ms: 0,
            observed_at: Utc::now(),
            message: "test".to_string(),
            location: Point { x: 1.0, y: 1.0 },
            temperature: 85.0,
            region: BoundingBox::pixel(1, 1),
            metadata: HashMap::new(),
            acknowledged: false,
            resolved: false,
        }
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = AlertBus::new(16);
        let mut rx = bus.subscribe_alerts();

        bus.publish_alert(alert(), NotificationMethod::Popup);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.method, NotificationMethod::Popup);
        assert_eq!(event.alert.rule_id, "r1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_block() {
        let bus = AlertBus::new(1);
        // No subscriber; both sends return immediately
        bus.publish_alert(alert(), NotificationMethod::Log);
        bus.publish_alert(alert(), NotificationMethod::Log);
        bus.publish_status(EngineStatus::Disabled);
    }

    #[tokio::test]
    async fn test_log_sink_dispatch() {
        let sink = LogSink;
        sink.dispatch(&alert(), NotificationMethod::Log).await.unwrap();
    }
}
