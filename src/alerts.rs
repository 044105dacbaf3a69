//! ==============================================================================
//! alerts.rs - threshold rules and the alert panel
//! ==============================================================================
//!
//! purpose:
//!     turns a reading into zero or more warning strings and keeps the short
//!     list of recent, distinct warnings that the dashboard shows.
//!
//! relationships:
//!     - used by: simulator.rs (evaluate + merge after every tick)
//!     - used by: dashboard.rs (panel_lines for rendering)
//!
//! ==============================================================================

use crate::config::AlertsConfig;
use crate::domain::Reading;
use serde::{Serialize, Serializer};

/// shown by the panel when nothing is wrong
pub const STABLE_MESSAGE: &str = "All hive conditions are stable.";

/// limits that trigger a warning, all compared strictly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub high_temperature: f64,
    pub high_vibration: f64,
    pub low_weight: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&AlertsConfig::default())
    }
}

impl From<&AlertsConfig> for Thresholds {
    fn from(config: &AlertsConfig) -> Self {
        Self {
            high_temperature: config.high_temperature,
            high_vibration: config.high_vibration,
            low_weight: config.low_weight,
        }
    }
}

impl Thresholds {
    pub fn high_temperature_alert(&self) -> String {
        format!(
            "High Temperature Warning: hive is above {:.0}°C, check ventilation.",
            self.high_temperature
        )
    }

    pub fn vibration_alert(&self) -> String {
        format!(
            "Abnormal Vibration Detected: activity above {:.0} Hz, possible swarming or disturbance.",
            self.high_vibration
        )
    }

    pub fn low_weight_alert(&self) -> String {
        format!(
            "Low Weight Alert: hive is under {:.0} kg, check honey stores.",
            self.low_weight
        )
    }
}

/// alerts raised by a single reading, in rule order
pub fn evaluate(reading: &Reading, thresholds: &Thresholds) -> Vec<String> {
    let mut raised = Vec::new();
    if reading.temperature > thresholds.high_temperature {
        raised.push(thresholds.high_temperature_alert());
    }
    if reading.vibration > thresholds.high_vibration {
        raised.push(thresholds.vibration_alert());
    }
    if reading.weight < thresholds.low_weight {
        raised.push(thresholds.low_weight_alert());
    }
    raised
}

/// most recent distinct alerts, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct AlertList {
    alerts: Vec<String>,
    capacity: usize,
}

// serialized as a plain list of strings
impl Serialize for AlertList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.alerts)
    }
}

impl AlertList {
    pub fn new(capacity: usize) -> Self {
        Self { alerts: Vec::with_capacity(capacity), capacity }
    }

    /// prepend `raised`, drop repeats keeping the newest copy, then cap
    pub fn merge(&mut self, raised: Vec<String>) {
        if raised.is_empty() {
            return;
        }

        let mut merged: Vec<String> = Vec::with_capacity(raised.len() + self.alerts.len());
        for alert in raised.into_iter().chain(self.alerts.drain(..)) {
            if !merged.contains(&alert) {
                merged.push(alert);
            }
        }
        merged.truncate(self.capacity);
        self.alerts = merged;
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[String] {
        &self.alerts
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// what the alert panel displays
    pub fn panel_lines(&self) -> Vec<&str> {
        if self.alerts.is_empty() {
            vec![STABLE_MESSAGE]
        } else {
            self.alerts.iter().map(String::as_str).collect()
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64, vibration: f64, weight: f64) -> Reading {
        Reading {
            temperature,
            weight,
            vibration,
            latitude: 0.0,
            longitude: 0.0,
            timestamp: "12:00".to_string(),
        }
    }

    #[test]
    fn hot_hive_raises_only_temperature_alert() {
        let raised = evaluate(&reading(38.0, 5.0, 12.0), &Thresholds::default());
        assert_eq!(raised.len(), 1);
        assert!(raised[0].starts_with("High Temperature Warning"));
    }

    #[test]
    fn weight_threshold_is_strict() {
        let t = Thresholds::default();
        let light = evaluate(&reading(35.0, 5.0, 9.5), &t);
        assert_eq!(light, vec![t.low_weight_alert()]);

        assert!(evaluate(&reading(35.0, 5.0, 12.0), &t).is_empty());
        assert!(evaluate(&reading(35.0, 5.0, 10.0), &t).is_empty());
    }

    #[test]
    fn boundaries_do_not_trigger() {
        let t = Thresholds::default();
        assert!(evaluate(&reading(37.0, 12.0, 10.0), &t).is_empty());
    }

    #[test]
    fn every_rule_can_fire_at_once() {
        let t = Thresholds::default();
        let raised = evaluate(&reading(37.5, 14.0, 9.0), &t);
        assert_eq!(
            raised,
            vec![t.high_temperature_alert(), t.vibration_alert(), t.low_weight_alert()]
        );
    }

    #[test]
    fn merge_prepends_and_dedupes() {
        let mut list = AlertList::new(3);
        list.merge(vec!["a".into()]);
        list.merge(vec!["b".into()]);
        list.merge(vec!["a".into()]);
        assert_eq!(list.as_slice(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn merge_caps_at_capacity() {
        let mut list = AlertList::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            list.merge(vec![name.to_string()]);
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list.as_slice(), &["e".to_string(), "d".to_string(), "c".to_string()]);
    }

    #[test]
    fn merge_with_nothing_new_keeps_list() {
        let mut list = AlertList::new(3);
        list.merge(vec!["a".into(), "b".into()]);
        list.merge(Vec::new());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn duplicate_within_one_batch_collapses() {
        let mut list = AlertList::new(3);
        list.merge(vec!["x".into(), "x".into(), "y".into()]);
        assert_eq!(list.as_slice(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn panel_shows_stable_message_when_empty() {
        let list = AlertList::new(3);
        assert_eq!(list.panel_lines(), vec![STABLE_MESSAGE]);

        let mut list = AlertList::new(3);
        list.merge(vec!["boom".into()]);
        assert_eq!(list.panel_lines(), vec!["boom"]);
    }
}
