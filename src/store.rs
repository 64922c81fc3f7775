//! Durable key-value state, the local equivalent of per-origin browser storage.
//!
//! Values are JSON documents. Typed readers never fail: malformed or missing
//! entries fall back to defaults and the fallback is written straight back so
//! the next read is well formed. Every write marks the store dirty; the owner
//! decides when to flush it (see [`crate::storage::persist_data`]).

use crate::clock;
use crate::models::{IntakeEvent, Ledger, Parameters, ReminderId, Statistics};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const PARAMETERS_KEY: &str = "parameters";
pub const LEVEL_KEY: &str = "waterlevel";
pub const DAY_KEY: &str = "watertoday";
pub const HISTORY_KEY: &str = "waterhistory";
pub const STATISTICS_KEY: &str = "statistics";
const NOTIFIED_PREFIX: &str = "notified:";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

/// Ledger fields as found on disk, before any staleness check.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLedger {
    pub cumulative_intake: u32,
    pub history: Vec<IntakeEvent>,
    /// `None` when the day marker is missing or unreadable.
    pub day: Option<NaiveDate>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries,
            dirty: false,
        }
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.entries.get(&key) != Some(&value) {
            self.entries.insert(key, value);
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(err) => warn!("failed to encode {key}: {err}"),
        }
    }

    pub fn read_parameters(&mut self) -> Parameters {
        let Some(raw) = self.get(PARAMETERS_KEY).cloned() else {
            let params = Parameters::default();
            self.write_parameters(&params);
            return params;
        };

        match serde_json::from_value::<Parameters>(raw.clone()) {
            Ok(mut params) => {
                params.sort_reminders();
                let before = params.reminders.len();
                params
                    .reminders
                    .dedup_by_key(|rule| rule.deadline_minutes_since_midnight);
                if params.reminders.len() != before {
                    warn!(
                        dropped = before - params.reminders.len(),
                        "dropped reminder rules sharing a deadline"
                    );
                }
                if serde_json::to_value(&params).ok().as_ref() != Some(&raw) {
                    info!("migrated stored parameters to current shape");
                    self.write_parameters(&params);
                }
                params
            }
            Err(err) => {
                warn!("stored parameters unreadable, using defaults: {err}");
                let params = Parameters::default();
                self.write_parameters(&params);
                params
            }
        }
    }

    pub fn write_parameters(&mut self, params: &Parameters) {
        self.set_json(PARAMETERS_KEY, params);
    }

    /// `None` on first run: no level has ever been stored.
    pub fn read_ledger(&mut self) -> Option<StoredLedger> {
        let level = self.get(LEVEL_KEY)?.clone();
        let cumulative_intake = match read_level(&level) {
            Some(level) => level,
            None => {
                warn!("stored level unreadable, resetting to 0");
                self.set(LEVEL_KEY, Value::from(0));
                0
            }
        };

        let history = match self.get(HISTORY_KEY).cloned() {
            None => {
                self.set(HISTORY_KEY, Value::Array(Vec::new()));
                Vec::new()
            }
            Some(raw) => match serde_json::from_value::<Vec<IntakeEvent>>(raw.clone()) {
                Ok(history) => {
                    if serde_json::to_value(&history).ok().as_ref() != Some(&raw) {
                        self.set_json(HISTORY_KEY, &history);
                    }
                    history
                }
                Err(err) => {
                    warn!("stored history unreadable, clearing: {err}");
                    self.set(HISTORY_KEY, Value::Array(Vec::new()));
                    Vec::new()
                }
            },
        };

        let day = self.get(DAY_KEY).and_then(read_day);

        Some(StoredLedger {
            cumulative_intake,
            history,
            day,
        })
    }

    pub fn write_ledger(&mut self, ledger: &Ledger) {
        self.set(LEVEL_KEY, Value::from(ledger.cumulative_intake));
        self.set(DAY_KEY, Value::String(clock::day_key(ledger.day)));
        self.set_json(HISTORY_KEY, &ledger.history);
    }

    /// `None` when no statistics blob exists or it cannot be read.
    pub fn read_statistics(&mut self) -> Option<Statistics> {
        let raw = self.get(STATISTICS_KEY)?.clone();
        match serde_json::from_value::<Statistics>(raw.clone()) {
            Ok(stats) => {
                if serde_json::to_value(&stats).ok().as_ref() != Some(&raw) {
                    self.write_statistics(&stats);
                }
                Some(stats)
            }
            Err(err) => {
                warn!("stored statistics unreadable: {err}");
                None
            }
        }
    }

    pub fn write_statistics(&mut self, stats: &Statistics) {
        self.set_json(STATISTICS_KEY, stats);
    }

    pub fn is_notified(&self, rule: ReminderId, day: NaiveDate) -> bool {
        self.entries.contains_key(&notified_key(rule, day))
    }

    pub fn mark_notified(&mut self, rule: ReminderId, day: NaiveDate) {
        self.set(notified_key(rule, day), Value::Bool(true));
    }

    pub fn clear_notified(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(NOTIFIED_PREFIX));
        if self.entries.len() != before {
            self.dirty = true;
        }
    }
}

fn notified_key(rule: ReminderId, day: NaiveDate) -> String {
    format!("{NOTIFIED_PREFIX}{rule}:{}", clock::day_key(day))
}

fn read_level(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .map(|v| v.min(u64::from(u32::MAX)) as u32),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Accepts either a `YYYY-MM-DD` key or a millisecond timestamp of local midnight.
fn read_day(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => clock::parse_day_key(text)
            .or_else(|| text.trim().parse::<i64>().ok().and_then(clock::day_from_millis)),
        Value::Number(number) => number.as_i64().and_then(clock::day_from_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[test]
    fn missing_parameters_are_defaulted_and_persisted() {
        let mut store = Store::new();
        let params = store.read_parameters();
        assert_eq!(params, Parameters::default());
        assert!(store.take_dirty());
        assert!(store.get(PARAMETERS_KEY).is_some());
    }

    #[test]
    fn malformed_parameters_fall_back_to_defaults() {
        let mut store = Store::new();
        store.set(PARAMETERS_KEY, json!("not an object"));
        store.take_dirty();
        let params = store.read_parameters();
        assert_eq!(params, Parameters::default());
        assert!(store.take_dirty());
    }

    #[test]
    fn missing_use_count_is_backfilled_once() {
        let mut store = Store::new();
        store.set(
            PARAMETERS_KEY,
            json!({
                "goal": 2500,
                "profiles": [
                    {"id": 1, "icon": "glass", "label": "Glass", "amount": 250},
                    {"id": 2, "icon": "pint", "label": "Pint", "amount": 500, "useCount": 7}
                ],
                "reminders": [
                    {"id": 1, "thresholdAmount": 500, "deadlineMinutesSinceMidnight": 600}
                ]
            }),
        );
        store.take_dirty();

        let first = store.read_parameters();
        assert!(store.take_dirty());
        assert_eq!(first.goal, 2500);
        assert_eq!(first.profiles[0].use_count, 0);
        assert_eq!(first.profiles[0].label, "Glass");
        assert_eq!(first.profiles[0].amount, 250);
        assert_eq!(first.profiles[1].use_count, 7);
        assert_eq!(store.get(PARAMETERS_KEY).unwrap()["profiles"][0]["useCount"], json!(0));

        let second = store.read_parameters();
        assert!(!store.take_dirty());
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_reminders_sharing_a_deadline_keep_the_first() {
        let mut store = Store::new();
        store.set(
            PARAMETERS_KEY,
            json!({
                "goal": 2000,
                "recall": [
                    {"id": 3, "qty": 1500, "before": 930},
                    {"id": 1, "qty": 500, "before": 570},
                    {"id": 2, "qty": 800, "before": 570}
                ]
            }),
        );
        store.take_dirty();

        let params = store.read_parameters();
        assert!(store.take_dirty());
        let kept: Vec<_> = params
            .reminders
            .iter()
            .map(|rule| (rule.id, rule.deadline_minutes_since_midnight))
            .collect();
        assert_eq!(kept, vec![(ReminderId(1), 570), (ReminderId(3), 930)]);
        assert_eq!(
            store.get(PARAMETERS_KEY).unwrap()["reminders"]
                .as_array()
                .unwrap()
                .len(),
            2
        );

        assert_eq!(store.read_parameters(), params);
        assert!(!store.take_dirty());
    }

    #[test]
    fn ledger_round_trips_through_store() {
        let mut store = Store::new();
        assert!(store.read_ledger().is_none());

        let ledger = Ledger {
            day: day(3),
            cumulative_intake: 350,
            history: vec![IntakeEvent {
                profile_id: None,
                amount: 350,
                timestamp: chrono::DateTime::from_timestamp_millis(1_775_000_000_000).unwrap(),
            }],
        };
        store.write_ledger(&ledger);

        let stored = store.read_ledger().unwrap();
        assert_eq!(stored.cumulative_intake, 350);
        assert_eq!(stored.history, ledger.history);
        assert_eq!(stored.day, Some(day(3)));
    }

    #[test]
    fn legacy_level_and_timestamp_day_marker_are_read() {
        let mut store = Store::new();
        store.set(LEVEL_KEY, json!("1200"));
        store.set(DAY_KEY, json!(clock::midnight_millis(day(9))));
        let stored = store.read_ledger().unwrap();
        assert_eq!(stored.cumulative_intake, 1200);
        assert_eq!(stored.day, Some(day(9)));
        assert!(stored.history.is_empty());
    }

    #[test]
    fn notified_markers_are_per_rule_and_day() {
        let mut store = Store::new();
        store.mark_notified(ReminderId(2), day(1));
        assert!(store.is_notified(ReminderId(2), day(1)));
        assert!(!store.is_notified(ReminderId(2), day(2)));
        assert!(!store.is_notified(ReminderId(1), day(1)));

        store.set("unrelated", json!(1));
        store.clear_notified();
        assert!(!store.is_notified(ReminderId(2), day(1)));
        assert!(store.get("unrelated").is_some());
    }
}
