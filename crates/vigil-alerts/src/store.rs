//! Keyed store of per-rule alert records.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::state::{AlertEvent, AlertRecord, transition};
use crate::types::AlertState;

/// Shared handle to the alert records of every evaluated rule.
///
/// Clones share the same records. All mutation goes through
/// [`apply_transition`](Self::apply_transition), which holds the write lock
/// only for the pure state computation.
#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    records: Arc<RwLock<HashMap<String, AlertRecord>>>,
}

impl AlertStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the state machine to `rule_name`'s record.
    ///
    /// A rule seen for the first time starts from a `Normal` record. Returns
    /// the updated record and the emitted event.
    pub fn apply_transition(
        &self,
        rule_name: &str,
        condition_met: bool,
        value: f64,
        required_duration: Duration,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> (AlertRecord, AlertEvent) {
        let mut records = self.records.write();
        let record = records.entry(rule_name.to_string()).or_default();
        let (next, event) = transition(record, condition_met, value, required_duration, cooldown, now);
        *record = next.clone();
        (next, event)
    }

    /// Returns a copy of `rule_name`'s record, if it has been evaluated.
    #[must_use]
    pub fn get_record(&self, rule_name: &str) -> Option<AlertRecord> {
        self.records.read().get(rule_name).cloned()
    }

    /// Returns a copy of every record, ordered by rule name.
    #[must_use]
    pub fn get_all_records(&self) -> BTreeMap<String, AlertRecord> {
        self.records
            .read()
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    /// Returns the JSON projection of every record, ordered by rule name.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<String, AlertStatus> {
        self.records
            .read()
            .iter()
            .map(|(name, record)| (name.clone(), AlertStatus::from(record)))
            .collect()
    }

    /// Returns the number of rules currently in the given state.
    #[must_use]
    pub fn count_in_state(&self, state: AlertState) -> usize {
        self.records
            .read()
            .values()
            .filter(|r| r.state == state)
            .count()
    }

    /// Removes every record.
    pub fn reset(&self) {
        let mut records = self.records.write();
        let cleared = records.len();
        records.clear();
        tracing::info!(cleared, "alert store reset");
    }

    /// Returns the number of tracked rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no rule has been evaluated since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

/// The serialized view of an [`AlertRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStatus {
    /// Current state.
    pub state: AlertState,
    /// Number of fire events.
    pub fire_count: u64,
    /// Last fire time, RFC 3339.
    pub last_fired: Option<String>,
    /// Last resolve time, RFC 3339.
    pub last_resolved: Option<String>,
    /// Value recorded at the last value-recording transition.
    pub current_value: Option<f64>,
}

impl From<&AlertRecord> for AlertStatus {
    fn from(record: &AlertRecord) -> Self {
        Self {
            state: record.state,
            fire_count: record.fire_count,
            last_fired: record.last_fired_at.map(|t| t.to_rfc3339()),
            last_resolved: record.last_resolved_at.map(|t| t.to_rfc3339()),
            current_value: record.last_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: Duration = Duration::seconds(60);
    const COOLDOWN: Duration = Duration::minutes(15);

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    #[test]
    fn unknown_rule_is_absent_until_evaluated() {
        let store = AlertStore::new();
        assert!(store.get_record("high_temperature").is_none());
        assert!(store.is_empty());

        store.apply_transition("high_temperature", false, 20.0, REQUIRED, COOLDOWN, t0());

        let record = store.get_record("high_temperature").unwrap();
        assert_eq!(record.state, AlertState::Normal);
        assert_eq!(record.fire_count, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn apply_persists_transition() {
        let store = AlertStore::new();
        let (record, event) = store.apply_transition("r", true, 31.0, REQUIRED, COOLDOWN, t0());
        assert_eq!(event, AlertEvent::None);
        assert_eq!(store.get_record("r"), Some(record));

        let (_, event) = store.apply_transition(
            "r",
            true,
            32.0,
            REQUIRED,
            COOLDOWN,
            t0() + Duration::seconds(60),
        );
        assert_eq!(event, AlertEvent::Fire);
        assert_eq!(store.count_in_state(AlertState::Firing), 1);
    }

    #[test]
    fn one_record_per_rule_name() {
        let store = AlertStore::new();
        for i in 0..5 {
            store.apply_transition("r", i % 2 == 0, 1.0, REQUIRED, COOLDOWN, t0());
        }
        store.apply_transition("other", true, 1.0, REQUIRED, COOLDOWN, t0());
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get_all_records().keys().collect::<Vec<_>>(),
            vec!["other", "r"]
        );
    }

    #[test]
    fn reset_clears_everything() {
        let store = AlertStore::new();
        store.apply_transition("r", true, 1.0, REQUIRED, COOLDOWN, t0());
        store.reset();
        assert!(store.is_empty());
        assert!(store.get_record("r").is_none());

        let (record, _) = store.apply_transition("r", false, 1.0, REQUIRED, COOLDOWN, t0());
        assert_eq!(record, AlertRecord::new());
    }

    #[test]
    fn clones_share_records() {
        let store = AlertStore::new();
        let handle = store.clone();
        handle.apply_transition("r", true, 1.0, REQUIRED, COOLDOWN, t0());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn status_projection() {
        let store = AlertStore::new();
        store.apply_transition("r", true, 31.0, REQUIRED, COOLDOWN, t0());
        store.apply_transition("r", true, 35.0, REQUIRED, COOLDOWN, t0() + Duration::seconds(60));

        let statuses = store.statuses();
        let status = &statuses["r"];
        assert_eq!(status.state, AlertState::Firing);
        assert_eq!(status.fire_count, 1);
        assert!(status.last_fired.is_some());
        assert!(status.last_resolved.is_none());
        assert_eq!(status.current_value, Some(35.0));

        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["state"], "firing");
        assert!(json["last_resolved"].is_null());
        assert!(json["last_fired"].as_str().unwrap().starts_with("2024-"));
    }

    #[test]
    fn concurrent_writers_do_not_tear_records() {
        let store = AlertStore::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for step in 0..100 {
                        store.apply_transition(
                            "shared",
                            (i + step) % 3 != 0,
                            f64::from(step),
                            Duration::zero(),
                            Duration::zero(),
                            t0() + Duration::seconds(i64::from(step)),
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let record = store.get_record("shared").unwrap();
        assert_eq!(
            record.first_triggered_at.is_some(),
            record.state == AlertState::Pending
        );
    }
}
