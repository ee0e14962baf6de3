//! The per-rule alert state machine.
//!
//! [`transition`] is a pure function: it takes a record, the outcome of the
//! latest condition check and the current time, and returns the next record
//! together with the event (if any) the caller should act on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AlertState;

/// How long a rule stays `Resolved` before falling back to `Normal`.
pub const RESOLVED_RESET_WINDOW: Duration = Duration::minutes(5);

/// Timing and state data for one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Current state.
    pub state: AlertState,
    /// Set on entering `Pending`, cleared on leaving it.
    pub first_triggered_at: Option<DateTime<Utc>>,
    /// Time of the most recent fire event.
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Time the record last entered `Resolved`.
    pub last_resolved_at: Option<DateTime<Utc>>,
    /// Number of fire events since the store was last reset.
    pub fire_count: u64,
    /// Sample recorded at the last value-recording transition.
    pub last_value: Option<f64>,
}

impl AlertRecord {
    /// Creates a `Normal` record with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// What the caller should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertEvent {
    /// Nothing to deliver.
    None,
    /// The alert fired (first time or after cooldown).
    Fire,
    /// The alert stopped holding.
    Resolve,
}

impl AlertEvent {
    /// Returns the event as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fire => "fire",
            Self::Resolve => "resolve",
        }
    }
}

impl std::fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advances `record` given the latest condition outcome.
///
/// `value` is only written to `last_value` on transitions that record it:
/// entering `Pending` and every fire. Staying `Pending` while the debounce
/// window runs, or staying `Firing` inside the cooldown, leaves the previous
/// value in place.
///
/// Boundaries: `Pending` fires once `elapsed >= required_duration`; `Firing`
/// refires once `elapsed > cooldown`; `Resolved` falls back to `Normal` once
/// `elapsed > RESOLVED_RESET_WINDOW`.
#[must_use]
pub fn transition(
    record: &AlertRecord,
    condition_met: bool,
    value: f64,
    required_duration: Duration,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> (AlertRecord, AlertEvent) {
    let mut next = record.clone();

    let event = match (record.state, condition_met) {
        (AlertState::Normal | AlertState::Resolved, true) => {
            next.state = AlertState::Pending;
            next.first_triggered_at = Some(now);
            next.last_value = Some(value);
            AlertEvent::None
        }
        (AlertState::Normal, false) => AlertEvent::None,
        (AlertState::Pending, true) => {
            // A Pending record without a start time is treated as starting now.
            let started = record.first_triggered_at.unwrap_or(now);
            if now - started >= required_duration {
                next.state = AlertState::Firing;
                next.first_triggered_at = None;
                fire(&mut next, value, now);
                AlertEvent::Fire
            } else {
                next.first_triggered_at = Some(started);
                AlertEvent::None
            }
        }
        (AlertState::Firing, true) => match record.last_fired_at {
            Some(fired) if now - fired > cooldown => {
                fire(&mut next, value, now);
                AlertEvent::Fire
            }
            _ => AlertEvent::None,
        },
        (AlertState::Pending | AlertState::Firing, false) => {
            next.state = AlertState::Resolved;
            next.first_triggered_at = None;
            next.last_resolved_at = Some(now);
            AlertEvent::Resolve
        }
        (AlertState::Resolved, false) => {
            let expired = record
                .last_resolved_at
                .is_some_and(|resolved| now - resolved > RESOLVED_RESET_WINDOW);
            if expired {
                next.state = AlertState::Normal;
            }
            AlertEvent::None
        }
    };

    (next, event)
}

fn fire(record: &mut AlertRecord, value: f64, now: DateTime<Utc>) {
    record.last_fired_at = Some(now);
    record.fire_count += 1;
    record.last_value = Some(value);
}
