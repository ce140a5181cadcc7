//! Recurring slot identity.
//!
//! A slot is the identity of a reminder that recurs across days (the habit
//! being learned), distinct from any single day's reminder instance. Slot
//! keys are stable across schedule regenerations: they are derived from the
//! rule that produced the reminder, not from the scheduled time, so a time
//! shifted by an applied suggestion keeps the same key.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::ReminderKind;

/// Stable key for a recurring reminder slot, e.g. `medicine:42:1`,
/// `water:3`, `meal:breakfast`, `exercise`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotKey(String);

impl SlotKey {
    /// Slot for the `index`-th configured time of a medicine.
    pub fn medicine(medicine_id: i64, index: usize) -> Self {
        SlotKey(format!("medicine:{medicine_id}:{index}"))
    }

    /// Slot for the `index`-th water reminder of the day.
    pub fn water(index: usize) -> Self {
        SlotKey(format!("water:{index}"))
    }

    pub fn meal(name: &str) -> Self {
        SlotKey(format!("meal:{name}"))
    }

    /// Slot for a kind that occurs once per day (exercise, wake, sleep, tip).
    pub fn singleton(kind: ReminderKind) -> Self {
        SlotKey(kind.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        SlotKey(raw.into())
    }

    pub fn is_medicine(&self) -> bool {
        self.0.starts_with("medicine:")
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted adaptive state for one slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotState {
    pub user_id: i64,
    pub slot: SlotKey,
    /// Overrides the rule time once a suggestion has been applied.
    pub canonical_time: NaiveTime,
    /// Set by the analyzer at >= 5 distinct-day completions in the window.
    pub habit_formed: bool,
    /// Skip events before this instant are excluded from the 7-day window.
    /// Set when a suggestion is applied, so the same slot does not
    /// immediately re-trigger.
    pub window_reset_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_and_distinct() {
        assert_eq!(SlotKey::medicine(7, 0), SlotKey::medicine(7, 0));
        assert_ne!(SlotKey::medicine(7, 0), SlotKey::medicine(7, 1));
        assert_ne!(SlotKey::water(0), SlotKey::water(1));
        assert_eq!(SlotKey::singleton(ReminderKind::Exercise).as_str(), "exercise");
    }

    #[test]
    fn medicine_keys_are_recognizable() {
        assert!(SlotKey::medicine(1, 0).is_medicine());
        assert!(!SlotKey::water(0).is_medicine());
    }
}
