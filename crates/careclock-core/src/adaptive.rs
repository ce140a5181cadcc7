//! Adaptive learning over recurring slots.
//!
//! The analyzer consumes the trailing 7-day action history per slot and
//! emits time-shift suggestions for frequently skipped slots, plus the set
//! of slots that currently qualify as formed habits. It is a pure function;
//! persistence of its outcome is the service's job.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::reminder::{ActionEvent, ReminderAction};
use crate::slot::SlotKey;

/// Trailing window length in days.
pub const WINDOW_DAYS: i64 = 7;
/// Skips (user or auto) within the window that trigger a suggestion.
pub const SKIP_THRESHOLD: usize = 3;
/// Distinct-day completions within the window that form a habit.
pub const HABIT_THRESHOLD: usize = 5;
/// Minutes a suggestion shifts the canonical time forward.
pub const SUGGESTION_SHIFT_MIN: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionState {
    Pending,
    Applied,
    Dismissed,
}

impl SuggestionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionState::Pending => "pending",
            SuggestionState::Applied => "applied",
            SuggestionState::Dismissed => "dismissed",
        }
    }

    pub fn from_str_or_pending(s: &str) -> Self {
        match s {
            "applied" => SuggestionState::Applied,
            "dismissed" => SuggestionState::Dismissed,
            _ => SuggestionState::Pending,
        }
    }
}

/// A proposed time shift for one recurring slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveSuggestion {
    pub id: Uuid,
    pub user_id: i64,
    pub slot: SlotKey,
    pub current_time: NaiveTime,
    pub suggested_time: NaiveTime,
    pub reason: String,
    pub state: SuggestionState,
    pub created_at: DateTime<Utc>,
}

/// A slot as the analyzer sees it: identity, current canonical time, and
/// persisted adaptive state.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    pub slot: SlotKey,
    pub canonical_time: NaiveTime,
    pub window_reset_at: Option<DateTime<Utc>>,
}

/// Analyzer result for one user.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutcome {
    /// New suggestions to persist (slots already holding a pending
    /// suggestion are excluded -- at most one pending per slot).
    pub suggestions: Vec<AdaptiveSuggestion>,
    /// Slots currently meeting the habit threshold.
    pub habit_slots: Vec<SlotKey>,
}

/// Run the analyzer over one user's slots and trailing event history.
///
/// `pending` holds the slots that already have a pending suggestion.
/// Missing history is zero activity, never an error.
pub fn analyze(
    user_id: i64,
    snapshots: &[SlotSnapshot],
    events: &[ActionEvent],
    pending: &HashSet<SlotKey>,
    today: NaiveDate,
) -> AnalyzerOutcome {
    let window_start = today - Duration::days(WINDOW_DAYS - 1);

    let mut skips: HashMap<&SlotKey, usize> = HashMap::new();
    let mut completion_days: HashMap<&SlotKey, HashSet<NaiveDate>> = HashMap::new();
    let resets: HashMap<&SlotKey, DateTime<Utc>> = snapshots
        .iter()
        .filter_map(|s| s.window_reset_at.map(|at| (&s.slot, at)))
        .collect();

    for ev in events.iter().filter(|e| e.date >= window_start) {
        match ev.action {
            ReminderAction::Completed => {
                completion_days.entry(&ev.slot).or_default().insert(ev.date);
            }
            a if a.is_skip() => {
                // An applied suggestion truncates the slot's skip window.
                if resets.get(&ev.slot).is_some_and(|reset| ev.at < *reset) {
                    continue;
                }
                *skips.entry(&ev.slot).or_default() += 1;
            }
            _ => {}
        }
    }

    let mut outcome = AnalyzerOutcome::default();
    for snapshot in snapshots {
        if completion_days
            .get(&snapshot.slot)
            .is_some_and(|days| days.len() >= HABIT_THRESHOLD)
        {
            outcome.habit_slots.push(snapshot.slot.clone());
        }

        let skip_count = skips.get(&snapshot.slot).copied().unwrap_or(0);
        if skip_count >= SKIP_THRESHOLD && !pending.contains(&snapshot.slot) {
            outcome.suggestions.push(AdaptiveSuggestion {
                id: Uuid::new_v4(),
                user_id,
                slot: snapshot.slot.clone(),
                current_time: snapshot.canonical_time,
                suggested_time: snapshot.canonical_time
                    + Duration::minutes(SUGGESTION_SHIFT_MIN),
                reason: "frequently skipped".into(),
                state: SuggestionState::Pending,
                created_at: Utc::now(),
            });
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::ReminderKind;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn event(slot: &SlotKey, action: ReminderAction, date: NaiveDate) -> ActionEvent {
        ActionEvent {
            user_id: 1,
            reminder_id: Uuid::new_v4(),
            slot: slot.clone(),
            kind: ReminderKind::Medicine,
            action,
            date,
            at: date
                .and_hms_opt(12, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(Utc::now),
        }
    }

    fn snapshot(slot: &SlotKey) -> SlotSnapshot {
        SlotSnapshot {
            slot: slot.clone(),
            canonical_time: t(8, 0),
            window_reset_at: None,
        }
    }

    #[test]
    fn three_skips_in_window_yield_one_suggestion_shifted_30_min() {
        let slot = SlotKey::medicine(1, 0);
        let events: Vec<_> = (1..=3)
            .map(|d| event(&slot, ReminderAction::Skipped, day(d)))
            .collect();
        let outcome = analyze(1, &[snapshot(&slot)], &events, &HashSet::new(), day(7));
        assert_eq!(outcome.suggestions.len(), 1);
        let s = &outcome.suggestions[0];
        assert_eq!(s.current_time, t(8, 0));
        assert_eq!(s.suggested_time, t(8, 30));
        assert_eq!(s.reason, "frequently skipped");
        assert_eq!(s.state, SuggestionState::Pending);
    }

    #[test]
    fn auto_expired_counts_toward_skips() {
        let slot = SlotKey::medicine(1, 0);
        let events = vec![
            event(&slot, ReminderAction::Skipped, day(1)),
            event(&slot, ReminderAction::AutoExpired, day(2)),
            event(&slot, ReminderAction::AutoExpired, day(3)),
        ];
        let outcome = analyze(1, &[snapshot(&slot)], &events, &HashSet::new(), day(7));
        assert_eq!(outcome.suggestions.len(), 1);
    }

    #[test]
    fn pending_suggestion_suppresses_duplicates() {
        let slot = SlotKey::medicine(1, 0);
        let events: Vec<_> = (1..=3)
            .map(|d| event(&slot, ReminderAction::Skipped, day(d)))
            .collect();
        let pending: HashSet<_> = [slot.clone()].into_iter().collect();
        let outcome = analyze(1, &[snapshot(&slot)], &events, &pending, day(7));
        assert!(outcome.suggestions.is_empty());
    }

    #[test]
    fn skips_outside_window_are_ignored() {
        let slot = SlotKey::medicine(1, 0);
        let events: Vec<_> = (1..=3)
            .map(|d| event(&slot, ReminderAction::Skipped, day(d)))
            .collect();
        // Day 10: the day-1..3 skips have aged out.
        let outcome = analyze(1, &[snapshot(&slot)], &events, &HashSet::new(), day(10));
        assert!(outcome.suggestions.is_empty());
    }

    #[test]
    fn window_reset_clears_earlier_skips() {
        let slot = SlotKey::medicine(1, 0);
        let events: Vec<_> = (1..=3)
            .map(|d| event(&slot, ReminderAction::Skipped, day(d)))
            .collect();
        let mut snap = snapshot(&slot);
        snap.window_reset_at = day(4).and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        let outcome = analyze(1, &[snap], &events, &HashSet::new(), day(7));
        assert!(outcome.suggestions.is_empty());
    }

    #[test]
    fn habit_requires_five_distinct_days() {
        let slot = SlotKey::singleton(ReminderKind::Exercise);
        let distinct: Vec<_> = (1..=5)
            .map(|d| event(&slot, ReminderAction::Completed, day(d)))
            .collect();
        let outcome = analyze(1, &[snapshot(&slot)], &distinct, &HashSet::new(), day(7));
        assert_eq!(outcome.habit_slots, vec![slot.clone()]);

        // Five completions on one day are one distinct day.
        let same_day: Vec<_> = (0..5)
            .map(|_| event(&slot, ReminderAction::Completed, day(3)))
            .collect();
        let outcome = analyze(1, &[snapshot(&slot)], &same_day, &HashSet::new(), day(7));
        assert!(outcome.habit_slots.is_empty());
    }

    #[test]
    fn snoozes_count_toward_nothing() {
        let slot = SlotKey::water(0);
        let events: Vec<_> = (1..=6)
            .map(|d| event(&slot, ReminderAction::Snoozed, day(d)))
            .collect();
        let outcome = analyze(1, &[snapshot(&slot)], &events, &HashSet::new(), day(7));
        assert!(outcome.suggestions.is_empty());
        assert!(outcome.habit_slots.is_empty());
    }
}
