//! Reminder instances and their lifecycle state machine.
//!
//! ## State transitions
//!
//! ```text
//! PENDING -> DUE -> {COMPLETED, SNOOZED, SKIPPED}
//! SNOOZED -> DUE          (re-entrant, up to the snooze cap)
//! SNOOZED -> SKIPPED      (cap exhausted; logged as auto_expired)
//! ```
//!
//! `COMPLETED` and `SKIPPED` are terminal. Every transition that represents
//! an outcome appends exactly one immutable [`ActionEvent`]; the
//! `PENDING -> DUE` promotion is bookkeeping and logs nothing.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::medicine::Priority;
use crate::message::MessageSpec;
use crate::slot::SlotKey;

/// Minutes a snooze pushes the scheduled time forward.
pub const SNOOZE_OFFSET_MIN: i64 = 10;
/// Maximum number of snoozes before the next expiry force-skips.
pub const SNOOZE_CAP: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Medicine,
    Water,
    Exercise,
    Meal,
    Sleep,
    Wake,
    HealthTip,
}

impl ReminderKind {
    /// Tie-break precedence for same-time same-priority ordering.
    /// Lower sorts first.
    pub fn precedence(&self) -> u8 {
        match self {
            ReminderKind::Medicine => 0,
            ReminderKind::Water => 1,
            ReminderKind::Exercise => 2,
            ReminderKind::Meal => 3,
            ReminderKind::Sleep => 4,
            ReminderKind::Wake => 5,
            ReminderKind::HealthTip => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::Medicine => "medicine",
            ReminderKind::Water => "water",
            ReminderKind::Exercise => "exercise",
            ReminderKind::Meal => "meal",
            ReminderKind::Sleep => "sleep",
            ReminderKind::Wake => "wake",
            ReminderKind::HealthTip => "health_tip",
        }
    }

    pub fn from_str_or_tip(s: &str) -> Self {
        match s {
            "medicine" => ReminderKind::Medicine,
            "water" => ReminderKind::Water,
            "exercise" => ReminderKind::Exercise,
            "meal" => ReminderKind::Meal,
            "sleep" => ReminderKind::Sleep,
            "wake" => ReminderKind::Wake,
            _ => ReminderKind::HealthTip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
    Pending,
    Due,
    Completed,
    Snoozed,
    Skipped,
}

impl ReminderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReminderState::Completed | ReminderState::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderState::Pending => "pending",
            ReminderState::Due => "due",
            ReminderState::Completed => "completed",
            ReminderState::Snoozed => "snoozed",
            ReminderState::Skipped => "skipped",
        }
    }

    pub fn from_str_or_pending(s: &str) -> Self {
        match s {
            "due" => ReminderState::Due,
            "completed" => ReminderState::Completed,
            "snoozed" => ReminderState::Snoozed,
            "skipped" => ReminderState::Skipped,
            _ => ReminderState::Pending,
        }
    }
}

/// Outcome recorded in the action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderAction {
    Completed,
    Snoozed,
    Skipped,
    /// Snooze cap exhausted; distinct from a user-chosen skip.
    AutoExpired,
}

impl ReminderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderAction::Completed => "completed",
            ReminderAction::Snoozed => "snoozed",
            ReminderAction::Skipped => "skipped",
            ReminderAction::AutoExpired => "auto_expired",
        }
    }

    pub fn from_str_or_skipped(s: &str) -> Self {
        match s {
            "completed" => ReminderAction::Completed,
            "snoozed" => ReminderAction::Snoozed,
            "auto_expired" => ReminderAction::AutoExpired,
            _ => ReminderAction::Skipped,
        }
    }

    /// Counts toward a slot's skip total.
    pub fn is_skip(&self) -> bool {
        matches!(self, ReminderAction::Skipped | ReminderAction::AutoExpired)
    }
}

/// Explicit user responses accepted by the action endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    Completed,
    Snoozed,
    Skipped,
}

/// Result of a state-machine step: the action to log and the state reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: ReminderAction,
    pub state: ReminderState,
}

/// One scheduled occurrence on one day. Created by the schedule generator,
/// mutated only through the state machine, retained forever as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: i64,
    pub slot: SlotKey,
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    /// Locale + parameters for external template rendering.
    pub message: MessageSpec,
    pub date: NaiveDate,
    pub scheduled: NaiveTime,
    pub priority: Priority,
    pub state: ReminderState,
    pub snooze_count: u8,
    /// Weak reference; deleting the medicine does not alter past reminders.
    pub medicine_id: Option<i64>,
}

impl Reminder {
    /// Computed due-ness: scheduled time has passed and no outcome yet.
    pub fn is_due(&self, now: NaiveTime) -> bool {
        !self.state.is_terminal() && self.scheduled <= now
    }

    /// Ticker-side promotion and snooze expiry. Returns a transition only
    /// when the snooze cap forces an auto-skip; plain `-> DUE` promotions
    /// return `None`.
    pub fn promote(&mut self, now: NaiveTime) -> Option<Transition> {
        match self.state {
            ReminderState::Pending if self.scheduled <= now => {
                self.state = ReminderState::Due;
                None
            }
            ReminderState::Snoozed if self.scheduled <= now => {
                if self.snooze_count >= SNOOZE_CAP {
                    self.state = ReminderState::Skipped;
                    Some(Transition {
                        action: ReminderAction::AutoExpired,
                        state: ReminderState::Skipped,
                    })
                } else {
                    self.state = ReminderState::Due;
                    None
                }
            }
            _ => None,
        }
    }

    /// Apply an explicit user action. Fails on terminal reminders; a snooze
    /// past the cap is forced to `SKIPPED` and reported as `auto_expired`.
    pub fn apply(&mut self, action: UserAction) -> Result<Transition, ValidationError> {
        if self.state.is_terminal() {
            return Err(ValidationError::TerminalState {
                id: self.id.to_string(),
                state: self.state.as_str().to_string(),
            });
        }
        let transition = match action {
            UserAction::Completed => Transition {
                action: ReminderAction::Completed,
                state: ReminderState::Completed,
            },
            UserAction::Skipped => Transition {
                action: ReminderAction::Skipped,
                state: ReminderState::Skipped,
            },
            UserAction::Snoozed => {
                if self.snooze_count >= SNOOZE_CAP {
                    Transition {
                        action: ReminderAction::AutoExpired,
                        state: ReminderState::Skipped,
                    }
                } else {
                    self.snooze_count += 1;
                    // Wraps past midnight; the day boundary closes it anyway.
                    self.scheduled += chrono::Duration::minutes(SNOOZE_OFFSET_MIN);
                    Transition {
                        action: ReminderAction::Snoozed,
                        state: ReminderState::Snoozed,
                    }
                }
            }
        };
        self.state = transition.state;
        Ok(transition)
    }
}

/// Immutable record of one reminder outcome. Sole source for analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    pub user_id: i64,
    pub reminder_id: Uuid,
    pub slot: SlotKey,
    pub kind: ReminderKind,
    pub action: ReminderAction,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, MessageSpec};
    use crate::profile::Language;

    fn reminder_at(h: u32, m: u32) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            user_id: 1,
            slot: SlotKey::water(0),
            kind: ReminderKind::Water,
            title: "Hydration check".into(),
            body: String::new(),
            message: MessageSpec::new(Language::En, MessageKind::Water),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            scheduled: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            priority: Priority::Low,
            state: ReminderState::Pending,
            snooze_count: 0,
            medicine_id: None,
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn pending_promotes_to_due_when_time_passes() {
        let mut r = reminder_at(8, 0);
        assert!(r.promote(t(7, 59)).is_none());
        assert_eq!(r.state, ReminderState::Pending);
        r.promote(t(8, 0));
        assert_eq!(r.state, ReminderState::Due);
    }

    #[test]
    fn complete_and_skip_are_terminal() {
        let mut r = reminder_at(8, 0);
        r.promote(t(8, 0));
        r.apply(UserAction::Completed).unwrap();
        assert_eq!(r.state, ReminderState::Completed);
        assert!(r.apply(UserAction::Skipped).is_err());
    }

    #[test]
    fn snooze_advances_time_and_counts() {
        let mut r = reminder_at(8, 0);
        r.promote(t(8, 0));
        let tr = r.apply(UserAction::Snoozed).unwrap();
        assert_eq!(tr.action, ReminderAction::Snoozed);
        assert_eq!(r.state, ReminderState::Snoozed);
        assert_eq!(r.snooze_count, 1);
        assert_eq!(r.scheduled, t(8, 10));
    }

    #[test]
    fn snoozed_reenters_due_on_expiry() {
        let mut r = reminder_at(8, 0);
        r.promote(t(8, 0));
        r.apply(UserAction::Snoozed).unwrap();
        assert!(r.promote(t(8, 9)).is_none());
        assert_eq!(r.state, ReminderState::Snoozed);
        r.promote(t(8, 10));
        assert_eq!(r.state, ReminderState::Due);
    }

    #[test]
    fn fourth_snooze_is_forced_skip_with_auto_expired() {
        let mut r = reminder_at(8, 0);
        r.promote(t(8, 0));
        // The first two expiries re-enter DUE; the cap is not reached yet.
        for i in 1..=2u8 {
            let tr = r.apply(UserAction::Snoozed).unwrap();
            assert_eq!(tr.action, ReminderAction::Snoozed);
            assert_eq!(r.snooze_count, i);
            r.promote(t(8, 10 * i as u32));
            assert_eq!(r.state, ReminderState::Due);
        }
        let tr = r.apply(UserAction::Snoozed).unwrap();
        assert_eq!(tr.action, ReminderAction::Snoozed);
        assert_eq!(r.snooze_count, 3);
        let tr = r.apply(UserAction::Snoozed).unwrap();
        assert_eq!(tr.action, ReminderAction::AutoExpired);
        assert_eq!(r.state, ReminderState::Skipped);
        assert_eq!(r.snooze_count, 3);
    }

    #[test]
    fn expiry_after_third_snooze_auto_skips() {
        let mut r = reminder_at(8, 0);
        r.promote(t(8, 0));
        for _ in 0..3 {
            r.apply(UserAction::Snoozed).unwrap();
        }
        let tr = r.promote(t(8, 30)).expect("expiry at the cap must auto-skip");
        assert_eq!(tr.action, ReminderAction::AutoExpired);
        assert_eq!(r.state, ReminderState::Skipped);
    }

    #[test]
    fn snooze_cap_expiry_auto_skips_in_ticker_path() {
        // A snoozed reminder already at the cap whose time expires.
        let mut r = reminder_at(8, 0);
        r.promote(t(8, 0));
        r.apply(UserAction::Snoozed).unwrap();
        r.snooze_count = SNOOZE_CAP;
        let tr = r.promote(t(9, 0)).expect("expiry at cap must auto-skip");
        assert_eq!(tr.action, ReminderAction::AutoExpired);
        assert_eq!(r.state, ReminderState::Skipped);
    }

    #[test]
    fn is_due_ignores_terminal_states() {
        let mut r = reminder_at(8, 0);
        assert!(r.is_due(t(8, 30)));
        r.promote(t(8, 30));
        r.apply(UserAction::Completed).unwrap();
        assert!(!r.is_due(t(9, 0)));
    }
}
