//! Caregiver escalation policy.
//!
//! Evaluated after every reminder action and on each scheduled sweep. The
//! policy is pure; the storage layer deduplicates per (user, trigger, date)
//! so repeated evaluations within a day are harmless.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::profile::UserProfile;
use crate::reminder::{ActionEvent, ReminderKind};
use crate::score::RISK_THRESHOLD;
use crate::slot::SlotKey;

/// Medicine skips in one day that notify the caregiver.
pub const MEDICINE_SKIP_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTrigger {
    /// Daily health score fell below the risk threshold.
    LowScore,
    /// Three or more medicine skips in a single day.
    MedicineSkips,
    /// The same medicine slot was skipped two days in a row.
    ConsecutiveSlotSkip,
}

impl AlertTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTrigger::LowScore => "low_score",
            AlertTrigger::MedicineSkips => "medicine_skips",
            AlertTrigger::ConsecutiveSlotSkip => "consecutive_slot_skip",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "low_score" => Some(AlertTrigger::LowScore),
            "medicine_skips" => Some(AlertTrigger::MedicineSkips),
            "consecutive_slot_skip" => Some(AlertTrigger::ConsecutiveSlotSkip),
            _ => None,
        }
    }
}

/// Formed habits soften slot-based alerts; score alerts stay at full
/// intensity regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertIntensity {
    Normal,
    Reduced,
}

impl AlertIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertIntensity::Normal => "normal",
            AlertIntensity::Reduced => "reduced",
        }
    }

    pub fn from_str_or_normal(s: &str) -> Self {
        if s == "reduced" {
            AlertIntensity::Reduced
        } else {
            AlertIntensity::Normal
        }
    }
}

/// Persisted alert row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverAlert {
    pub id: i64,
    pub user_id: i64,
    pub trigger: AlertTrigger,
    pub intensity: AlertIntensity,
    pub message: String,
    pub date: NaiveDate,
    pub sent_at: DateTime<Utc>,
    pub resolved: bool,
}

/// An alert the policy wants persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    pub trigger: AlertTrigger,
    pub intensity: AlertIntensity,
    pub message: String,
}

/// Everything the policy looks at for one user and one day.
pub struct EscalationInput<'a> {
    pub profile: &'a UserProfile,
    /// Today's score at evaluation time.
    pub score: Option<f64>,
    pub todays_events: &'a [ActionEvent],
    pub yesterdays_events: &'a [ActionEvent],
    pub habit_slots: &'a HashSet<SlotKey>,
    pub today: NaiveDate,
}

/// Evaluate all triggers. Users without a caregiver contact never escalate.
pub fn evaluate(input: &EscalationInput<'_>) -> Vec<AlertDraft> {
    if input.profile.caregiver.is_none() {
        return Vec::new();
    }

    let mut drafts = Vec::new();
    let name = &input.profile.name;
    let date = input.today.format("%d %b %Y");

    if let Some(score) = input.score {
        if score < RISK_THRESHOLD {
            drafts.push(AlertDraft {
                trigger: AlertTrigger::LowScore,
                intensity: AlertIntensity::Normal,
                message: format!(
                    "HEALTH ALERT: {name}'s health score dropped to {score:.1} \
                     today ({date}). Please check on them immediately."
                ),
            });
        }
    }

    let skipped_med_slots: Vec<&SlotKey> = input
        .todays_events
        .iter()
        .filter(|e| e.kind == ReminderKind::Medicine && e.action.is_skip())
        .map(|e| &e.slot)
        .collect();
    if skipped_med_slots.len() >= MEDICINE_SKIP_THRESHOLD {
        let missed = skipped_med_slots.len();
        let intensity = if skipped_med_slots
            .iter()
            .all(|slot| input.habit_slots.contains(slot))
        {
            AlertIntensity::Reduced
        } else {
            AlertIntensity::Normal
        };
        drafts.push(AlertDraft {
            trigger: AlertTrigger::MedicineSkips,
            intensity,
            message: format!(
                "HEALTH ALERT: {name} has missed {missed} critical medicine \
                 reminders today ({date}). Please check on them immediately."
            ),
        });
    }

    if let Some(slot) = consecutive_skip(input) {
        let intensity = if input.habit_slots.contains(slot) {
            AlertIntensity::Reduced
        } else {
            AlertIntensity::Normal
        };
        drafts.push(AlertDraft {
            trigger: AlertTrigger::ConsecutiveSlotSkip,
            intensity,
            message: format!(
                "HEALTH ALERT: {name} has skipped the same medicine reminder \
                 two days in a row ({date}). Please check on them."
            ),
        });
    }

    drafts
}

/// First medicine slot skipped both yesterday and today, if any. Other
/// reminder kinds never trip this trigger.
fn consecutive_skip<'a>(input: &'a EscalationInput<'_>) -> Option<&'a SlotKey> {
    let yesterday: HashSet<&SlotKey> = input
        .yesterdays_events
        .iter()
        .filter(|e| e.kind == ReminderKind::Medicine && e.action.is_skip())
        .map(|e| &e.slot)
        .collect();
    input
        .todays_events
        .iter()
        .find(|e| {
            e.kind == ReminderKind::Medicine && e.action.is_skip() && yesterday.contains(&e.slot)
        })
        .map(|e| &e.slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Condition, Language, UserProfile};
    use crate::reminder::ReminderAction;
    use chrono::NaiveTime;
    use uuid::Uuid;

    fn profile(caregiver: Option<&str>) -> UserProfile {
        UserProfile {
            id: 1,
            name: "Asha".into(),
            age: 68,
            condition: Condition::Diabetes,
            wake_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            sleep_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            language: Language::En,
            caregiver: caregiver.map(String::from),
            created_at: Utc::now(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn event(slot: SlotKey, kind: ReminderKind, action: ReminderAction, date: NaiveDate) -> ActionEvent {
        ActionEvent {
            user_id: 1,
            reminder_id: Uuid::new_v4(),
            slot,
            kind,
            action,
            date,
            at: date.and_hms_opt(12, 0, 0).unwrap().and_utc(),
        }
    }

    fn med_skips(n: usize, date: NaiveDate) -> Vec<ActionEvent> {
        (0..n)
            .map(|i| {
                event(
                    SlotKey::medicine(1, i),
                    ReminderKind::Medicine,
                    ReminderAction::Skipped,
                    date,
                )
            })
            .collect()
    }

    fn input<'a>(
        profile: &'a UserProfile,
        score: Option<f64>,
        todays: &'a [ActionEvent],
        yesterdays: &'a [ActionEvent],
        habits: &'a HashSet<SlotKey>,
    ) -> EscalationInput<'a> {
        EscalationInput {
            profile,
            score,
            todays_events: todays,
            yesterdays_events: yesterdays,
            habit_slots: habits,
            today: day(10),
        }
    }

    #[test]
    fn no_caregiver_means_no_alerts_ever() {
        let p = profile(None);
        let todays = med_skips(5, day(10));
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, Some(10.0), &todays, &[], &habits));
        assert!(drafts.is_empty());
    }

    #[test]
    fn three_medicine_skips_trigger_alert() {
        let p = profile(Some("+911234567890"));
        let todays = med_skips(3, day(10));
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, None, &todays, &[], &habits));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].trigger, AlertTrigger::MedicineSkips);
        assert_eq!(drafts[0].intensity, AlertIntensity::Normal);
        assert!(drafts[0].message.contains("missed 3 critical medicine"));
        assert!(drafts[0].message.contains("Asha"));
    }

    #[test]
    fn two_medicine_skips_do_not_trigger() {
        let p = profile(Some("+911234567890"));
        let todays = med_skips(2, day(10));
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, None, &todays, &[], &habits));
        assert!(drafts.is_empty());
    }

    #[test]
    fn auto_expired_counts_as_a_skip() {
        let p = profile(Some("care@example.com"));
        let todays: Vec<_> = (0..3)
            .map(|i| {
                event(
                    SlotKey::medicine(1, i),
                    ReminderKind::Medicine,
                    ReminderAction::AutoExpired,
                    day(10),
                )
            })
            .collect();
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, None, &todays, &[], &habits));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].trigger, AlertTrigger::MedicineSkips);
    }

    #[test]
    fn low_score_triggers_at_full_intensity() {
        let p = profile(Some("care@example.com"));
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, Some(39.9), &[], &[], &habits));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].trigger, AlertTrigger::LowScore);
        assert_eq!(drafts[0].intensity, AlertIntensity::Normal);

        let drafts = evaluate(&input(&p, Some(40.0), &[], &[], &habits));
        assert!(drafts.is_empty());
    }

    #[test]
    fn consecutive_slot_skip_needs_both_days() {
        let p = profile(Some("care@example.com"));
        let slot = SlotKey::medicine(7, 0);
        let todays = vec![event(
            slot.clone(),
            ReminderKind::Medicine,
            ReminderAction::Skipped,
            day(10),
        )];
        let yesterdays = vec![event(
            slot.clone(),
            ReminderKind::Medicine,
            ReminderAction::Skipped,
            day(9),
        )];
        let habits = HashSet::new();

        let drafts = evaluate(&input(&p, None, &todays, &yesterdays, &habits));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].trigger, AlertTrigger::ConsecutiveSlotSkip);

        // Different slot yesterday: no alert.
        let other = vec![event(
            SlotKey::medicine(7, 1),
            ReminderKind::Medicine,
            ReminderAction::Skipped,
            day(9),
        )];
        let drafts = evaluate(&input(&p, None, &todays, &other, &habits));
        assert!(drafts.is_empty());
    }

    #[test]
    fn consecutive_skips_of_non_medicine_slots_do_not_alert() {
        let p = profile(Some("care@example.com"));
        let slot = SlotKey::water(2);
        let todays = vec![event(
            slot.clone(),
            ReminderKind::Water,
            ReminderAction::Skipped,
            day(10),
        )];
        let yesterdays = vec![event(
            slot,
            ReminderKind::Water,
            ReminderAction::Skipped,
            day(9),
        )];
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, None, &todays, &yesterdays, &habits));
        assert!(drafts.is_empty());
    }

    #[test]
    fn habit_slots_soften_slot_alerts_but_not_score_alerts() {
        let p = profile(Some("care@example.com"));
        let todays = med_skips(3, day(10));
        let habits: HashSet<_> = (0..3).map(|i| SlotKey::medicine(1, i)).collect();
        let drafts = evaluate(&input(&p, Some(20.0), &todays, &[], &habits));
        assert_eq!(drafts.len(), 2);
        let low = drafts.iter().find(|d| d.trigger == AlertTrigger::LowScore).unwrap();
        assert_eq!(low.intensity, AlertIntensity::Normal);
        let med = drafts
            .iter()
            .find(|d| d.trigger == AlertTrigger::MedicineSkips)
            .unwrap();
        assert_eq!(med.intensity, AlertIntensity::Reduced);
    }

    #[test]
    fn multiple_triggers_emit_multiple_drafts() {
        let p = profile(Some("care@example.com"));
        let slot = SlotKey::medicine(1, 0);
        let mut todays = med_skips(3, day(10));
        todays.push(event(
            slot.clone(),
            ReminderKind::Medicine,
            ReminderAction::Skipped,
            day(10),
        ));
        let yesterdays = vec![event(
            slot,
            ReminderKind::Medicine,
            ReminderAction::Skipped,
            day(9),
        )];
        let habits = HashSet::new();
        let drafts = evaluate(&input(&p, Some(10.0), &todays, &yesterdays, &habits));
        let triggers: HashSet<_> = drafts.iter().map(|d| d.trigger).collect();
        assert_eq!(triggers.len(), 3);
    }
}
