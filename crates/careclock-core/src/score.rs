//! Composite daily health score.
//!
//! `score = compliance*0.4 + hydration*0.2 + medicine*0.4`, clamped to
//! [0, 100]. Medicine adherence is double-weighted on purpose: once inside
//! the general compliance component and once standalone.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reminder::{Reminder, ReminderKind, ReminderState, SNOOZE_CAP};

pub const WEIGHT_COMPLIANCE: f64 = 0.4;
pub const WEIGHT_HYDRATION: f64 = 0.2;
pub const WEIGHT_MEDICINE: f64 = 0.4;
/// Below this score the escalation policy treats the day as high risk.
pub const RISK_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    NeedsImprovement,
    RiskAlert,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::Excellent
        } else if score >= 60.0 {
            Grade::Good
        } else if score >= 40.0 {
            Grade::NeedsImprovement
        } else {
            Grade::RiskAlert
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::NeedsImprovement => "Needs Improvement",
            Grade::RiskAlert => "Risk Alert",
        }
    }
}

/// Per-component breakdown persisted alongside the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub compliance_pct: f64,
    pub hydration_glasses: u32,
    pub hydration_target: u32,
    pub hydration_pct: f64,
    pub medicine_pct: f64,
    pub completed: usize,
    pub skipped: usize,
    pub snoozed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: f64,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
}

/// One day's persisted score, unique per (user, date); recomputation within
/// the same date overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyScoreRecord {
    pub user_id: i64,
    pub date: NaiveDate,
    pub score: f64,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
}

/// Compute today's score from today's reminders and hydration log.
///
/// Zero applicable reminders default both compliance components to 100:
/// early-day queries are not punished and there is no divide-by-zero.
pub fn calculate(reminders: &[Reminder], glasses: u32, target: u32) -> HealthScore {
    let compliance_pct = compliance(reminders.iter().filter(|r| r.kind != ReminderKind::HealthTip));
    let medicine_pct = compliance(reminders.iter().filter(|r| r.kind == ReminderKind::Medicine));
    let hydration_pct = if target == 0 {
        100.0
    } else {
        (glasses as f64 / target as f64 * 100.0).min(100.0)
    };

    let score = (compliance_pct * WEIGHT_COMPLIANCE
        + hydration_pct * WEIGHT_HYDRATION
        + medicine_pct * WEIGHT_MEDICINE)
        .clamp(0.0, 100.0);

    let completed = reminders
        .iter()
        .filter(|r| r.state == ReminderState::Completed)
        .count();
    let skipped = reminders
        .iter()
        .filter(|r| r.state == ReminderState::Skipped)
        .count();
    let snoozed = reminders
        .iter()
        .filter(|r| r.state == ReminderState::Snoozed)
        .count();

    HealthScore {
        score,
        grade: Grade::from_score(score),
        breakdown: ScoreBreakdown {
            compliance_pct,
            hydration_glasses: glasses,
            hydration_target: target,
            hydration_pct,
            medicine_pct,
            completed,
            skipped,
            snoozed,
        },
    }
}

/// Completed out of (completed + skipped + snoozed past the cap), as a
/// percentage; 100 when the denominator is zero.
fn compliance<'a>(reminders: impl Iterator<Item = &'a Reminder>) -> f64 {
    let mut completed = 0usize;
    let mut resolved = 0usize;
    for r in reminders {
        match r.state {
            ReminderState::Completed => {
                completed += 1;
                resolved += 1;
            }
            ReminderState::Skipped => resolved += 1,
            ReminderState::Snoozed if r.snooze_count >= SNOOZE_CAP => resolved += 1,
            _ => {}
        }
    }
    if resolved == 0 {
        100.0
    } else {
        completed as f64 / resolved as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medicine::Priority;
    use crate::message::{MessageKind, MessageSpec};
    use crate::profile::Language;
    use crate::slot::SlotKey;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    fn reminder(kind: ReminderKind, state: ReminderState) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            user_id: 1,
            slot: SlotKey::water(0),
            kind,
            title: String::new(),
            body: String::new(),
            message: MessageSpec::new(Language::En, MessageKind::Water),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            scheduled: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            priority: Priority::Medium,
            state,
            snooze_count: 0,
            medicine_id: None,
        }
    }

    #[test]
    fn empty_day_defaults_to_100_compliance_and_medicine() {
        let score = calculate(&[], 0, 8);
        assert_eq!(score.breakdown.compliance_pct, 100.0);
        assert_eq!(score.breakdown.medicine_pct, 100.0);
        assert_eq!(score.breakdown.hydration_pct, 0.0);
    }

    #[test]
    fn weighted_formula_and_grade() {
        // compliance=100, hydration=50, medicine=100 => 90, Excellent.
        let reminders = vec![
            reminder(ReminderKind::Medicine, ReminderState::Completed),
            reminder(ReminderKind::Water, ReminderState::Completed),
        ];
        let score = calculate(&reminders, 4, 8);
        assert_eq!(score.breakdown.compliance_pct, 100.0);
        assert_eq!(score.breakdown.hydration_pct, 50.0);
        assert_eq!(score.breakdown.medicine_pct, 100.0);
        assert!((score.score - 90.0).abs() < 1e-9);
        assert_eq!(score.grade, Grade::Excellent);
    }

    #[test]
    fn pending_and_due_reminders_do_not_count_against_compliance() {
        let reminders = vec![
            reminder(ReminderKind::Medicine, ReminderState::Completed),
            reminder(ReminderKind::Water, ReminderState::Pending),
            reminder(ReminderKind::Meal, ReminderState::Due),
        ];
        let score = calculate(&reminders, 8, 8);
        assert_eq!(score.breakdown.compliance_pct, 100.0);
    }

    #[test]
    fn health_tips_are_excluded_from_compliance() {
        let reminders = vec![
            reminder(ReminderKind::HealthTip, ReminderState::Skipped),
            reminder(ReminderKind::Water, ReminderState::Completed),
        ];
        let score = calculate(&reminders, 8, 8);
        assert_eq!(score.breakdown.compliance_pct, 100.0);
    }

    #[test]
    fn snoozed_past_cap_counts_as_unresolved_failure() {
        let mut capped = reminder(ReminderKind::Medicine, ReminderState::Snoozed);
        capped.snooze_count = SNOOZE_CAP;
        let reminders = vec![
            capped,
            reminder(ReminderKind::Medicine, ReminderState::Completed),
        ];
        let score = calculate(&reminders, 8, 8);
        assert_eq!(score.breakdown.compliance_pct, 50.0);
        assert_eq!(score.breakdown.medicine_pct, 50.0);
    }

    #[test]
    fn hydration_is_capped_at_100() {
        let score = calculate(&[], 20, 8);
        assert_eq!(score.breakdown.hydration_pct, 100.0);
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::from_score(80.0), Grade::Excellent);
        assert_eq!(Grade::from_score(79.9), Grade::Good);
        assert_eq!(Grade::from_score(60.0), Grade::Good);
        assert_eq!(Grade::from_score(40.0), Grade::NeedsImprovement);
        assert_eq!(Grade::from_score(39.9), Grade::RiskAlert);
    }

    #[test]
    fn all_skipped_day_is_risk_alert() {
        let reminders = vec![
            reminder(ReminderKind::Medicine, ReminderState::Skipped),
            reminder(ReminderKind::Water, ReminderState::Skipped),
        ];
        let score = calculate(&reminders, 0, 8);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.grade, Grade::RiskAlert);
    }
}
