//! Medicine regimens and their creation drafts.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Reminder priority. Ordering for tie-breaks is High > Medium > Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: lower sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    pub fn from_str_or_medium(s: &str) -> Self {
        match s {
            "HIGH" => Priority::High,
            "LOW" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// How a medicine record entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicineOrigin {
    Manual,
    Ocr,
}

/// A prescribed drug regimen. Owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    /// Ordered times-of-day, one reminder per entry per day.
    pub times: Vec<NaiveTime>,
    /// Decremented by the daily rollover; the medicine deactivates at 0.
    pub remaining_days: u32,
    pub priority: Priority,
    pub origin: MedicineOrigin,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Medicine fields supplied on creation (manually or by the prescription
/// importer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineDraft {
    pub name: String,
    #[serde(default = "default_dosage")]
    pub dosage: String,
    #[serde(default = "default_times")]
    pub times: Vec<NaiveTime>,
    #[serde(default = "default_duration")]
    pub duration_days: u32,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default = "default_origin")]
    pub origin: MedicineOrigin,
}

fn default_dosage() -> String {
    "1 tablet".into()
}

fn default_times() -> Vec<NaiveTime> {
    vec![NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()]
}

fn default_duration() -> u32 {
    7
}

fn default_priority() -> Priority {
    Priority::High
}

fn default_origin() -> MedicineOrigin {
    MedicineOrigin::Manual
}

impl MedicineDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dosage: default_dosage(),
            times: default_times(),
            duration_days: default_duration(),
            priority: default_priority(),
            origin: default_origin(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.times.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "times".into(),
                message: "at least one time-of-day is required".into(),
            });
        }
        if self.duration_days == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_days".into(),
                message: "duration must be at least one day".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn draft_defaults() {
        let draft = MedicineDraft::new("Metformin");
        assert_eq!(draft.dosage, "1 tablet");
        assert_eq!(draft.duration_days, 7);
        assert_eq!(draft.priority, Priority::High);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn draft_rejects_empty_times() {
        let mut draft = MedicineDraft::new("Aspirin");
        draft.times.clear();
        assert!(draft.validate().is_err());
    }
}
