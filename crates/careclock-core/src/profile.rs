//! User profiles and the closed condition / language vocabularies.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fallback wake time when a profile has none (07:00).
pub fn default_wake_time() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default()
}

/// Fallback sleep time when a profile has none (22:00).
pub fn default_sleep_time() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default()
}

/// Known health conditions plus the `General` fallback.
///
/// The set is closed on purpose: every rule table in [`crate::rules`]
/// matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Diabetes,
    Hypertension,
    HeartDisease,
    Asthma,
    Thyroid,
    Obesity,
    Anxiety,
    KidneyDisease,
    Arthritis,
    Insomnia,
    General,
}

impl Condition {
    pub const ALL: [Condition; 11] = [
        Condition::Diabetes,
        Condition::Hypertension,
        Condition::HeartDisease,
        Condition::Asthma,
        Condition::Thyroid,
        Condition::Obesity,
        Condition::Anxiety,
        Condition::KidneyDisease,
        Condition::Arthritis,
        Condition::Insomnia,
        Condition::General,
    ];

    /// Lenient parse from free text ("Type 2 Diabetes" -> `Diabetes`).
    /// Anything unrecognized falls back to `General` -- never errors.
    pub fn parse(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return Condition::General;
        }
        for condition in Condition::ALL {
            if condition != Condition::General && lower.contains(condition.keyword()) {
                return condition;
            }
        }
        // Common synonyms that don't contain the canonical keyword.
        if lower.contains("blood pressure") || lower.contains("bp") {
            return Condition::Hypertension;
        }
        if lower.contains("cardiac") || lower.contains("heart") {
            return Condition::HeartDisease;
        }
        if lower.contains("renal") || lower.contains("kidney") {
            return Condition::KidneyDisease;
        }
        Condition::General
    }

    fn keyword(&self) -> &'static str {
        match self {
            Condition::Diabetes => "diabetes",
            Condition::Hypertension => "hypertension",
            Condition::HeartDisease => "heart disease",
            Condition::Asthma => "asthma",
            Condition::Thyroid => "thyroid",
            Condition::Obesity => "obesity",
            Condition::Anxiety => "anxiety",
            Condition::KidneyDisease => "kidney disease",
            Condition::Arthritis => "arthritis",
            Condition::Insomnia => "insomnia",
            Condition::General => "general",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Diabetes => "diabetes",
            Condition::Hypertension => "hypertension",
            Condition::HeartDisease => "heart_disease",
            Condition::Asthma => "asthma",
            Condition::Thyroid => "thyroid",
            Condition::Obesity => "obesity",
            Condition::Anxiety => "anxiety",
            Condition::KidneyDisease => "kidney_disease",
            Condition::Arthritis => "arthritis",
            Condition::Insomnia => "insomnia",
            Condition::General => "general",
        }
    }

    pub fn from_str_or_general(s: &str) -> Self {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .unwrap_or(Condition::General)
    }

    /// Conditions that always map to low-intensity exercise slots.
    pub fn is_high_risk(&self) -> bool {
        matches!(
            self,
            Condition::HeartDisease | Condition::Asthma | Condition::KidneyDisease
        )
    }
}

/// Supported notification locales. Rendering is external; the engine only
/// tags payloads with the locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
    Kn,
    Te,
}

impl Language {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Kn => "kn",
            Language::Te => "te",
        }
    }

    /// Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "hi" => Language::Hi,
            "kn" => Language::Kn,
            "te" => Language::Te,
            _ => Language::En,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

/// Age groups used by the exercise and hydration rule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Young,
    Adult,
    Senior,
}

impl AgeGroup {
    pub fn from_age(age: u32) -> Self {
        if age < 35 {
            AgeGroup::Young
        } else if age <= 60 {
            AgeGroup::Adult
        } else {
            AgeGroup::Senior
        }
    }
}

/// One person under care. Root entity: every other record is scoped to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub age: u32,
    pub condition: Condition,
    pub wake_time: NaiveTime,
    pub sleep_time: NaiveTime,
    pub language: Language,
    /// Caregiver contact; escalation is silent when absent.
    pub caregiver: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::from_age(self.age)
    }
}

/// Profile fields supplied on signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    #[serde(default = "default_age")]
    pub age: u32,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub wake_time: Option<NaiveTime>,
    #[serde(default)]
    pub sleep_time: Option<NaiveTime>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub caregiver: Option<String>,
}

fn default_age() -> u32 {
    25
}

impl UserDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.age == 0 || self.age > 130 {
            return Err(ValidationError::InvalidValue {
                field: "age".into(),
                message: format!("{} is out of range", self.age),
            });
        }
        Ok(())
    }
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub wake_time: Option<NaiveTime>,
    #[serde(default)]
    pub sleep_time: Option<NaiveTime>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub caregiver: Option<String>,
}
