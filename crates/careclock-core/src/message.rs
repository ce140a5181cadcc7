//! Notification payloads handed to external renderers.
//!
//! Template rendering (voice strings, localized text) lives outside the
//! engine. Each reminder carries a [`MessageSpec`] -- the locale tag plus the
//! parameters a template needs -- and the engine fills the reminder body with
//! the built-in English fallback.

use serde::{Deserialize, Serialize};

use crate::profile::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Medicine,
    Water,
    Exercise,
    Meal,
    Sleep,
    Wake,
    HealthTip,
}

/// Parameters for a notification template. Unused fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicine_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// Locale tag + template parameters for one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSpec {
    pub lang: Language,
    pub kind: MessageKind,
    #[serde(default)]
    pub params: MessageParams,
}

impl MessageSpec {
    pub fn new(lang: Language, kind: MessageKind) -> Self {
        Self {
            lang,
            kind,
            params: MessageParams::default(),
        }
    }

    pub fn with_medicine(mut self, name: &str, dosage: &str) -> Self {
        self.params.medicine_name = Some(name.to_string());
        self.params.dosage = Some(dosage.to_string());
        self
    }

    pub fn with_activity(mut self, activity: &str) -> Self {
        self.params.activity = Some(activity.to_string());
        self
    }

    pub fn with_meal(mut self, meal: &str) -> Self {
        self.params.meal = Some(meal.to_string());
        self
    }

    pub fn with_tip(mut self, tip: &str) -> Self {
        self.params.tip = Some(tip.to_string());
        self
    }

    /// Built-in English rendering used for the reminder body when no
    /// external renderer is wired up.
    pub fn fallback_text(&self) -> String {
        match self.kind {
            MessageKind::Medicine => format!(
                "Time to take your {} ({}). Please take it now!",
                self.params.medicine_name.as_deref().unwrap_or("medicine"),
                self.params.dosage.as_deref().unwrap_or("1 tablet"),
            ),
            MessageKind::Water => "Stay hydrated! Drink a glass of water now.".to_string(),
            MessageKind::Exercise => format!(
                "Time for your exercise: {}. Keep moving!",
                self.params.activity.as_deref().unwrap_or("a short walk"),
            ),
            MessageKind::Meal => format!(
                "Meal time reminder: {}. Eat healthy!",
                self.params.meal.as_deref().unwrap_or("your meal"),
            ),
            MessageKind::Sleep => "It's time to sleep. Good night! Rest well.".to_string(),
            MessageKind::Wake => "Good morning! Start your healthy day.".to_string(),
            MessageKind::HealthTip => self
                .params
                .tip
                .clone()
                .unwrap_or_else(|| "Stay on top of your health today.".to_string()),
        }
    }
}
