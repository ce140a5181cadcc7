//! # careclock-core
//!
//! Adaptive reminder scheduling and health scoring for daily care routines.
//!
//! The engine turns a user's health profile and medicine regimens into a
//! personalized daily reminder schedule, tracks how the user responds, and
//! feeds those responses back into three consumers:
//!
//! - a composite daily **health score** (compliance, hydration, medicine),
//! - a 7-day **adaptive analyzer** that proposes time shifts for slots the
//!   user keeps skipping and detects formed habits,
//! - a **caregiver escalation** policy for risky days.
//!
//! [`service::HealthService`] is the single entry point; the modules under
//! it are pure and individually testable.

pub mod adaptive;
pub mod error;
pub mod escalation;
pub mod generator;
pub mod medicine;
pub mod message;
pub mod prescription;
pub mod profile;
pub mod reminder;
pub mod rules;
pub mod score;
pub mod service;
pub mod slot;
pub mod storage;
pub mod ticker;

pub use adaptive::{AdaptiveSuggestion, SuggestionState};
pub use error::{CoreError, Result};
pub use escalation::{AlertIntensity, AlertTrigger, CaregiverAlert};
pub use medicine::{Medicine, MedicineDraft, Priority};
pub use profile::{AgeGroup, Condition, Language, UserDraft, UserPatch, UserProfile};
pub use reminder::{Reminder, ReminderKind, ReminderState, UserAction};
pub use score::{Grade, HealthScore};
pub use service::{ActionOutcome, ApiResponse, Dashboard, HealthService, ReminderView};
pub use slot::SlotKey;
pub use storage::{Config, HealthDb};
pub use ticker::Ticker;
