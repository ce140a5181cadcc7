//! Engine facade: every externally visible operation goes through
//! [`HealthService`].
//!
//! Mutating operations serialize per user behind an async mutex so that a
//! concurrent schedule regeneration and reminder action cannot interleave.
//! The SQLite handle itself sits behind a blocking mutex; individual calls
//! hold it only for the duration of their queries.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adaptive::{self, AdaptiveSuggestion, SlotSnapshot, SuggestionState};
use crate::error::{CoreError, Result, ValidationError};
use crate::escalation::{self, CaregiverAlert, EscalationInput};
use crate::generator;
use crate::medicine::{Medicine, MedicineDraft};
use crate::prescription;
use crate::profile::{UserDraft, UserPatch, UserProfile};
use crate::reminder::{ActionEvent, Reminder, Transition, UserAction};
use crate::rules::{condition_rules, water_target};
use crate::score::{self, DailyScoreRecord, HealthScore};
use crate::slot::{SlotKey, SlotState};
use crate::storage::HealthDb;

const KV_LAST_ROLLOVER: &str = "last_rollover";
const ALERT_LIST_LIMIT: u32 = 20;

/// A reminder plus its computed due-ness at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderView {
    #[serde(flatten)]
    pub reminder: Reminder,
    pub is_due: bool,
}

/// Result of applying a user action to a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub reminder: Reminder,
    pub action: String,
    pub caregiver_alerted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrationStatus {
    pub glasses: u32,
    pub target: u32,
    pub percentage: f64,
}

impl HydrationStatus {
    fn new(glasses: u32, target: u32) -> Self {
        let percentage = if target == 0 {
            100.0
        } else {
            (glasses as f64 / target as f64 * 100.0).min(100.0)
        };
        Self {
            glasses,
            target,
            percentage,
        }
    }
}

/// Response envelope shared by every external operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Aggregated view backing the dashboard surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub user: UserProfile,
    pub date: NaiveDate,
    pub reminders: Vec<ReminderView>,
    pub next_due: Option<ReminderView>,
    pub completed_today: usize,
    pub hydration: HydrationStatus,
    pub score: HealthScore,
    pub diet_tips: Vec<String>,
    pub exercise_tips: Vec<String>,
    pub condition_tips: Vec<String>,
    pub suggestions: Vec<AdaptiveSuggestion>,
    pub alerts: Vec<CaregiverAlert>,
}

struct Inner {
    db: StdMutex<HealthDb>,
    user_locks: StdMutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Thread-safe engine handle. Cheap to clone.
#[derive(Clone)]
pub struct HealthService {
    inner: Arc<Inner>,
}

impl HealthService {
    pub fn new(db: HealthDb) -> Self {
        Self {
            inner: Arc::new(Inner {
                db: StdMutex::new(db),
                user_locks: StdMutex::new(HashMap::new()),
            }),
        }
    }

    /// Open the default on-disk database.
    pub fn open() -> Result<Self> {
        Ok(Self::new(HealthDb::open()?))
    }

    fn db(&self) -> MutexGuard<'_, HealthDb> {
        self.inner.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn user_lock(&self, user_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .inner
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id).or_default().clone()
    }

    fn require_user(&self, user_id: i64) -> Result<UserProfile> {
        self.db().get_user(user_id)?.ok_or_else(|| {
            CoreError::Validation(ValidationError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
        })
    }

    // ─── users ───────────────────────────────────────────────────────────

    /// Create a profile and generate its first schedule.
    pub async fn create_user(&self, draft: &UserDraft) -> Result<UserProfile> {
        draft.validate()?;
        let user = self.db().create_user(draft)?;
        info!(user_id = user.id, name = %user.name, "user created");
        let now = Utc::now();
        self.generate_schedule(user.id, now.date_naive(), now.time())
            .await?;
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> Result<UserProfile> {
        self.require_user(user_id)
    }

    pub fn list_users(&self) -> Result<Vec<UserProfile>> {
        Ok(self.db().list_users()?)
    }

    /// Patch a profile; the rest of today's untouched reminders are
    /// regenerated under the new rules.
    pub async fn update_user(&self, user_id: i64, patch: &UserPatch) -> Result<UserProfile> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(ValidationError::MissingField("name").into());
            }
        }
        if let Some(age) = patch.age {
            if age == 0 || age > 130 {
                return Err(ValidationError::InvalidValue {
                    field: "age".into(),
                    message: format!("{age} is out of range"),
                }
                .into());
            }
        }
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let user = self.db().update_user(user_id, patch)?.ok_or_else(|| {
            CoreError::Validation(ValidationError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
        })?;
        let now = Utc::now();
        self.regenerate_locked(&user, now.date_naive(), now.time())?;
        Ok(user)
    }

    // ─── schedule ────────────────────────────────────────────────────────

    /// Regenerate the schedule for a date. Reminders already actioned,
    /// snoozed, or past remain untouched; only future untouched slots are
    /// replaced.
    pub async fn generate_schedule(
        &self,
        user_id: i64,
        date: NaiveDate,
        now: NaiveTime,
    ) -> Result<Vec<Reminder>> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let user = self.require_user(user_id)?;
        self.regenerate_locked(&user, date, now)?;
        Ok(self.db().reminders_for(user_id, date)?)
    }

    /// Must be called with the user lock held.
    fn regenerate_locked(&self, user: &UserProfile, date: NaiveDate, now: NaiveTime) -> Result<()> {
        let db = self.db();
        let medicines = db.list_medicines(user.id, true)?;
        let slots = db.slot_states_for(user.id)?;
        let deleted = db.delete_replaceable(user.id, date, now)?;
        let occupied = db.occupied_slots(user.id, date)?;

        let mut inserted = 0usize;
        for reminder in generator::generate(user, &medicines, &slots, date) {
            if reminder.scheduled <= now || occupied.contains(&reminder.slot) {
                continue;
            }
            db.insert_reminder(&reminder)?;
            inserted += 1;
        }
        debug!(user_id = user.id, %date, deleted, inserted, "schedule regenerated");
        Ok(())
    }

    pub fn list_reminders(
        &self,
        user_id: i64,
        date: NaiveDate,
        now: NaiveTime,
    ) -> Result<Vec<ReminderView>> {
        self.require_user(user_id)?;
        let reminders = self.db().reminders_for(user_id, date)?;
        Ok(reminders
            .into_iter()
            .map(|r| ReminderView {
                is_due: r.is_due(now),
                reminder: r,
            })
            .collect())
    }

    // ─── reminder actions ────────────────────────────────────────────────

    /// Apply a user action, log the outcome, and run the escalation policy.
    pub async fn reminder_action(
        &self,
        reminder_id: Uuid,
        action: UserAction,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome> {
        let user_id = self
            .db()
            .get_reminder(reminder_id)?
            .ok_or_else(|| {
                CoreError::Validation(ValidationError::NotFound {
                    entity: "reminder",
                    id: reminder_id.to_string(),
                })
            })?
            .user_id;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut reminder = self.db().get_reminder(reminder_id)?.ok_or_else(|| {
            CoreError::Validation(ValidationError::NotFound {
                entity: "reminder",
                id: reminder_id.to_string(),
            })
        })?;
        let transition = reminder.apply(action)?;
        self.record_transition(&reminder, transition, now)?;

        let caregiver_alerted = self.escalate_locked(user_id, now.date_naive())?;
        Ok(ActionOutcome {
            action: transition.action.as_str().to_string(),
            reminder,
            caregiver_alerted,
        })
    }

    fn record_transition(
        &self,
        reminder: &Reminder,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let db = self.db();
        db.update_reminder(reminder)?;
        db.log_action(&ActionEvent {
            user_id: reminder.user_id,
            reminder_id: reminder.id,
            slot: reminder.slot.clone(),
            kind: reminder.kind,
            action: transition.action,
            date: reminder.date,
            at: now,
        })?;
        debug!(
            reminder_id = %reminder.id,
            action = transition.action.as_str(),
            state = transition.state.as_str(),
            "reminder transition"
        );
        Ok(())
    }

    /// Run the escalation policy for one day. Returns whether any new alert
    /// was recorded. Must be called with the user lock held.
    fn escalate_locked(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        let user = self.require_user(user_id)?;
        if user.caregiver.is_none() {
            return Ok(false);
        }
        let db = self.db();
        let todays = db.events_for_date(user_id, date)?;
        let yesterdays = db.events_for_date(user_id, date - Duration::days(1))?;
        // Score as of this evaluation, not the last persisted record: a day
        // of skips must trip the low-score trigger even if nobody asked for
        // the score.
        let reminders = db.reminders_for(user_id, date)?;
        let glasses = db.hydration_for(user_id, date)?;
        let score = score::calculate(&reminders, glasses, water_target(user.condition)).score;
        let habit_slots: HashSet<SlotKey> = db
            .slot_states_for(user_id)?
            .into_iter()
            .filter(|s| s.habit_formed)
            .map(|s| s.slot)
            .collect();

        let drafts = escalation::evaluate(&EscalationInput {
            profile: &user,
            score: Some(score),
            todays_events: &todays,
            yesterdays_events: &yesterdays,
            habit_slots: &habit_slots,
            today: date,
        });

        let mut alerted = false;
        for draft in &drafts {
            if db.insert_alert(user_id, draft, date)? {
                info!(
                    user_id,
                    trigger = draft.trigger.as_str(),
                    intensity = draft.intensity.as_str(),
                    "caregiver alert recorded"
                );
                alerted = true;
            }
        }
        Ok(alerted)
    }

    // ─── medicines ───────────────────────────────────────────────────────

    pub async fn add_medicine(&self, user_id: i64, draft: &MedicineDraft) -> Result<Medicine> {
        draft.validate()?;
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let user = self.require_user(user_id)?;
        let medicine = self.db().add_medicine(user_id, draft)?;
        info!(user_id, medicine_id = medicine.id, name = %medicine.name, "medicine added");
        let now = Utc::now();
        self.regenerate_locked(&user, now.date_naive(), now.time())?;
        Ok(medicine)
    }

    pub fn list_medicines(&self, user_id: i64, active_only: bool) -> Result<Vec<Medicine>> {
        self.require_user(user_id)?;
        Ok(self.db().list_medicines(user_id, active_only)?)
    }

    /// Soft-delete a medicine; past reminders keep their history.
    pub async fn remove_medicine(&self, medicine_id: i64) -> Result<()> {
        let medicine = self.db().get_medicine(medicine_id)?.ok_or_else(|| {
            CoreError::Validation(ValidationError::NotFound {
                entity: "medicine",
                id: medicine_id.to_string(),
            })
        })?;
        let lock = self.user_lock(medicine.user_id);
        let _guard = lock.lock().await;
        self.db().deactivate_medicine(medicine_id)?;
        let user = self.require_user(medicine.user_id)?;
        let now = Utc::now();
        self.regenerate_locked(&user, now.date_naive(), now.time())?;
        Ok(())
    }

    /// Parse prescription text and register every extractable medicine.
    pub async fn import_prescription(&self, user_id: i64, text: &str) -> Result<Vec<Medicine>> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let user = self.require_user(user_id)?;

        let mut imported = Vec::new();
        for draft in prescription::parse_prescription_text(text) {
            if draft.validate().is_err() {
                continue;
            }
            imported.push(self.db().add_medicine(user_id, &draft)?);
        }
        info!(user_id, count = imported.len(), "prescription imported");
        if !imported.is_empty() {
            let now = Utc::now();
            self.regenerate_locked(&user, now.date_naive(), now.time())?;
        }
        Ok(imported)
    }

    // ─── hydration ───────────────────────────────────────────────────────

    pub fn hydration(&self, user_id: i64, date: NaiveDate) -> Result<HydrationStatus> {
        let user = self.require_user(user_id)?;
        Ok(HydrationStatus::new(
            self.db().hydration_for(user_id, date)?,
            water_target(user.condition),
        ))
    }

    pub fn set_hydration(&self, user_id: i64, date: NaiveDate, glasses: u32) -> Result<HydrationStatus> {
        let user = self.require_user(user_id)?;
        self.db().set_hydration(user_id, date, glasses)?;
        Ok(HydrationStatus::new(glasses, water_target(user.condition)))
    }

    /// Log one more glass.
    pub fn add_glass(&self, user_id: i64, date: NaiveDate) -> Result<HydrationStatus> {
        let current = self.hydration(user_id, date)?;
        self.set_hydration(user_id, date, current.glasses + 1)
    }

    // ─── scoring ─────────────────────────────────────────────────────────

    /// Compute and persist the composite score for a date.
    pub fn health_score(&self, user_id: i64, date: NaiveDate) -> Result<HealthScore> {
        let user = self.require_user(user_id)?;
        let db = self.db();
        let reminders = db.reminders_for(user_id, date)?;
        let glasses = db.hydration_for(user_id, date)?;
        let result = score::calculate(&reminders, glasses, water_target(user.condition));
        db.save_score(&DailyScoreRecord {
            user_id,
            date,
            score: result.score,
            grade: result.grade,
            breakdown: result.breakdown.clone(),
        })?;
        Ok(result)
    }

    pub fn score_history(&self, user_id: i64, days: u32) -> Result<Vec<DailyScoreRecord>> {
        self.require_user(user_id)?;
        Ok(self.db().score_history(user_id, days)?)
    }

    // ─── adaptive learning ───────────────────────────────────────────────

    /// Run the 7-day analyzer: persist fresh suggestions and update habit
    /// flags. Returns all currently pending suggestions.
    pub async fn run_adaptive(&self, user_id: i64, today: NaiveDate) -> Result<Vec<AdaptiveSuggestion>> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.require_user(user_id)?;
        self.run_adaptive_locked(user_id, today)
    }

    /// Must be called with the user lock held.
    fn run_adaptive_locked(&self, user_id: i64, today: NaiveDate) -> Result<Vec<AdaptiveSuggestion>> {
        let db = self.db();
        let states = db.slot_states_for(user_id)?;
        let state_by_slot: HashMap<SlotKey, SlotState> = states
            .into_iter()
            .map(|s| (s.slot.clone(), s))
            .collect();

        // Snapshot every slot seen today, preferring persisted canonical
        // times over the generated ones.
        let mut snapshots: Vec<SlotSnapshot> = Vec::new();
        let mut seen: HashSet<SlotKey> = HashSet::new();
        for r in db.reminders_for(user_id, today)? {
            if !seen.insert(r.slot.clone()) {
                continue;
            }
            let (canonical_time, window_reset_at) = match state_by_slot.get(&r.slot) {
                Some(s) => (s.canonical_time, s.window_reset_at),
                None => (r.scheduled, None),
            };
            snapshots.push(SlotSnapshot {
                slot: r.slot.clone(),
                canonical_time,
                window_reset_at,
            });
        }

        let events = db.events_since(user_id, today - Duration::days(adaptive::WINDOW_DAYS - 1))?;
        let pending: HashSet<SlotKey> = db
            .pending_suggestions(user_id)?
            .into_iter()
            .map(|s| s.slot)
            .collect();

        let outcome = adaptive::analyze(user_id, &snapshots, &events, &pending, today);

        for suggestion in &outcome.suggestions {
            db.insert_suggestion(suggestion)?;
            info!(
                user_id,
                slot = %suggestion.slot,
                suggested = %suggestion.suggested_time,
                "adaptive suggestion recorded"
            );
        }

        // Habit flags are recomputed from scratch each run.
        let habit: HashSet<&SlotKey> = outcome.habit_slots.iter().collect();
        for snapshot in &snapshots {
            let formed = habit.contains(&snapshot.slot);
            match state_by_slot.get(&snapshot.slot) {
                Some(state) if state.habit_formed != formed => {
                    db.set_habit_formed(user_id, &snapshot.slot, formed)?;
                }
                None if formed => {
                    db.upsert_slot_state(&SlotState {
                        user_id,
                        slot: snapshot.slot.clone(),
                        canonical_time: snapshot.canonical_time,
                        habit_formed: true,
                        window_reset_at: None,
                    })?;
                }
                _ => {}
            }
        }

        Ok(db.pending_suggestions(user_id)?)
    }

    pub fn list_suggestions(&self, user_id: i64) -> Result<Vec<AdaptiveSuggestion>> {
        self.require_user(user_id)?;
        Ok(self.db().pending_suggestions(user_id)?)
    }

    /// Accept a suggestion: the slot's canonical time shifts and its skip
    /// window restarts so the slot does not immediately re-trigger.
    pub async fn apply_suggestion(&self, id: Uuid, now: DateTime<Utc>) -> Result<AdaptiveSuggestion> {
        let mut suggestion = self.suggestion_pending(id)?;
        let lock = self.user_lock(suggestion.user_id);
        let _guard = lock.lock().await;
        // Re-read under the lock; a concurrent call may have resolved it.
        suggestion = self.suggestion_pending(id)?;

        let db = self.db();
        let prior = db
            .slot_states_for(suggestion.user_id)?
            .into_iter()
            .find(|s| s.slot == suggestion.slot);
        db.upsert_slot_state(&SlotState {
            user_id: suggestion.user_id,
            slot: suggestion.slot.clone(),
            canonical_time: suggestion.suggested_time,
            habit_formed: prior.map(|s| s.habit_formed).unwrap_or(false),
            window_reset_at: Some(now),
        })?;
        db.set_suggestion_state(id, SuggestionState::Applied)?;

        // Shift today's instance too, if it is still untouched.
        let today = now.date_naive();
        for mut r in db.reminders_for(suggestion.user_id, today)? {
            if r.slot == suggestion.slot
                && !r.state.is_terminal()
                && r.snooze_count == 0
                && r.scheduled > now.time()
            {
                r.scheduled = suggestion.suggested_time;
                db.update_reminder(&r)?;
            }
        }

        suggestion.state = SuggestionState::Applied;
        info!(
            user_id = suggestion.user_id,
            slot = %suggestion.slot,
            "suggestion applied"
        );
        Ok(suggestion)
    }

    pub async fn dismiss_suggestion(&self, id: Uuid) -> Result<AdaptiveSuggestion> {
        let mut suggestion = self.suggestion_pending(id)?;
        let lock = self.user_lock(suggestion.user_id);
        let _guard = lock.lock().await;
        suggestion = self.suggestion_pending(id)?;
        self.db().set_suggestion_state(id, SuggestionState::Dismissed)?;
        suggestion.state = SuggestionState::Dismissed;
        Ok(suggestion)
    }

    fn suggestion_pending(&self, id: Uuid) -> Result<AdaptiveSuggestion> {
        let suggestion = self.db().get_suggestion(id)?.ok_or_else(|| {
            CoreError::Validation(ValidationError::NotFound {
                entity: "suggestion",
                id: id.to_string(),
            })
        })?;
        if suggestion.state.is_terminal() {
            return Err(ValidationError::InvalidValue {
                field: "state".into(),
                message: format!("suggestion is already {}", suggestion.state.as_str()),
            }
            .into());
        }
        Ok(suggestion)
    }

    // ─── alerts and dashboard ────────────────────────────────────────────

    pub fn caregiver_alerts(&self, user_id: i64) -> Result<Vec<CaregiverAlert>> {
        self.require_user(user_id)?;
        Ok(self.db().list_alerts(user_id, ALERT_LIST_LIMIT)?)
    }

    pub fn resolve_alert(&self, alert_id: i64) -> Result<()> {
        if !self.db().resolve_alert(alert_id)? {
            return Err(ValidationError::NotFound {
                entity: "alert",
                id: alert_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn dashboard(&self, user_id: i64, date: NaiveDate, now: NaiveTime) -> Result<Dashboard> {
        let user = self.require_user(user_id)?;
        let reminders = self.list_reminders(user_id, date, now)?;
        let hydration = self.hydration(user_id, date)?;
        let score = self.health_score(user_id, date)?;
        let rules = condition_rules(user.condition);

        let completed_today = reminders
            .iter()
            .filter(|v| v.reminder.state == crate::reminder::ReminderState::Completed)
            .count();
        let next_due = reminders
            .iter()
            .filter(|v| !v.reminder.state.is_terminal() && v.reminder.scheduled >= now)
            .min_by_key(|v| v.reminder.scheduled)
            .cloned();

        let db = self.db();
        Ok(Dashboard {
            user,
            date,
            next_due,
            completed_today,
            hydration,
            score,
            diet_tips: rules.diet.iter().map(|s| s.to_string()).collect(),
            exercise_tips: rules.exercises.iter().map(|s| s.to_string()).collect(),
            condition_tips: rules.tips.iter().map(|s| s.to_string()).collect(),
            suggestions: db.pending_suggestions(user_id)?,
            alerts: db.list_alerts(user_id, ALERT_LIST_LIMIT)?,
            reminders,
        })
    }

    // ─── ticker entry point ──────────────────────────────────────────────

    /// One sweep: promote due reminders, auto-expire exhausted snoozes, and
    /// run the daily rollover once per calendar day. A failure for one user
    /// never blocks the others.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        let users = self.list_users()?;
        let date = now.date_naive();
        let rollover = self.rollover_pending(date)?;

        for user in users {
            if let Err(err) = self.tick_user(&user, now, rollover).await {
                warn!(user_id = user.id, error = %err, "tick failed for user");
            }
        }

        if rollover {
            self.db()
                .kv_set(KV_LAST_ROLLOVER, &date.format("%Y-%m-%d").to_string())?;
            info!(%date, "daily rollover complete");
        }
        Ok(())
    }

    fn rollover_pending(&self, date: NaiveDate) -> Result<bool> {
        let marker = self.db().kv_get(KV_LAST_ROLLOVER)?;
        Ok(marker.as_deref() != Some(date.format("%Y-%m-%d").to_string().as_str()))
    }

    async fn tick_user(&self, user: &UserProfile, now: DateTime<Utc>, rollover: bool) -> Result<()> {
        let lock = self.user_lock(user.id);
        let _guard = lock.lock().await;
        let date = now.date_naive();

        if rollover {
            // Close out yesterday, consume one course day, build today's
            // schedule, refresh the analyzer. The whole sequence stays
            // inside the user's exclusive section.
            let yesterday = date - Duration::days(1);
            self.health_score(user.id, yesterday)?;
            self.db().decrement_remaining_days(user.id)?;
            self.regenerate_locked(user, date, now.time())?;
            self.run_adaptive_locked(user.id, date)?;
        }

        self.promote_and_escalate(user.id, date, now)
    }

    fn promote_and_escalate(&self, user_id: i64, date: NaiveDate, now: DateTime<Utc>) -> Result<()> {
        let reminders = self.db().reminders_for(user_id, date)?;
        let mut expired = false;
        for mut reminder in reminders {
            let before = reminder.state;
            if let Some(transition) = reminder.promote(now.time()) {
                self.record_transition(&reminder, transition, now)?;
                expired = true;
            } else if reminder.state != before {
                self.db().update_reminder(&reminder)?;
            }
        }
        if expired {
            self.escalate_locked(user_id, date)?;
        }
        Ok(())
    }
}
