//! SQLite-backed persistence for the scheduling engine.
//!
//! Single-connection store holding:
//! - User profiles and medicine regimens
//! - Reminder instances (retained forever as history)
//! - The append-only action event log
//! - Hydration logs, daily scores, slot states, suggestions, alerts
//! - Key-value store for engine bookkeeping (daily rollover marker)

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

use crate::adaptive::{AdaptiveSuggestion, SuggestionState};
use crate::error::DatabaseError;
use crate::escalation::{AlertDraft, AlertIntensity, AlertTrigger, CaregiverAlert};
use crate::generator;
use crate::medicine::{Medicine, MedicineDraft, MedicineOrigin, Priority};
use crate::message::MessageSpec;
use crate::profile::{
    default_sleep_time, default_wake_time, Condition, Language, UserDraft, UserPatch,
    UserProfile,
};
use crate::reminder::{ActionEvent, Reminder, ReminderAction, ReminderKind, ReminderState};
use crate::score::{DailyScoreRecord, Grade, ScoreBreakdown};
use crate::slot::{SlotKey, SlotState};

use super::data_dir;

const TIME_FMT: &str = "%H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

/// SQLite database for all engine state.
pub struct HealthDb {
    conn: Connection,
}

type DbResult<T> = Result<T, DatabaseError>;

impl HealthDb {
    /// Open the database at `~/.config/careclock/careclock.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, crate::error::CoreError> {
        let path = data_dir()?.join("careclock.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open at an explicit path. Used by integration tests.
    pub fn open_at(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> DbResult<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    name        TEXT NOT NULL,
                    age         INTEGER NOT NULL,
                    condition   TEXT NOT NULL DEFAULT 'general',
                    wake_time   TEXT NOT NULL,
                    sleep_time  TEXT NOT NULL,
                    language    TEXT NOT NULL DEFAULT 'en',
                    caregiver   TEXT,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS medicines (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id        INTEGER NOT NULL REFERENCES users(id),
                    name           TEXT NOT NULL,
                    dosage         TEXT NOT NULL DEFAULT '1 tablet',
                    times          TEXT NOT NULL,
                    remaining_days INTEGER NOT NULL,
                    priority       TEXT NOT NULL DEFAULT 'HIGH',
                    origin         TEXT NOT NULL DEFAULT 'manual',
                    active         INTEGER NOT NULL DEFAULT 1,
                    created_at     TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS reminders (
                    id           TEXT PRIMARY KEY,
                    user_id      INTEGER NOT NULL REFERENCES users(id),
                    slot         TEXT NOT NULL,
                    kind         TEXT NOT NULL,
                    title        TEXT NOT NULL,
                    body         TEXT NOT NULL DEFAULT '',
                    message      TEXT NOT NULL,
                    date         TEXT NOT NULL,
                    scheduled    TEXT NOT NULL,
                    priority     TEXT NOT NULL,
                    state        TEXT NOT NULL DEFAULT 'pending',
                    snooze_count INTEGER NOT NULL DEFAULT 0,
                    medicine_id  INTEGER
                );

                CREATE TABLE IF NOT EXISTS action_events (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id     INTEGER NOT NULL REFERENCES users(id),
                    reminder_id TEXT NOT NULL,
                    slot        TEXT NOT NULL,
                    kind        TEXT NOT NULL,
                    action      TEXT NOT NULL,
                    date        TEXT NOT NULL,
                    at          TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS hydration_logs (
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    date    TEXT NOT NULL,
                    glasses INTEGER NOT NULL DEFAULT 0,
                    UNIQUE(user_id, date)
                );

                CREATE TABLE IF NOT EXISTS daily_scores (
                    user_id   INTEGER NOT NULL REFERENCES users(id),
                    date      TEXT NOT NULL,
                    score     REAL NOT NULL,
                    grade     TEXT NOT NULL,
                    breakdown TEXT NOT NULL,
                    UNIQUE(user_id, date)
                );

                CREATE TABLE IF NOT EXISTS slot_states (
                    user_id         INTEGER NOT NULL REFERENCES users(id),
                    slot            TEXT NOT NULL,
                    canonical_time  TEXT NOT NULL,
                    habit_formed    INTEGER NOT NULL DEFAULT 0,
                    window_reset_at TEXT,
                    UNIQUE(user_id, slot)
                );

                CREATE TABLE IF NOT EXISTS suggestions (
                    id             TEXT PRIMARY KEY,
                    user_id        INTEGER NOT NULL REFERENCES users(id),
                    slot           TEXT NOT NULL,
                    canonical_time TEXT NOT NULL,
                    suggested_time TEXT NOT NULL,
                    reason         TEXT NOT NULL,
                    state          TEXT NOT NULL DEFAULT 'pending',
                    created_at     TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS caregiver_alerts (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id   INTEGER NOT NULL REFERENCES users(id),
                    trigger   TEXT NOT NULL,
                    intensity TEXT NOT NULL DEFAULT 'normal',
                    message   TEXT NOT NULL,
                    date      TEXT NOT NULL,
                    sent_at   TEXT NOT NULL,
                    resolved  INTEGER NOT NULL DEFAULT 0,
                    UNIQUE(user_id, trigger, date)
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_reminders_user_date ON reminders(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_events_user_date ON action_events(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_scores_user_date ON daily_scores(user_id, date);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // ─── users ───────────────────────────────────────────────────────────

    pub fn create_user(&self, draft: &UserDraft) -> DbResult<UserProfile> {
        let condition = draft
            .condition
            .as_deref()
            .map(Condition::parse)
            .unwrap_or(Condition::General);
        let wake = draft.wake_time.unwrap_or_else(default_wake_time);
        let sleep = draft.sleep_time.unwrap_or_else(default_sleep_time);
        let language = draft
            .language
            .as_deref()
            .map(Language::from_tag)
            .unwrap_or_default();
        let caregiver = draft
            .caregiver
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let created_at = Utc::now();

        self.conn.execute(
            "INSERT INTO users (name, age, condition, wake_time, sleep_time, language, caregiver, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                draft.name.trim(),
                draft.age,
                condition.as_str(),
                wake.format(TIME_FMT).to_string(),
                sleep.format(TIME_FMT).to_string(),
                language.as_tag(),
                caregiver,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(UserProfile {
            id: self.conn.last_insert_rowid(),
            name: draft.name.trim().to_string(),
            age: draft.age,
            condition,
            wake_time: wake,
            sleep_time: sleep,
            language,
            caregiver: caregiver.map(String::from),
            created_at,
        })
    }

    pub fn get_user(&self, id: i64) -> DbResult<Option<UserProfile>> {
        self.conn
            .query_row(
                "SELECT id, name, age, condition, wake_time, sleep_time, language, caregiver, created_at
                 FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_users(&self) -> DbResult<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, age, condition, wake_time, sleep_time, language, caregiver, created_at
             FROM users ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Apply a partial update. Returns the updated profile, or `None` when
    /// the user does not exist.
    pub fn update_user(&self, id: i64, patch: &UserPatch) -> DbResult<Option<UserProfile>> {
        let Some(mut user) = self.get_user(id)? else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(age) = patch.age {
            user.age = age;
        }
        if let Some(condition) = &patch.condition {
            user.condition = Condition::parse(condition);
        }
        if let Some(wake) = patch.wake_time {
            user.wake_time = wake;
        }
        if let Some(sleep) = patch.sleep_time {
            user.sleep_time = sleep;
        }
        if let Some(language) = &patch.language {
            user.language = Language::from_tag(language);
        }
        if let Some(caregiver) = &patch.caregiver {
            let trimmed = caregiver.trim();
            user.caregiver = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        self.conn.execute(
            "UPDATE users SET name = ?1, age = ?2, condition = ?3, wake_time = ?4,
             sleep_time = ?5, language = ?6, caregiver = ?7 WHERE id = ?8",
            params![
                user.name,
                user.age,
                user.condition.as_str(),
                user.wake_time.format(TIME_FMT).to_string(),
                user.sleep_time.format(TIME_FMT).to_string(),
                user.language.as_tag(),
                user.caregiver,
                id,
            ],
        )?;
        Ok(Some(user))
    }

    // ─── medicines ───────────────────────────────────────────────────────

    pub fn add_medicine(&self, user_id: i64, draft: &MedicineDraft) -> DbResult<Medicine> {
        let created_at = Utc::now();
        let times_json = times_to_json(&draft.times);
        self.conn.execute(
            "INSERT INTO medicines (user_id, name, dosage, times, remaining_days, priority, origin, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
            params![
                user_id,
                draft.name.trim(),
                draft.dosage,
                times_json,
                draft.duration_days,
                draft.priority.as_str(),
                origin_str(draft.origin),
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(Medicine {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: draft.name.trim().to_string(),
            dosage: draft.dosage.clone(),
            times: draft.times.clone(),
            remaining_days: draft.duration_days,
            priority: draft.priority,
            origin: draft.origin,
            active: true,
            created_at,
        })
    }

    pub fn get_medicine(&self, id: i64) -> DbResult<Option<Medicine>> {
        self.conn
            .query_row(
                "SELECT id, user_id, name, dosage, times, remaining_days, priority, origin, active, created_at
                 FROM medicines WHERE id = ?1",
                params![id],
                row_to_medicine,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_medicines(&self, user_id: i64, active_only: bool) -> DbResult<Vec<Medicine>> {
        let sql = if active_only {
            "SELECT id, user_id, name, dosage, times, remaining_days, priority, origin, active, created_at
             FROM medicines WHERE user_id = ?1 AND active = 1 ORDER BY id"
        } else {
            "SELECT id, user_id, name, dosage, times, remaining_days, priority, origin, active, created_at
             FROM medicines WHERE user_id = ?1 ORDER BY id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![user_id], row_to_medicine)?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Soft-delete: past reminders keep their weak reference.
    pub fn deactivate_medicine(&self, id: i64) -> DbResult<bool> {
        let n = self
            .conn
            .execute("UPDATE medicines SET active = 0 WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Daily rollover: one day consumed for every active course; courses
    /// reaching zero are deactivated.
    pub fn decrement_remaining_days(&self, user_id: i64) -> DbResult<()> {
        self.conn.execute(
            "UPDATE medicines SET remaining_days = remaining_days - 1
             WHERE user_id = ?1 AND active = 1 AND remaining_days > 0",
            params![user_id],
        )?;
        self.conn.execute(
            "UPDATE medicines SET active = 0 WHERE user_id = ?1 AND remaining_days = 0",
            params![user_id],
        )?;
        Ok(())
    }

    // ─── reminders ───────────────────────────────────────────────────────

    pub fn insert_reminder(&self, r: &Reminder) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO reminders (id, user_id, slot, kind, title, body, message, date, scheduled, priority, state, snooze_count, medicine_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                r.id.to_string(),
                r.user_id,
                r.slot.as_str(),
                r.kind.as_str(),
                r.title,
                r.body,
                message_to_json(&r.message),
                r.date.format(DATE_FMT).to_string(),
                r.scheduled.format(TIME_FMT).to_string(),
                r.priority.as_str(),
                r.state.as_str(),
                r.snooze_count,
                r.medicine_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_reminder(&self, id: Uuid) -> DbResult<Option<Reminder>> {
        self.conn
            .query_row(
                "SELECT id, user_id, slot, kind, title, body, message, date, scheduled, priority, state, snooze_count, medicine_id
                 FROM reminders WHERE id = ?1",
                params![id.to_string()],
                row_to_reminder,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn reminders_for(&self, user_id: i64, date: NaiveDate) -> DbResult<Vec<Reminder>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, slot, kind, title, body, message, date, scheduled, priority, state, snooze_count, medicine_id
             FROM reminders WHERE user_id = ?1 AND date = ?2",
        )?;
        let rows = stmt.query_map(
            params![user_id, date.format(DATE_FMT).to_string()],
            row_to_reminder,
        )?;
        // Priority and kind are TEXT columns; rank them in Rust rather than
        // lexicographically in SQL.
        let mut reminders: Vec<Reminder> = rows.collect::<Result<_, _>>()?;
        generator::sort_schedule(&mut reminders);
        Ok(reminders)
    }

    /// Persist a state-machine step: state, snooze count, and the possibly
    /// snooze-shifted time.
    pub fn update_reminder(&self, r: &Reminder) -> DbResult<()> {
        self.conn.execute(
            "UPDATE reminders SET state = ?1, snooze_count = ?2, scheduled = ?3 WHERE id = ?4",
            params![
                r.state.as_str(),
                r.snooze_count,
                r.scheduled.format(TIME_FMT).to_string(),
                r.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Targeted regeneration delete: untouched future reminders go;
    /// actioned, snoozed, or already-surfaced ones stay.
    pub fn delete_replaceable(
        &self,
        user_id: i64,
        date: NaiveDate,
        now: NaiveTime,
    ) -> DbResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM reminders
             WHERE user_id = ?1 AND date = ?2 AND state = 'pending'
               AND snooze_count = 0 AND scheduled > ?3",
            params![
                user_id,
                date.format(DATE_FMT).to_string(),
                now.format(TIME_FMT).to_string(),
            ],
        )?;
        Ok(n)
    }

    /// Slots already holding a reminder row for the date. Regeneration
    /// skips these so surviving rows are not duplicated.
    pub fn occupied_slots(&self, user_id: i64, date: NaiveDate) -> DbResult<HashSet<SlotKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slot FROM reminders WHERE user_id = ?1 AND date = ?2")?;
        let rows = stmt.query_map(
            params![user_id, date.format(DATE_FMT).to_string()],
            |row| row.get::<_, String>(0),
        )?;
        let mut slots = HashSet::new();
        for row in rows {
            slots.insert(SlotKey::from_raw(row?));
        }
        Ok(slots)
    }

    // ─── action events ───────────────────────────────────────────────────

    pub fn log_action(&self, event: &ActionEvent) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO action_events (user_id, reminder_id, slot, kind, action, date, at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.user_id,
                event.reminder_id.to_string(),
                event.slot.as_str(),
                event.kind.as_str(),
                event.action.as_str(),
                event.date.format(DATE_FMT).to_string(),
                event.at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn events_for_date(&self, user_id: i64, date: NaiveDate) -> DbResult<Vec<ActionEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, reminder_id, slot, kind, action, date, at
             FROM action_events WHERE user_id = ?1 AND date = ?2 ORDER BY at",
        )?;
        let rows = stmt.query_map(
            params![user_id, date.format(DATE_FMT).to_string()],
            row_to_event,
        )?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    pub fn events_since(&self, user_id: i64, from: NaiveDate) -> DbResult<Vec<ActionEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, reminder_id, slot, kind, action, date, at
             FROM action_events WHERE user_id = ?1 AND date >= ?2 ORDER BY at",
        )?;
        let rows = stmt.query_map(
            params![user_id, from.format(DATE_FMT).to_string()],
            row_to_event,
        )?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    // ─── hydration ───────────────────────────────────────────────────────

    pub fn hydration_for(&self, user_id: i64, date: NaiveDate) -> DbResult<u32> {
        self.conn
            .query_row(
                "SELECT glasses FROM hydration_logs WHERE user_id = ?1 AND date = ?2",
                params![user_id, date.format(DATE_FMT).to_string()],
                |row| row.get(0),
            )
            .optional()
            .map(|g| g.unwrap_or(0))
            .map_err(Into::into)
    }

    pub fn set_hydration(&self, user_id: i64, date: NaiveDate, glasses: u32) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO hydration_logs (user_id, date, glasses) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, date) DO UPDATE SET glasses = excluded.glasses",
            params![user_id, date.format(DATE_FMT).to_string(), glasses],
        )?;
        Ok(())
    }

    // ─── daily scores ────────────────────────────────────────────────────

    pub fn save_score(&self, record: &DailyScoreRecord) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO daily_scores (user_id, date, score, grade, breakdown)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, date) DO UPDATE SET
               score = excluded.score, grade = excluded.grade, breakdown = excluded.breakdown",
            params![
                record.user_id,
                record.date.format(DATE_FMT).to_string(),
                record.score,
                grade_str(record.grade),
                breakdown_to_json(&record.breakdown),
            ],
        )?;
        Ok(())
    }

    /// Most recent scores first, capped at `limit`.
    pub fn score_history(&self, user_id: i64, limit: u32) -> DbResult<Vec<DailyScoreRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, date, score, grade, breakdown
             FROM daily_scores WHERE user_id = ?1 ORDER BY date DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], row_to_score)?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    // ─── slot states ─────────────────────────────────────────────────────

    pub fn upsert_slot_state(&self, state: &SlotState) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO slot_states (user_id, slot, canonical_time, habit_formed, window_reset_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, slot) DO UPDATE SET
               canonical_time = excluded.canonical_time,
               habit_formed = excluded.habit_formed,
               window_reset_at = excluded.window_reset_at",
            params![
                state.user_id,
                state.slot.as_str(),
                state.canonical_time.format(TIME_FMT).to_string(),
                state.habit_formed,
                state.window_reset_at.map(|at| at.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn slot_states_for(&self, user_id: i64) -> DbResult<Vec<SlotState>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, slot, canonical_time, habit_formed, window_reset_at
             FROM slot_states WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_slot_state)?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    pub fn set_habit_formed(&self, user_id: i64, slot: &SlotKey, formed: bool) -> DbResult<()> {
        self.conn.execute(
            "UPDATE slot_states SET habit_formed = ?1 WHERE user_id = ?2 AND slot = ?3",
            params![formed, user_id, slot.as_str()],
        )?;
        Ok(())
    }

    // ─── suggestions ─────────────────────────────────────────────────────

    pub fn insert_suggestion(&self, s: &AdaptiveSuggestion) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO suggestions (id, user_id, slot, canonical_time, suggested_time, reason, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                s.id.to_string(),
                s.user_id,
                s.slot.as_str(),
                s.current_time.format(TIME_FMT).to_string(),
                s.suggested_time.format(TIME_FMT).to_string(),
                s.reason,
                s.state.as_str(),
                s.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_suggestion(&self, id: Uuid) -> DbResult<Option<AdaptiveSuggestion>> {
        self.conn
            .query_row(
                "SELECT id, user_id, slot, canonical_time, suggested_time, reason, state, created_at
                 FROM suggestions WHERE id = ?1",
                params![id.to_string()],
                row_to_suggestion,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn pending_suggestions(&self, user_id: i64) -> DbResult<Vec<AdaptiveSuggestion>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, slot, canonical_time, suggested_time, reason, state, created_at
             FROM suggestions WHERE user_id = ?1 AND state = 'pending' ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_suggestion)?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    pub fn set_suggestion_state(&self, id: Uuid, state: SuggestionState) -> DbResult<()> {
        self.conn.execute(
            "UPDATE suggestions SET state = ?1 WHERE id = ?2",
            params![state.as_str(), id.to_string()],
        )?;
        Ok(())
    }

    // ─── caregiver alerts ────────────────────────────────────────────────

    /// Insert unless an alert with the same (user, trigger, date) already
    /// exists. Returns whether a row was written.
    pub fn insert_alert(
        &self,
        user_id: i64,
        draft: &AlertDraft,
        date: NaiveDate,
    ) -> DbResult<bool> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO caregiver_alerts (user_id, trigger, intensity, message, date, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                draft.trigger.as_str(),
                draft.intensity.as_str(),
                draft.message,
                date.format(DATE_FMT).to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(n > 0)
    }

    pub fn list_alerts(&self, user_id: i64, limit: u32) -> DbResult<Vec<CaregiverAlert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, trigger, intensity, message, date, sent_at, resolved
             FROM caregiver_alerts WHERE user_id = ?1 ORDER BY sent_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], row_to_alert)?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    pub fn resolve_alert(&self, id: i64) -> DbResult<bool> {
        let n = self.conn.execute(
            "UPDATE caregiver_alerts SET resolved = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(n > 0)
    }

    // ─── kv ──────────────────────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

// ─── row mapping ─────────────────────────────────────────────────────────

fn text_err(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_time(idx: usize, s: &str) -> Result<NaiveTime, rusqlite::Error> {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| text_err(idx, e))
}

fn parse_date(idx: usize, s: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| text_err(idx, e))
}

fn parse_datetime(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| text_err(idx, e))
}

fn parse_uuid(idx: usize, s: &str) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(s).map_err(|e| text_err(idx, e))
}

fn times_to_json(times: &[NaiveTime]) -> String {
    let strings: Vec<String> = times.iter().map(|t| t.format(TIME_FMT).to_string()).collect();
    serde_json::to_string(&strings).unwrap_or_else(|_| "[]".into())
}

fn times_from_json(idx: usize, json: &str) -> Result<Vec<NaiveTime>, rusqlite::Error> {
    let strings: Vec<String> = serde_json::from_str(json).map_err(|e| text_err(idx, e))?;
    strings.iter().map(|s| parse_time(idx, s)).collect()
}

fn message_to_json(message: &MessageSpec) -> String {
    serde_json::to_string(message).unwrap_or_else(|_| "{}".into())
}

fn breakdown_to_json(breakdown: &ScoreBreakdown) -> String {
    serde_json::to_string(breakdown).unwrap_or_else(|_| "{}".into())
}

fn origin_str(origin: MedicineOrigin) -> &'static str {
    match origin {
        MedicineOrigin::Manual => "manual",
        MedicineOrigin::Ocr => "ocr",
    }
}

fn grade_str(grade: Grade) -> &'static str {
    match grade {
        Grade::Excellent => "excellent",
        Grade::Good => "good",
        Grade::NeedsImprovement => "needs_improvement",
        Grade::RiskAlert => "risk_alert",
    }
}

fn grade_from_str(s: &str) -> Grade {
    match s {
        "excellent" => Grade::Excellent,
        "good" => Grade::Good,
        "needs_improvement" => Grade::NeedsImprovement,
        _ => Grade::RiskAlert,
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<UserProfile, rusqlite::Error> {
    Ok(UserProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        condition: Condition::from_str_or_general(&row.get::<_, String>(3)?),
        wake_time: parse_time(4, &row.get::<_, String>(4)?)?,
        sleep_time: parse_time(5, &row.get::<_, String>(5)?)?,
        language: Language::from_tag(&row.get::<_, String>(6)?),
        caregiver: row.get(7)?,
        created_at: parse_datetime(8, &row.get::<_, String>(8)?)?,
    })
}

fn row_to_medicine(row: &rusqlite::Row<'_>) -> Result<Medicine, rusqlite::Error> {
    let origin = match row.get::<_, String>(7)?.as_str() {
        "ocr" => MedicineOrigin::Ocr,
        _ => MedicineOrigin::Manual,
    };
    Ok(Medicine {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        times: times_from_json(4, &row.get::<_, String>(4)?)?,
        remaining_days: row.get(5)?,
        priority: Priority::from_str_or_medium(&row.get::<_, String>(6)?),
        origin,
        active: row.get(8)?,
        created_at: parse_datetime(9, &row.get::<_, String>(9)?)?,
    })
}

fn row_to_reminder(row: &rusqlite::Row<'_>) -> Result<Reminder, rusqlite::Error> {
    let message: MessageSpec =
        serde_json::from_str(&row.get::<_, String>(6)?).map_err(|e| text_err(6, e))?;
    Ok(Reminder {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        user_id: row.get(1)?,
        slot: SlotKey::from_raw(row.get::<_, String>(2)?),
        kind: ReminderKind::from_str_or_tip(&row.get::<_, String>(3)?),
        title: row.get(4)?,
        body: row.get(5)?,
        message,
        date: parse_date(7, &row.get::<_, String>(7)?)?,
        scheduled: parse_time(8, &row.get::<_, String>(8)?)?,
        priority: Priority::from_str_or_medium(&row.get::<_, String>(9)?),
        state: ReminderState::from_str_or_pending(&row.get::<_, String>(10)?),
        snooze_count: row.get(11)?,
        medicine_id: row.get(12)?,
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<ActionEvent, rusqlite::Error> {
    Ok(ActionEvent {
        user_id: row.get(0)?,
        reminder_id: parse_uuid(1, &row.get::<_, String>(1)?)?,
        slot: SlotKey::from_raw(row.get::<_, String>(2)?),
        kind: ReminderKind::from_str_or_tip(&row.get::<_, String>(3)?),
        action: ReminderAction::from_str_or_skipped(&row.get::<_, String>(4)?),
        date: parse_date(5, &row.get::<_, String>(5)?)?,
        at: parse_datetime(6, &row.get::<_, String>(6)?)?,
    })
}

fn row_to_score(row: &rusqlite::Row<'_>) -> Result<DailyScoreRecord, rusqlite::Error> {
    let breakdown: ScoreBreakdown =
        serde_json::from_str(&row.get::<_, String>(4)?).map_err(|e| text_err(4, e))?;
    Ok(DailyScoreRecord {
        user_id: row.get(0)?,
        date: parse_date(1, &row.get::<_, String>(1)?)?,
        score: row.get(2)?,
        grade: grade_from_str(&row.get::<_, String>(3)?),
        breakdown,
    })
}

fn row_to_slot_state(row: &rusqlite::Row<'_>) -> Result<SlotState, rusqlite::Error> {
    let reset: Option<String> = row.get(4)?;
    let window_reset_at = match reset {
        Some(s) => Some(parse_datetime(4, &s)?),
        None => None,
    };
    Ok(SlotState {
        user_id: row.get(0)?,
        slot: SlotKey::from_raw(row.get::<_, String>(1)?),
        canonical_time: parse_time(2, &row.get::<_, String>(2)?)?,
        habit_formed: row.get(3)?,
        window_reset_at,
    })
}

fn row_to_suggestion(row: &rusqlite::Row<'_>) -> Result<AdaptiveSuggestion, rusqlite::Error> {
    Ok(AdaptiveSuggestion {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        user_id: row.get(1)?,
        slot: SlotKey::from_raw(row.get::<_, String>(2)?),
        current_time: parse_time(3, &row.get::<_, String>(3)?)?,
        suggested_time: parse_time(4, &row.get::<_, String>(4)?)?,
        reason: row.get(5)?,
        state: SuggestionState::from_str_or_pending(&row.get::<_, String>(6)?),
        created_at: parse_datetime(7, &row.get::<_, String>(7)?)?,
    })
}

fn row_to_alert(row: &rusqlite::Row<'_>) -> Result<CaregiverAlert, rusqlite::Error> {
    let trigger = AlertTrigger::from_str_opt(&row.get::<_, String>(2)?)
        .unwrap_or(AlertTrigger::MedicineSkips);
    Ok(CaregiverAlert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        trigger,
        intensity: AlertIntensity::from_str_or_normal(&row.get::<_, String>(3)?),
        message: row.get(4)?,
        date: parse_date(5, &row.get::<_, String>(5)?)?,
        sent_at: parse_datetime(6, &row.get::<_, String>(6)?)?,
        resolved: row.get(7)?,
    })
}
