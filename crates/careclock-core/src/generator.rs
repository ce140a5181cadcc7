//! Daily schedule generation.
//!
//! `generate` is a pure function of (profile, medicines, slot states, date).
//! Idempotence across re-runs on the same day is enforced at the store level
//! (targeted replace, see [`crate::storage`]); the generator itself has no
//! side effects.

use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::HashMap;
use uuid::Uuid;

use crate::medicine::{Medicine, Priority};
use crate::message::{MessageKind, MessageSpec};
use crate::profile::{default_sleep_time, default_wake_time, UserProfile};
use crate::reminder::{Reminder, ReminderKind, ReminderState};
use crate::rules::{condition_rules, exercise_plan, water_target};
use crate::slot::{SlotKey, SlotState};

/// Generate the full ordered reminder sequence for one day.
///
/// Slots with persisted canonical times (applied suggestions) are emitted at
/// those times instead of the rule times. Never errors: degenerate profile
/// times fall back to 07:00 / 22:00.
pub fn generate(
    profile: &UserProfile,
    medicines: &[Medicine],
    slots: &[SlotState],
    date: NaiveDate,
) -> Vec<Reminder> {
    let (wake, sleep) = effective_day(profile.wake_time, profile.sleep_time);
    let span_min = (sleep - wake).num_minutes();
    let lang = profile.language;
    let rules = condition_rules(profile.condition);

    let mut out: Vec<Reminder> = Vec::new();
    let mut push = |slot: SlotKey,
                    kind: ReminderKind,
                    title: String,
                    scheduled: NaiveTime,
                    priority: Priority,
                    message: MessageSpec,
                    medicine_id: Option<i64>| {
        let body = message.fallback_text();
        out.push(Reminder {
            id: Uuid::new_v4(),
            user_id: profile.id,
            slot,
            kind,
            title,
            body,
            message,
            date,
            scheduled,
            priority,
            state: ReminderState::Pending,
            snooze_count: 0,
            medicine_id,
        });
    };

    // Wake and sleep anchors.
    push(
        SlotKey::singleton(ReminderKind::Wake),
        ReminderKind::Wake,
        "Good morning".into(),
        wake,
        Priority::High,
        MessageSpec::new(lang, MessageKind::Wake),
        None,
    );
    push(
        SlotKey::singleton(ReminderKind::Sleep),
        ReminderKind::Sleep,
        "Sleep reminder".into(),
        sleep,
        Priority::Medium,
        MessageSpec::new(lang, MessageKind::Sleep),
        None,
    );

    // One reminder per (medicine, time), priority inherited.
    for med in medicines.iter().filter(|m| m.active && m.remaining_days > 0) {
        for (i, time) in med.times.iter().enumerate() {
            push(
                SlotKey::medicine(med.id, i),
                ReminderKind::Medicine,
                format!("Medicine: {}", med.name),
                *time,
                med.priority,
                MessageSpec::new(lang, MessageKind::Medicine)
                    .with_medicine(&med.name, &med.dosage),
                Some(med.id),
            );
        }
    }

    // Water, spaced evenly across the waking span.
    let glasses = water_target(profile.condition) as i64;
    let step = span_min / (glasses + 1);
    for i in 0..glasses {
        push(
            SlotKey::water(i as usize),
            ReminderKind::Water,
            "Hydration check".into(),
            wake + Duration::minutes(step * (i + 1)),
            Priority::Low,
            MessageSpec::new(lang, MessageKind::Water),
            None,
        );
    }

    // Exactly one exercise reminder from the age x condition lookup.
    let plan = exercise_plan(profile.age_group(), profile.condition);
    let mut exercise_time = wake + Duration::minutes(plan.offset_from_wake_min);
    if exercise_time >= sleep {
        exercise_time = sleep - Duration::minutes(60);
    }
    push(
        SlotKey::singleton(ReminderKind::Exercise),
        ReminderKind::Exercise,
        "Exercise".into(),
        exercise_time,
        Priority::Medium,
        MessageSpec::new(lang, MessageKind::Exercise).with_activity(&plan.activity),
        None,
    );

    // Meals anchored to wake/sleep, dietary tips by condition.
    let diet = rules.diet;
    let meals: [(&str, NaiveTime, Priority, String); 3] = [
        (
            "breakfast",
            wake + Duration::minutes(60),
            Priority::High,
            format!("Breakfast - {}", diet.first().copied().unwrap_or("Healthy breakfast")),
        ),
        (
            "lunch",
            wake + Duration::minutes(390),
            Priority::Medium,
            format!("Lunch - {}", diet.get(1).copied().unwrap_or("Balanced lunch")),
        ),
        (
            "dinner",
            sleep - Duration::minutes(150),
            Priority::Medium,
            "Dinner - Light & healthy meal".to_string(),
        ),
    ];
    for (name, time, priority, meal_text) in meals {
        let mut title = name.to_string();
        if let Some(first) = title.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        push(
            SlotKey::meal(name),
            ReminderKind::Meal,
            title,
            time,
            priority,
            MessageSpec::new(lang, MessageKind::Meal).with_meal(&meal_text),
            None,
        );
    }

    // One generic health tip mid-day.
    push(
        SlotKey::singleton(ReminderKind::HealthTip),
        ReminderKind::HealthTip,
        "Health tip".into(),
        wake + Duration::minutes(span_min / 2),
        Priority::Low,
        MessageSpec::new(lang, MessageKind::HealthTip)
            .with_tip(rules.tips.first().copied().unwrap_or("Stay hydrated")),
        None,
    );

    // Canonical-time overrides from applied suggestions.
    let overrides: HashMap<&SlotKey, NaiveTime> = slots
        .iter()
        .map(|s| (&s.slot, s.canonical_time))
        .collect();
    for r in &mut out {
        if let Some(time) = overrides.get(&r.slot) {
            r.scheduled = *time;
        }
    }

    sort_schedule(&mut out);
    out
}

/// Final ordering: time asc, then priority HIGH > MEDIUM > LOW, then kind
/// precedence medicine > water > exercise > meal > sleep > wake > health_tip.
pub fn sort_schedule(reminders: &mut [Reminder]) {
    reminders.sort_by(|a, b| {
        a.scheduled
            .cmp(&b.scheduled)
            .then(a.priority.rank().cmp(&b.priority.rank()))
            .then(a.kind.precedence().cmp(&b.kind.precedence()))
    });
}

/// Wake/sleep with fallbacks applied. A non-positive span (sleep at or
/// before wake) falls back to the 07:00-22:00 defaults.
fn effective_day(wake: NaiveTime, sleep: NaiveTime) -> (NaiveTime, NaiveTime) {
    if sleep > wake {
        (wake, sleep)
    } else {
        (default_wake_time(), default_sleep_time())
    }
}
