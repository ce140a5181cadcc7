//! End-to-end engine tests against an on-disk database.

use chrono::{Duration, NaiveTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use careclock_core::medicine::MedicineDraft;
use careclock_core::profile::UserDraft;
use careclock_core::reminder::ReminderKind;
use careclock_core::score::Grade;
use careclock_core::service::HealthService;
use careclock_core::storage::HealthDb;
use careclock_core::UserAction;

fn service(dir: &TempDir) -> HealthService {
    let db = HealthDb::open_at(&dir.path().join("careclock.db")).unwrap();
    HealthService::new(db)
}

fn draft(name: &str, caregiver: Option<&str>) -> UserDraft {
    UserDraft {
        name: name.into(),
        age: 68,
        condition: Some("Type 2 Diabetes".into()),
        wake_time: NaiveTime::from_hms_opt(7, 0, 0),
        sleep_time: NaiveTime::from_hms_opt(22, 0, 0),
        language: Some("en".into()),
        caregiver: caregiver.map(String::from),
    }
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn full_day_flow_score_and_escalation() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc
        .create_user(&draft("Asha", Some("+911234567890")))
        .await
        .unwrap();

    let mut med = MedicineDraft::new("Metformin");
    med.dosage = "500 mg".into();
    med.times = vec![t(8, 0), t(14, 0), t(20, 0)];
    med.duration_days = 30;
    svc.add_medicine(user.id, &med).await.unwrap();

    // Build tomorrow's schedule from midnight so every slot materializes.
    let date = Utc::now().date_naive() + Duration::days(1);
    let reminders = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();

    let medicine_ids: Vec<Uuid> = reminders
        .iter()
        .filter(|r| r.kind == ReminderKind::Medicine)
        .map(|r| r.id)
        .collect();
    assert_eq!(medicine_ids.len(), 3);
    let water_count = reminders
        .iter()
        .filter(|r| r.kind == ReminderKind::Water)
        .count();
    assert_eq!(water_count, 8);

    // Skip all three medicine doses. The very first skip tanks the score
    // (nothing completed, no water logged), so the low-score alert goes out
    // immediately; the third skip adds the medicine-threshold alert.
    let at = date.and_hms_opt(21, 0, 0).unwrap().and_utc();
    for (i, id) in medicine_ids.iter().enumerate() {
        let outcome = svc.reminder_action(*id, UserAction::Skipped, at).await.unwrap();
        assert_eq!(outcome.caregiver_alerted, i != 1, "skip #{}", i + 1);
    }
    let alerts = svc.caregiver_alerts(user.id).unwrap();
    assert_eq!(alerts.len(), 2);
    let triggers: Vec<&str> = alerts.iter().map(|a| a.trigger.as_str()).collect();
    assert!(triggers.contains(&"low_score"));
    assert!(triggers.contains(&"medicine_skips"));
    assert!(alerts.iter().all(|a| a.message.contains("Asha")));

    // Re-running escalation for the same day must not duplicate alerts.
    let extra = reminders
        .iter()
        .find(|r| r.kind == ReminderKind::Water)
        .unwrap();
    svc.reminder_action(extra.id, UserAction::Skipped, at).await.unwrap();
    assert_eq!(svc.caregiver_alerts(user.id).unwrap().len(), 2);

    // Medicine skips drag the score down through both weighted components.
    svc.set_hydration(user.id, date, 4).unwrap();
    let score = svc.health_score(user.id, date).unwrap();
    assert_eq!(score.breakdown.medicine_pct, 0.0);
    assert!(score.score < 40.0);
    assert_eq!(score.grade, Grade::RiskAlert);
}

#[tokio::test]
async fn regeneration_preserves_actioned_reminders() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc.create_user(&draft("Ravi", None)).await.unwrap();

    let date = Utc::now().date_naive() + Duration::days(1);
    let reminders = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
    let breakfast = reminders
        .iter()
        .find(|r| r.slot.as_str() == "meal:breakfast")
        .unwrap();
    let at = date.and_hms_opt(8, 30, 0).unwrap().and_utc();
    svc.reminder_action(breakfast.id, UserAction::Completed, at)
        .await
        .unwrap();

    let regenerated = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
    assert_eq!(regenerated.len(), reminders.len());
    let survivor = regenerated
        .iter()
        .find(|r| r.slot.as_str() == "meal:breakfast")
        .unwrap();
    // Same row, same identity, terminal state intact.
    assert_eq!(survivor.id, breakfast.id);
    assert_eq!(survivor.state, careclock_core::ReminderState::Completed);
}

#[tokio::test]
async fn weighted_score_matches_the_formula() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc.create_user(&draft("Meena", None)).await.unwrap();

    let mut med = MedicineDraft::new("Aspirin");
    med.times = vec![t(9, 0)];
    svc.add_medicine(user.id, &med).await.unwrap();

    let date = Utc::now().date_naive() + Duration::days(1);
    let reminders = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
    let at = date.and_hms_opt(12, 0, 0).unwrap().and_utc();

    // Complete the medicine and one water; nothing else is resolved.
    let medicine = reminders
        .iter()
        .find(|r| r.kind == ReminderKind::Medicine)
        .unwrap();
    let water = reminders
        .iter()
        .find(|r| r.kind == ReminderKind::Water)
        .unwrap();
    svc.reminder_action(medicine.id, UserAction::Completed, at)
        .await
        .unwrap();
    svc.reminder_action(water.id, UserAction::Completed, at)
        .await
        .unwrap();
    svc.set_hydration(user.id, date, 4).unwrap();

    // compliance 100, hydration 50 (4 of 8), medicine 100 -> 90.
    let score = svc.health_score(user.id, date).unwrap();
    assert!((score.score - 90.0).abs() < 1e-9);
    assert_eq!(score.grade, Grade::Excellent);

    // The record is persisted and visible in history.
    let history = svc.score_history(user.id, 7).unwrap();
    assert!(history.iter().any(|r| r.date == date && (r.score - 90.0).abs() < 1e-9));
}

#[tokio::test]
async fn snooze_walks_the_time_forward_until_the_cap() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc.create_user(&draft("Sunil", None)).await.unwrap();

    let date = Utc::now().date_naive() + Duration::days(1);
    let reminders = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
    let lunch = reminders
        .iter()
        .find(|r| r.slot.as_str() == "meal:lunch")
        .unwrap();
    let original = lunch.scheduled;
    let at = date.and_hms_opt(13, 30, 0).unwrap().and_utc();

    for i in 1..=3u32 {
        let outcome = svc
            .reminder_action(lunch.id, UserAction::Snoozed, at)
            .await
            .unwrap();
        assert_eq!(outcome.action, "snoozed");
        assert_eq!(
            outcome.reminder.scheduled,
            original + Duration::minutes(10 * i as i64)
        );
    }
    // Fourth snooze attempt lands as an auto-expired skip.
    let outcome = svc
        .reminder_action(lunch.id, UserAction::Snoozed, at)
        .await
        .unwrap();
    assert_eq!(outcome.action, "auto_expired");
    assert_eq!(outcome.reminder.state, careclock_core::ReminderState::Skipped);
}

#[tokio::test]
async fn adaptive_suggestion_lifecycle_applies_to_schedule() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc.create_user(&draft("Lata", None)).await.unwrap();

    let mut med = MedicineDraft::new("Metformin");
    med.times = vec![t(8, 0)];
    med.duration_days = 30;
    svc.add_medicine(user.id, &med).await.unwrap();

    // Skip the morning dose on three consecutive days.
    let today = Utc::now().date_naive() + Duration::days(4);
    for offset in 1..=3i64 {
        let date = today - Duration::days(offset);
        let reminders = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
        let dose = reminders
            .iter()
            .find(|r| r.kind == ReminderKind::Medicine)
            .unwrap();
        let at = date.and_hms_opt(10, 0, 0).unwrap().and_utc();
        svc.reminder_action(dose.id, UserAction::Skipped, at).await.unwrap();
    }

    svc.generate_schedule(user.id, today, t(0, 0)).await.unwrap();
    let suggestions = svc.run_adaptive(user.id, today).await.unwrap();
    assert_eq!(suggestions.len(), 1);
    let suggestion = &suggestions[0];
    assert_eq!(suggestion.current_time, t(8, 0));
    assert_eq!(suggestion.suggested_time, t(8, 30));

    // A second analyzer run must not stack a duplicate.
    let again = svc.run_adaptive(user.id, today).await.unwrap();
    assert_eq!(again.len(), 1);

    // Applying shifts today's untouched instance and future generations.
    let apply_at = today.and_hms_opt(0, 30, 0).unwrap().and_utc();
    svc.apply_suggestion(suggestion.id, apply_at).await.unwrap();
    assert!(svc.list_suggestions(user.id).unwrap().is_empty());

    let tomorrow = today + Duration::days(1);
    let next = svc.generate_schedule(user.id, tomorrow, t(0, 0)).await.unwrap();
    let dose = next
        .iter()
        .find(|r| r.kind == ReminderKind::Medicine)
        .unwrap();
    assert_eq!(dose.scheduled, t(8, 30));
}

#[tokio::test]
async fn dismissal_is_terminal() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc.create_user(&draft("Lata", None)).await.unwrap();

    let mut med = MedicineDraft::new("Aspirin");
    med.times = vec![t(9, 0)];
    svc.add_medicine(user.id, &med).await.unwrap();

    let today = Utc::now().date_naive() + Duration::days(4);
    for offset in 1..=3i64 {
        let date = today - Duration::days(offset);
        let reminders = svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
        let dose = reminders
            .iter()
            .find(|r| r.kind == ReminderKind::Medicine)
            .unwrap();
        let at = date.and_hms_opt(10, 0, 0).unwrap().and_utc();
        svc.reminder_action(dose.id, UserAction::Skipped, at).await.unwrap();
    }
    svc.generate_schedule(user.id, today, t(0, 0)).await.unwrap();
    let suggestions = svc.run_adaptive(user.id, today).await.unwrap();
    let suggestion = &suggestions[0];

    svc.dismiss_suggestion(suggestion.id).await.unwrap();
    assert!(svc.dismiss_suggestion(suggestion.id).await.is_err());
    assert!(svc
        .apply_suggestion(suggestion.id, Utc::now())
        .await
        .is_err());
}

#[tokio::test]
async fn dashboard_aggregates_everything() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let user = svc.create_user(&draft("Asha", Some("care@example.com"))).await.unwrap();

    let date = Utc::now().date_naive() + Duration::days(1);
    svc.generate_schedule(user.id, date, t(0, 0)).await.unwrap();
    svc.set_hydration(user.id, date, 2).unwrap();

    let dashboard = svc.dashboard(user.id, date, t(6, 0)).unwrap();
    assert_eq!(dashboard.user.id, user.id);
    assert!(!dashboard.reminders.is_empty());
    assert_eq!(dashboard.hydration.glasses, 2);
    assert_eq!(dashboard.hydration.percentage, 25.0);
    assert!(!dashboard.diet_tips.is_empty());
    let next = dashboard.next_due.unwrap();
    assert_eq!(next.reminder.kind, ReminderKind::Wake);
}
