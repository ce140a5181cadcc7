use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

use careclock_core::reminder::UserAction;
use careclock_core::service::HealthService;

use super::{parse_date, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ReminderCmd {
    /// List a day's reminders with computed due-ness
    List {
        user_id: i64,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Regenerate the schedule for a day; actioned reminders survive
    Generate {
        user_id: i64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark a reminder done
    Complete { id: Uuid },
    /// Push a reminder 10 minutes (3 snoozes max)
    Snooze { id: Uuid },
    /// Skip a reminder
    Skip { id: Uuid },
}

pub async fn run(action: ReminderCmd) -> CmdResult {
    let service = HealthService::open()?;
    let now = Utc::now();

    match action {
        ReminderCmd::List { user_id, date } => {
            let date = parse_date(date.as_deref())?;
            print_json(&service.list_reminders(user_id, date, now.time())?)
        }
        ReminderCmd::Generate { user_id, date } => {
            let date = parse_date(date.as_deref())?;
            print_json(&service.generate_schedule(user_id, date, now.time()).await?)
        }
        ReminderCmd::Complete { id } => {
            print_json(&service.reminder_action(id, UserAction::Completed, now).await?)
        }
        ReminderCmd::Snooze { id } => {
            print_json(&service.reminder_action(id, UserAction::Snoozed, now).await?)
        }
        ReminderCmd::Skip { id } => {
            print_json(&service.reminder_action(id, UserAction::Skipped, now).await?)
        }
    }
}
