use clap::Subcommand;

use careclock_core::profile::{UserDraft, UserPatch};
use careclock_core::service::HealthService;

use super::{parse_time, print_json, CmdResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user and generate their first schedule
    Create {
        name: String,
        #[arg(long, default_value_t = 25)]
        age: u32,
        /// Free-text condition, e.g. "Type 2 Diabetes"
        #[arg(long)]
        condition: Option<String>,
        /// Wake time (HH:MM)
        #[arg(long)]
        wake: Option<String>,
        /// Sleep time (HH:MM)
        #[arg(long)]
        sleep: Option<String>,
        /// Notification locale tag (en, hi, kn, te)
        #[arg(long)]
        language: Option<String>,
        /// Caregiver contact; enables escalation
        #[arg(long)]
        caregiver: Option<String>,
    },
    /// Show one profile
    Show { id: i64 },
    /// List all profiles
    List,
    /// Update profile fields; today's untouched reminders are regenerated
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        wake: Option<String>,
        #[arg(long)]
        sleep: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        caregiver: Option<String>,
    },
}

pub async fn run(action: UserAction) -> CmdResult {
    let service = HealthService::open()?;

    match action {
        UserAction::Create {
            name,
            age,
            condition,
            wake,
            sleep,
            language,
            caregiver,
        } => {
            let draft = UserDraft {
                name,
                age,
                condition,
                wake_time: wake.as_deref().map(parse_time).transpose()?,
                sleep_time: sleep.as_deref().map(parse_time).transpose()?,
                language,
                caregiver,
            };
            let user = service.create_user(&draft).await?;
            print_json(&user)
        }
        UserAction::Show { id } => print_json(&service.get_user(id)?),
        UserAction::List => print_json(&service.list_users()?),
        UserAction::Update {
            id,
            name,
            age,
            condition,
            wake,
            sleep,
            language,
            caregiver,
        } => {
            let patch = UserPatch {
                name,
                age,
                condition,
                wake_time: wake.as_deref().map(parse_time).transpose()?,
                sleep_time: sleep.as_deref().map(parse_time).transpose()?,
                language,
                caregiver,
            };
            let user = service.update_user(id, &patch).await?;
            print_json(&user)
        }
    }
}
