use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

use careclock_core::service::HealthService;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum AdaptiveAction {
    /// Run the 7-day analyzer and list pending suggestions
    Run { user_id: i64 },
    /// List pending suggestions without re-analyzing
    List { user_id: i64 },
    /// Accept a suggestion; the slot's time shifts from tomorrow on
    Apply { id: Uuid },
    /// Reject a suggestion permanently
    Dismiss { id: Uuid },
}

pub async fn run(action: AdaptiveAction) -> CmdResult {
    let service = HealthService::open()?;
    let now = Utc::now();

    match action {
        AdaptiveAction::Run { user_id } => {
            print_json(&service.run_adaptive(user_id, now.date_naive()).await?)
        }
        AdaptiveAction::List { user_id } => print_json(&service.list_suggestions(user_id)?),
        AdaptiveAction::Apply { id } => print_json(&service.apply_suggestion(id, now).await?),
        AdaptiveAction::Dismiss { id } => print_json(&service.dismiss_suggestion(id).await?),
    }
}
