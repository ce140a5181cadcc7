use clap::Subcommand;

use careclock_core::service::HealthService;

use super::{parse_date, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ScoreAction {
    /// Compute and persist the composite score for a day
    Show {
        user_id: i64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Recent daily scores, most recent first
    History {
        user_id: i64,
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

pub async fn run(action: ScoreAction) -> CmdResult {
    let service = HealthService::open()?;

    match action {
        ScoreAction::Show { user_id, date } => {
            let date = parse_date(date.as_deref())?;
            print_json(&service.health_score(user_id, date)?)
        }
        ScoreAction::History { user_id, days } => {
            print_json(&service.score_history(user_id, days)?)
        }
    }
}
