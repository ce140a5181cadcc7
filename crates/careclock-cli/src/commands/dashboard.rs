use chrono::Utc;
use clap::Subcommand;

use careclock_core::service::HealthService;

use super::{parse_date, print_json, CmdResult};

#[derive(Subcommand)]
pub enum DashboardAction {
    /// Full aggregated view for one user and day
    Show {
        user_id: i64,
        #[arg(long)]
        date: Option<String>,
    },
}

pub async fn run(action: DashboardAction) -> CmdResult {
    let service = HealthService::open()?;

    match action {
        DashboardAction::Show { user_id, date } => {
            let date = parse_date(date.as_deref())?;
            print_json(&service.dashboard(user_id, date, Utc::now().time())?)
        }
    }
}
