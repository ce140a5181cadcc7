use clap::Subcommand;

use careclock_core::service::HealthService;

use super::{parse_date, print_json, CmdResult};

#[derive(Subcommand)]
pub enum HydrationAction {
    /// Today's glasses against the condition-adjusted target
    Show {
        user_id: i64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Log water; one glass by default, or an absolute count with --glasses
    Log {
        user_id: i64,
        #[arg(long)]
        glasses: Option<u32>,
        #[arg(long)]
        date: Option<String>,
    },
}

pub async fn run(action: HydrationAction) -> CmdResult {
    let service = HealthService::open()?;

    match action {
        HydrationAction::Show { user_id, date } => {
            let date = parse_date(date.as_deref())?;
            print_json(&service.hydration(user_id, date)?)
        }
        HydrationAction::Log {
            user_id,
            glasses,
            date,
        } => {
            let date = parse_date(date.as_deref())?;
            let status = match glasses {
                Some(n) => service.set_hydration(user_id, date, n)?,
                None => service.add_glass(user_id, date)?,
            };
            print_json(&status)
        }
    }
}
