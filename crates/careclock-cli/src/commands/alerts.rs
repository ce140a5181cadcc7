use clap::Subcommand;

use careclock_core::service::HealthService;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum AlertsAction {
    /// Recent caregiver alerts, newest first
    List { user_id: i64 },
    /// Mark an alert handled
    Resolve { id: i64 },
}

pub async fn run(action: AlertsAction) -> CmdResult {
    let service = HealthService::open()?;

    match action {
        AlertsAction::List { user_id } => print_json(&service.caregiver_alerts(user_id)?),
        AlertsAction::Resolve { id } => {
            service.resolve_alert(id)?;
            print_json(&"resolved")
        }
    }
}
