use clap::Subcommand;

use careclock_core::service::HealthService;
use careclock_core::storage::Config;
use careclock_core::ticker::Ticker;

use super::CmdResult;

#[derive(Subcommand)]
pub enum TickerAction {
    /// Run the sweep loop in the foreground until interrupted
    Run {
        /// Override the configured sweep interval
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

pub async fn run(action: TickerAction) -> CmdResult {
    match action {
        TickerAction::Run { interval_secs } => {
            let mut config = Config::load_or_default().ticker;
            if let Some(secs) = interval_secs {
                config.interval_secs = secs;
            }
            let service = HealthService::open()?;
            Ticker::new(service, &config).run().await;
            Ok(())
        }
    }
}
