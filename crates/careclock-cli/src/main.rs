use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "careclock", version, about = "CareClock health reminder CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User profile management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Medicine regimen management
    Medicine {
        #[command(subcommand)]
        action: commands::medicine::MedicineAction,
    },
    /// Daily reminder schedule
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderCmd,
    },
    /// Water intake tracking
    Hydration {
        #[command(subcommand)]
        action: commands::hydration::HydrationAction,
    },
    /// Health score and history
    Score {
        #[command(subcommand)]
        action: commands::score::ScoreAction,
    },
    /// Adaptive time-shift suggestions
    Adaptive {
        #[command(subcommand)]
        action: commands::adaptive::AdaptiveAction,
    },
    /// Caregiver alerts
    Alerts {
        #[command(subcommand)]
        action: commands::alerts::AlertsAction,
    },
    /// Aggregated daily dashboard
    Dashboard {
        #[command(subcommand)]
        action: commands::dashboard::DashboardAction,
    },
    /// Background sweep loop
    Ticker {
        #[command(subcommand)]
        action: commands::ticker::TickerAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action).await,
        Commands::Medicine { action } => commands::medicine::run(action).await,
        Commands::Reminder { action } => commands::reminder::run(action).await,
        Commands::Hydration { action } => commands::hydration::run(action).await,
        Commands::Score { action } => commands::score::run(action).await,
        Commands::Adaptive { action } => commands::adaptive::run(action).await,
        Commands::Alerts { action } => commands::alerts::run(action).await,
        Commands::Dashboard { action } => commands::dashboard::run(action).await,
        Commands::Ticker { action } => commands::ticker::run(action).await,
    };

    if let Err(e) = result {
        let envelope = careclock_core::ApiResponse::<()>::err(e.to_string());
        match serde_json::to_string_pretty(&envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
