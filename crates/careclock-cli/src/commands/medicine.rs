use clap::Subcommand;
use std::io::Read;

use careclock_core::medicine::{MedicineDraft, Priority};
use careclock_core::service::HealthService;

use super::{parse_time, print_json, CmdResult};

#[derive(Subcommand)]
pub enum MedicineAction {
    /// Register a medicine course
    Add {
        user_id: i64,
        name: String,
        #[arg(long, default_value = "1 tablet")]
        dosage: String,
        /// Comma-separated times of day, e.g. "08:00,20:00"
        #[arg(long, default_value = "08:00")]
        times: String,
        /// Course length in days
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// HIGH, MEDIUM, or LOW
        #[arg(long, default_value = "HIGH")]
        priority: String,
    },
    /// List medicines for a user
    List {
        user_id: i64,
        /// Include deactivated courses
        #[arg(long)]
        all: bool,
    },
    /// Deactivate a medicine; past reminders keep their history
    Remove { id: i64 },
    /// Parse prescription text (from a file, or stdin when omitted) and
    /// register every extractable medicine
    Import {
        user_id: i64,
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },
}

pub async fn run(action: MedicineAction) -> CmdResult {
    let service = HealthService::open()?;

    match action {
        MedicineAction::Add {
            user_id,
            name,
            dosage,
            times,
            days,
            priority,
        } => {
            let mut draft = MedicineDraft::new(name);
            draft.dosage = dosage;
            draft.times = times
                .split(',')
                .map(|s| parse_time(s.trim()))
                .collect::<Result<_, _>>()?;
            draft.duration_days = days;
            draft.priority = Priority::from_str_or_medium(&priority);
            let medicine = service.add_medicine(user_id, &draft).await?;
            print_json(&medicine)
        }
        MedicineAction::List { user_id, all } => {
            print_json(&service.list_medicines(user_id, !all)?)
        }
        MedicineAction::Remove { id } => {
            service.remove_medicine(id).await?;
            print_json(&"removed")
        }
        MedicineAction::Import { user_id, file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let imported = service.import_prescription(user_id, &text).await?;
            print_json(&imported)
        }
    }
}
