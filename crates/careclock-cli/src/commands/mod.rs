pub mod adaptive;
pub mod alerts;
pub mod dashboard;
pub mod hydration;
pub mod medicine;
pub mod reminder;
pub mod score;
pub mod ticker;
pub mod user;

use chrono::{NaiveDate, NaiveTime, Utc};

use careclock_core::ApiResponse;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// `--date` arguments default to today.
pub fn parse_date(arg: Option<&str>) -> Result<NaiveDate, chrono::ParseError> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d"),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
}

/// Every operation answers with the `{success, data, error}` envelope.
pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(&ApiResponse::ok(value))?);
    Ok(())
}
