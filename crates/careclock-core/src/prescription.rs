//! Prescription text import.
//!
//! Takes the raw text of a prescription (typically the output of an OCR
//! pass done outside this crate) and extracts medicine drafts with a
//! best-effort dosage, timing, and duration. Extraction never fails; an
//! unparseable text yields an empty list.

use chrono::NaiveTime;
use regex::Regex;
use std::sync::OnceLock;

use crate::medicine::{MedicineDraft, MedicineOrigin, Priority};

/// Extraction stops after this many medicines.
pub const MAX_MEDICINES: usize = 10;

const KNOWN_MEDICINES: &[&str] = &[
    "Metformin",
    "Glucophage",
    "Aspirin",
    "Paracetamol",
    "Atorvastatin",
    "Lisinopril",
    "Amlodipine",
    "Omeprazole",
    "Metoprolol",
    "Losartan",
    "Ramipril",
    "Cetirizine",
    "Pantoprazole",
    "Vitamin",
    "Calcium",
    "Iron",
    "Amoxicillin",
    "Ciprofloxacin",
    "Azithromycin",
    "Doxycycline",
    "Levothyroxine",
    "Insulin",
    "Glipizide",
    "Januvia",
    "Warfarin",
];

fn dosage_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+\s*mg|\d+\s*ml|\d+\s*tablet|\d+\s*cap)")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn duration_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(day|week|month)")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

/// Times implied by a timing keyword found on the medicine's line.
fn keyword_times(line_lower: &str) -> Option<Vec<NaiveTime>> {
    const SINGLE: &[(&str, (u32, u32))] = &[
        ("morning", (8, 0)),
        ("afternoon", (13, 0)),
        ("evening", (18, 0)),
        ("night", (21, 0)),
        ("breakfast", (8, 0)),
        ("lunch", (13, 0)),
        ("dinner", (19, 30)),
        ("bedtime", (21, 30)),
    ];
    for (kw, (h, m)) in SINGLE {
        if line_lower.contains(kw) {
            return Some(vec![t(*h, *m)]);
        }
    }
    if line_lower.contains("twice") {
        return Some(vec![t(8, 0), t(20, 0)]);
    }
    if line_lower.contains("thrice") {
        return Some(vec![t(8, 0), t(14, 0), t(20, 0)]);
    }
    None
}

fn duration_days(line: &str) -> Option<u32> {
    let caps = duration_pattern().captures(line)?;
    let n: u32 = caps.get(1)?.as_str().parse().ok()?;
    let days = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "week" => n * 7,
        "month" => n * 30,
        _ => n,
    };
    Some(days)
}

fn draft(name: &str, line: &str) -> MedicineDraft {
    let dosage = dosage_pattern()
        .find(line)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "1 tablet".to_string());
    MedicineDraft {
        name: name.to_string(),
        dosage,
        times: keyword_times(&line.to_lowercase()).unwrap_or_else(|| vec![t(8, 0)]),
        duration_days: 7,
        priority: Priority::High,
        origin: MedicineOrigin::Ocr,
    }
}

/// Extract medicine drafts from prescription text.
///
/// Lines naming a known medicine start a new draft; a duration found on a
/// later line attaches to the draft in progress. When no known medicine
/// matches, capitalized words longer than four characters are taken as
/// candidate names (capped at five).
pub fn parse_prescription_text(text: &str) -> Vec<MedicineDraft> {
    let mut medicines: Vec<MedicineDraft> = Vec::new();
    let mut current: Option<MedicineDraft> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line_lower = line.to_lowercase();
        if let Some(name) = KNOWN_MEDICINES
            .iter()
            .find(|m| line_lower.contains(&m.to_lowercase()))
        {
            if let Some(done) = current.take() {
                medicines.push(done);
            }
            current = Some(draft(name, line));
        }
        if let (Some(days), Some(med)) = (duration_days(line), current.as_mut()) {
            med.duration_days = days;
        }
    }
    if let Some(done) = current {
        medicines.push(done);
    }

    // Generic fallback: any long capitalized word followed by more text.
    if medicines.is_empty() {
        'outer: for line in text.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            for (i, w) in words.iter().enumerate() {
                let capitalized = w.chars().next().is_some_and(|c| c.is_uppercase());
                if capitalized && w.len() > 4 && i + 1 < words.len() {
                    medicines.push(draft(w, line));
                    if medicines.len() >= 5 {
                        break 'outer;
                    }
                }
            }
        }
    }

    medicines.truncate(MAX_MEDICINES);
    medicines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Dr. A. Rao, MBBS
Rx
1. Metformin 500 mg - morning and night, 30 days
2. Atorvastatin 10 mg - bedtime
3. Aspirin 75 mg twice daily
Review after 1 month";

    #[test]
    fn extracts_known_medicines_with_dosage() {
        let meds = parse_prescription_text(SAMPLE);
        assert_eq!(meds.len(), 3);
        assert_eq!(meds[0].name, "Metformin");
        assert_eq!(meds[0].dosage, "500 mg");
        assert_eq!(meds[0].duration_days, 30);
        assert_eq!(meds[1].name, "Atorvastatin");
        assert_eq!(meds[1].times, vec![t(21, 30)]);
        assert!(meds.iter().all(|m| m.origin == MedicineOrigin::Ocr));
    }

    #[test]
    fn twice_daily_expands_to_two_times() {
        let meds = parse_prescription_text("Aspirin 75 mg twice daily");
        assert_eq!(meds[0].times, vec![t(8, 0), t(20, 0)]);
    }

    #[test]
    fn thrice_daily_expands_to_three_times() {
        let meds = parse_prescription_text("Amoxicillin 250 mg thrice daily for 5 days");
        assert_eq!(meds[0].times, vec![t(8, 0), t(14, 0), t(20, 0)]);
        assert_eq!(meds[0].duration_days, 5);
    }

    #[test]
    fn duration_units_convert_to_days() {
        let meds = parse_prescription_text("Levothyroxine 50 mg morning\nfor 2 weeks");
        assert_eq!(meds[0].duration_days, 14);
        let meds = parse_prescription_text("Warfarin 5 mg night for 3 months");
        assert_eq!(meds[0].duration_days, 90);
    }

    #[test]
    fn missing_dosage_defaults_to_one_tablet() {
        let meds = parse_prescription_text("Take Calcium every morning");
        assert_eq!(meds[0].dosage, "1 tablet");
        assert_eq!(meds[0].times, vec![t(8, 0)]);
    }

    #[test]
    fn generic_fallback_picks_capitalized_words() {
        let meds = parse_prescription_text("Zyloprim 100 mg at night");
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].name, "Zyloprim");
        assert_eq!(meds[0].dosage, "100 mg");
    }

    #[test]
    fn empty_or_garbage_text_yields_nothing() {
        assert!(parse_prescription_text("").is_empty());
        assert!(parse_prescription_text("   \n \n ").is_empty());
        assert!(parse_prescription_text("lowercase only words here").is_empty());
    }

    #[test]
    fn extraction_is_capped() {
        let text: String = (0..20).map(|i| format!("Vitamin B{i} 10 mg\n")).collect();
        let meds = parse_prescription_text(&text);
        assert_eq!(meds.len(), MAX_MEDICINES);
    }
}
