//! Immutable per-process rule tables.
//!
//! Keyed by the closed [`Condition`] enum plus the `General` fallback so the
//! compiler enforces exhaustiveness. No ad hoc branching elsewhere: the
//! schedule generator only consults these lookups.

use serde::{Deserialize, Serialize};

use crate::medicine::Priority;
use crate::profile::{AgeGroup, Condition};

/// Exercise intensity bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

/// Static guidance attached to a condition.
#[derive(Debug, Clone, Copy)]
pub struct ConditionRules {
    /// Activities ordered from most to least intense.
    pub exercises: &'static [&'static str],
    /// Dietary guidance, indexed breakfast / lunch / dinner-ish.
    pub diet: &'static [&'static str],
    /// Standing condition alerts surfaced as health tips.
    pub tips: &'static [&'static str],
    pub priority: Priority,
}

/// Exhaustive condition -> rules lookup.
pub fn condition_rules(condition: Condition) -> &'static ConditionRules {
    match condition {
        Condition::Diabetes => &ConditionRules {
            exercises: &["30-min brisk walking", "Light yoga", "Post-meal 10-min walk"],
            diet: &["Avoid sugar & refined carbs", "Eat every 3-4 hours", "High-fiber foods"],
            tips: &["Monitor blood sugar before meals", "Carry glucose tablets"],
            priority: Priority::High,
        },
        Condition::Hypertension => &ConditionRules {
            exercises: &["30-min walking", "Breathing exercises", "Swimming"],
            diet: &["Low-sodium diet", "DASH diet foods", "Reduce caffeine"],
            tips: &["Measure BP morning & evening", "Avoid stress"],
            priority: Priority::High,
        },
        Condition::HeartDisease => &ConditionRules {
            exercises: &["Low-intensity walking", "Gentle stretching", "Supervised cardio"],
            diet: &["Heart-healthy omega-3 foods", "Low-fat diet", "No trans fats"],
            tips: &["Keep nitroglycerin handy", "Avoid heavy lifting"],
            priority: Priority::High,
        },
        Condition::Asthma => &ConditionRules {
            exercises: &["Swimming", "Light indoor yoga", "Avoid cold-air running"],
            diet: &["Anti-inflammatory foods", "Avoid food allergens", "Stay hydrated"],
            tips: &["Carry inhaler always", "Avoid smoke & dust"],
            priority: Priority::High,
        },
        Condition::Thyroid => &ConditionRules {
            exercises: &["Cardio 30 mins daily", "Strength training 3x/week"],
            diet: &["Iodine-rich foods", "Avoid soy excess", "Selenium-rich foods"],
            tips: &["Take medicine on empty stomach", "Regular TSH tests"],
            priority: Priority::High,
        },
        Condition::Obesity => &ConditionRules {
            exercises: &["45-min cardio daily", "Strength training", "Swimming"],
            diet: &["Calorie deficit diet", "High protein meals", "No late-night eating"],
            tips: &["Track daily calorie intake", "Weigh in weekly"],
            priority: Priority::Medium,
        },
        Condition::Anxiety => &ConditionRules {
            exercises: &["Yoga & meditation", "Nature walks", "Deep breathing"],
            diet: &["Reduce caffeine", "Magnesium-rich foods", "Balanced meals"],
            tips: &["Practice mindfulness daily", "Maintain sleep schedule"],
            priority: Priority::Medium,
        },
        Condition::KidneyDisease => &ConditionRules {
            exercises: &["Gentle walking", "Light stretching", "Chair exercises"],
            diet: &["Limit sodium & potassium", "Controlled protein portions", "Fresh over processed"],
            tips: &["Track fluid intake daily", "Avoid NSAID painkillers"],
            priority: Priority::High,
        },
        Condition::Arthritis => &ConditionRules {
            exercises: &["Water aerobics", "Range-of-motion stretching", "Short flat walks"],
            diet: &["Anti-inflammatory foods", "Omega-3 rich meals", "Maintain healthy weight"],
            tips: &["Warm joints before activity", "Avoid repetitive strain"],
            priority: Priority::Medium,
        },
        Condition::Insomnia => &ConditionRules {
            exercises: &["Morning sunlight walk", "Evening stretching", "Relaxation breathing"],
            diet: &["No caffeine after noon", "Light dinners", "Avoid late-night screens & snacks"],
            tips: &["Keep a fixed sleep schedule", "Keep the bedroom dark & cool"],
            priority: Priority::Medium,
        },
        Condition::General => &ConditionRules {
            exercises: &["30-min moderate exercise", "Stretching"],
            diet: &["Balanced nutrition", "Plenty of vegetables"],
            tips: &["Stay hydrated", "Regular health checkups"],
            priority: Priority::Low,
        },
    }
}

/// Age-group baselines.
#[derive(Debug, Clone, Copy)]
pub struct AgeRules {
    pub exercise_intensity: Intensity,
    pub sleep_hours: u32,
}

pub fn age_rules(group: AgeGroup) -> &'static AgeRules {
    match group {
        AgeGroup::Young => &AgeRules {
            exercise_intensity: Intensity::High,
            sleep_hours: 8,
        },
        AgeGroup::Adult => &AgeRules {
            exercise_intensity: Intensity::Medium,
            sleep_hours: 7,
        },
        AgeGroup::Senior => &AgeRules {
            exercise_intensity: Intensity::Low,
            sleep_hours: 8,
        },
    }
}

/// Daily glass target: baseline 8, condition-adjusted, clamped to [6, 10].
/// Kidney conditions raise the target; heart failure lowers it.
pub fn water_target(condition: Condition) -> u32 {
    let adjustment: i32 = match condition {
        Condition::KidneyDisease => 2,
        Condition::HeartDisease => -2,
        _ => 0,
    };
    (8 + adjustment).clamp(6, 10) as u32
}

/// Resolved exercise slot for one (age group, condition) cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisePlan {
    pub intensity: Intensity,
    pub activity: String,
    /// Minutes after wake time for the reminder.
    pub offset_from_wake_min: i64,
}

/// Age-group x condition lookup. Seniors and high-risk conditions map to
/// low-intensity slots placed later in the day.
pub fn exercise_plan(group: AgeGroup, condition: Condition) -> ExercisePlan {
    let baseline = age_rules(group).exercise_intensity;
    let intensity = if condition.is_high_risk() {
        Intensity::Low
    } else {
        baseline
    };
    let rules = condition_rules(condition);
    // Exercise lists run most to least intense.
    let activity = match intensity {
        Intensity::High => rules.exercises.first(),
        Intensity::Medium => rules.exercises.get(1).or_else(|| rules.exercises.first()),
        Intensity::Low => rules.exercises.last(),
    }
    .copied()
    .unwrap_or("30-min walk");

    let offset_from_wake_min = match intensity {
        Intensity::High => 120,
        Intensity::Medium => 150,
        Intensity::Low => 540,
    };

    ExercisePlan {
        intensity,
        activity: activity.to_string(),
        offset_from_wake_min,
    }
}
