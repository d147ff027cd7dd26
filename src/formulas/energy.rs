//! Energy expenditure and macronutrient targets
//!
//! Mifflin-St Jeor BMR, activity-scaled TDEE, goal-adjusted calories and the
//! protein/fat/carbohydrate partition of those calories.

use serde::{Deserialize, Serialize};

use super::body::Sex;

pub(crate) const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARB: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Named activity levels and their TDEE multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    High,
    VeryHigh,
}

impl ActivityLevel {
    pub fn factor(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::High => 1.725,
            ActivityLevel::VeryHigh => 1.9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::High => "high",
            ActivityLevel::VeryHigh => "very_high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "sedentary" | "sedentario" | "sedentário" => Some(ActivityLevel::Sedentary),
            "light" | "lightly_active" | "leve" => Some(ActivityLevel::Light),
            "moderate" | "moderately_active" | "moderada" | "moderado" => {
                Some(ActivityLevel::Moderate)
            }
            "high" | "very_active" | "alta" | "alto" => Some(ActivityLevel::High),
            "very_high" | "extra_active" | "muito_alta" | "muito_alto" => {
                Some(ActivityLevel::VeryHigh)
            }
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentary (1.2)",
            ActivityLevel::Light => "Light (1.375)",
            ActivityLevel::Moderate => "Moderate (1.55)",
            ActivityLevel::High => "High (1.725)",
            ActivityLevel::VeryHigh => "Very high (1.9)",
        }
    }
}

/// Calorie goal relative to maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Deficit20,
    Deficit15,
    Maintenance,
    Surplus10,
    Surplus15,
}

impl Goal {
    pub fn adjustment(&self) -> f64 {
        match self {
            Goal::Deficit20 => 0.80,
            Goal::Deficit15 => 0.85,
            Goal::Maintenance => 1.00,
            Goal::Surplus10 => 1.10,
            Goal::Surplus15 => 1.15,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Deficit20 => "deficit_20",
            Goal::Deficit15 => "deficit_15",
            Goal::Maintenance => "maintenance",
            Goal::Surplus10 => "surplus_10",
            Goal::Surplus15 => "surplus_15",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deficit_20" | "deficit20" | "-20%" => Some(Goal::Deficit20),
            "deficit_15" | "deficit15" | "-15%" | "deficit" => Some(Goal::Deficit15),
            "maintenance" | "maintain" => Some(Goal::Maintenance),
            "surplus_10" | "surplus10" | "+10%" | "surplus" => Some(Goal::Surplus10),
            "surplus_15" | "surplus15" | "+15%" => Some(Goal::Surplus15),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Goal::Deficit20 => "Deficit (-20%)",
            Goal::Deficit15 => "Deficit (-15%)",
            Goal::Maintenance => "Maintenance",
            Goal::Surplus10 => "Surplus (+10%)",
            Goal::Surplus15 => "Surplus (+15%)",
        }
    }
}

/// What the patient is working towards, recorded with each assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    WeightLoss,
    MuscleGain,
    Maintenance,
    Performance,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::WeightLoss => "weight_loss",
            Objective::MuscleGain => "muscle_gain",
            Objective::Maintenance => "maintenance",
            Objective::Performance => "performance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "weight_loss" | "fat_loss" | "emagrecimento" => Some(Objective::WeightLoss),
            "muscle_gain" | "hypertrophy" | "hipertrofia" => Some(Objective::MuscleGain),
            "maintenance" | "manutencao" | "manutenção" => Some(Objective::Maintenance),
            "performance" | "desempenho" => Some(Objective::Performance),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Objective::WeightLoss => "Weight loss",
            Objective::MuscleGain => "Muscle gain",
            Objective::Maintenance => "Maintenance",
            Objective::Performance => "Performance",
        }
    }
}

/// Daily macronutrient grams for a calorie target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
    /// Calories by which protein and fat alone exceed the target.
    /// Zero unless the carbohydrate remainder had to be floored.
    pub shortfall_kcal: f64,
}

impl MacroSplit {
    pub fn is_short(&self) -> bool {
        self.shortfall_kcal > 0.0
    }
}

/// Mifflin-St Jeor basal metabolic rate (kcal/day)
pub fn bmr(sex: Sex, weight_kg: f64, height_cm: f64, age_years: u32) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years);
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

pub fn tdee(bmr: f64, activity_factor: f64) -> f64 {
    bmr * activity_factor
}

pub fn target_calories(tdee: f64, goal_adjustment: f64) -> f64 {
    tdee * goal_adjustment
}

/// Partition `target_calories` into protein (g/kg of body weight), fat (a
/// fraction of calories) and carbohydrate (the remainder, never negative).
pub fn macro_split(
    target_calories: f64,
    protein_g_per_kg: f64,
    weight_kg: f64,
    fat_fraction: f64,
) -> MacroSplit {
    let protein_g = protein_g_per_kg * weight_kg;
    let protein_kcal = protein_g * KCAL_PER_G_PROTEIN;

    let fat_kcal = target_calories * fat_fraction;
    let fat_g = fat_kcal / KCAL_PER_G_FAT;

    let remainder = target_calories - protein_kcal - fat_kcal;
    let carb_kcal = remainder.max(0.0);
    let carb_g = carb_kcal / KCAL_PER_G_CARB;

    MacroSplit {
        protein_g: round1(protein_g),
        fat_g: round1(fat_g),
        carb_g: round1(carb_g),
        shortfall_kcal: (-remainder).max(0.0),
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
