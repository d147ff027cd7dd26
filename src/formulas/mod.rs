//! Anthropometric and metabolic calculations
//!
//! Pure functions over plain numbers. Nothing here touches the database; an
//! index that cannot be computed from the inputs is `None`, never an error.

pub mod age;
pub mod body;
pub mod energy;

pub use age::{age_from_birthdate, parse_iso_date};
pub use body::{
    bmi, body_fat_percent, classify_bmi, waist_hip_ratio, waist_status, BmiCategory,
    CutoffStatus, Sex, WaistHipRatio, WaistStatus,
};
pub use energy::{
    bmr, macro_split, target_calories, tdee, ActivityLevel, Goal, MacroSplit, Objective,
};

use serde::{Deserialize, Serialize};

/// Raw measurements taken at a visit. 0 means "not provided".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub sex: Sex,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default)]
    pub waist_cm: f64,
    #[serde(default)]
    pub hip_cm: f64,
    #[serde(default)]
    pub neck_cm: f64,
}

/// Every index derivable from a single measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiCategory>,
    pub waist: WaistStatus,
    pub waist_hip: WaistHipRatio,
    pub body_fat_pct: Option<f64>,
}

impl BodyComposition {
    pub fn compute(m: &Measurement) -> Self {
        let bmi = bmi(m.weight_kg, m.height_cm);
        let hip = (m.hip_cm > 0.0).then_some(m.hip_cm);

        Self {
            bmi,
            bmi_category: bmi.map(classify_bmi),
            waist: waist_status(m.sex, m.waist_cm),
            waist_hip: waist_hip_ratio(m.sex, m.waist_cm, m.hip_cm),
            body_fat_pct: body_fat_percent(m.sex, m.height_cm, m.waist_cm, m.neck_cm, hip),
        }
    }
}

/// Inputs for a full energy/macro calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DietInputs {
    pub sex: Sex,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age_years: u32,
    pub activity: ActivityLevel,
    pub goal: Goal,
    pub protein_g_per_kg: f64,
    pub fat_fraction: f64,
}

/// BMR through macro split, as shown to the practitioner before saving
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DietCalculation {
    pub bmr: f64,
    pub activity_level: ActivityLevel,
    pub activity_factor: f64,
    pub tdee: f64,
    pub goal: Goal,
    pub goal_adjustment: f64,
    pub target_calories: f64,
    pub protein_g_per_kg: f64,
    pub fat_fraction: f64,
    pub macros: MacroSplit,
}

impl DietCalculation {
    pub fn compute(inputs: &DietInputs) -> Self {
        let activity_factor = inputs.activity.factor();
        let goal_adjustment = inputs.goal.adjustment();

        let bmr = bmr(inputs.sex, inputs.weight_kg, inputs.height_cm, inputs.age_years);
        let tdee = tdee(bmr, activity_factor);
        let target_calories = target_calories(tdee, goal_adjustment);
        let macros = macro_split(
            target_calories,
            inputs.protein_g_per_kg,
            inputs.weight_kg,
            inputs.fat_fraction,
        );

        Self {
            bmr,
            activity_level: inputs.activity,
            activity_factor,
            tdee,
            goal: inputs.goal,
            goal_adjustment,
            target_calories,
            protein_g_per_kg: inputs.protein_g_per_kg,
            fat_fraction: inputs.fat_fraction,
            macros,
        }
    }

    /// Human-readable warning when the carbohydrate remainder was floored
    pub fn shortfall_warning(&self) -> Option<String> {
        self.macros
            .is_short()
            .then(|| shortfall_message(self.target_calories, self.macros.shortfall_kcal))
    }
}

pub fn shortfall_message(target_calories: f64, shortfall_kcal: f64) -> String {
    format!(
        "Protein and fat already exceed the {:.0} kcal target by {:.0} kcal; \
         carbohydrate set to 0 g and the plan totals fall short of the target",
        target_calories, shortfall_kcal
    )
}
