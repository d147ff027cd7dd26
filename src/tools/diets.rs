//! Diet MCP Tools
//!
//! Energy and macro targets. Inputs the caller leaves out are filled from the
//! patient record and the latest assessment; every such fallback is reported
//! back in `defaults_used`.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::db::Database;
use crate::formulas::energy::round1;
use crate::formulas::{
    age_from_birthdate, ActivityLevel, DietCalculation, DietInputs, Goal, Sex,
};
use crate::models::{AssessmentRecord, DietTarget, Patient};

pub const DEFAULT_AGE_YEARS: u32 = 30;
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_PROTEIN_G_PER_KG: f64 = 1.8;
pub const DEFAULT_FAT_FRACTION: f64 = 0.25;

pub const PROTEIN_G_PER_KG_RANGE: (f64, f64) = (1.2, 2.6);
pub const FAT_FRACTION_RANGE: (f64, f64) = (0.15, 0.40);

/// Optional overrides for a diet calculation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DietRequest {
    pub sex: Option<String>,
    pub age_years: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
    pub protein_g_per_kg: Option<f64>,
    pub fat_fraction: Option<f64>,
}

/// Response for calculate_diet and save_diet_target
#[derive(Debug, Serialize)]
pub struct DietResponse {
    pub patient_id: i64,
    pub sex: Sex,
    pub age_years: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    #[serde(flatten)]
    pub calculation: DietCalculation,
    pub defaults_used: Vec<String>,
    pub warning: Option<String>,
    /// Set once the target has been stored
    pub diet_target_id: Option<i64>,
}

/// Response for get_active_diet
#[derive(Debug, Serialize)]
pub struct ActiveDietResponse {
    pub target: DietTarget,
    pub history_count: usize,
}

fn check_range(name: &str, value: f64, (lo, hi): (f64, f64)) -> Result<f64, String> {
    if value.is_finite() && value >= lo - 1e-9 && value <= hi + 1e-9 {
        Ok(value)
    } else {
        Err(format!("{} must be between {} and {}, got {}", name, lo, hi, value))
    }
}

fn positive(name: &str, value: f64) -> Result<f64, String> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{} must be greater than 0, got {}", name, value))
    }
}

/// Resolve every input and run the calculation without storing it
pub fn calculate_diet(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    req: &DietRequest,
) -> Result<DietResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let patient = Patient::get_by_id(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get patient: {}", e))?
        .ok_or_else(|| format!("Patient not found with id: {}", patient_id))?;
    let latest = AssessmentRecord::latest_for_patient(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get assessment: {}", e))?;
    drop(conn);

    let mut defaults_used = Vec::new();

    let sex = match req.sex.as_deref() {
        Some(s) => Sex::from_str(s).ok_or_else(|| format!("Invalid sex '{}'. Use male or female", s))?,
        None => match patient.sex.or(latest.as_ref().map(|a| a.measurement.sex)) {
            Some(sex) => sex,
            None => {
                defaults_used.push("sex: not on file, using male".to_string());
                Sex::Male
            }
        },
    };

    let age_years = match req.age_years {
        Some(age) => age,
        None => {
            let today = Local::now().date_naive();
            match patient.birthdate.as_deref().and_then(|b| age_from_birthdate(b, today)) {
                Some(age) => age,
                None => {
                    defaults_used.push(format!(
                        "age_years: no valid birthdate on file, using {}",
                        DEFAULT_AGE_YEARS
                    ));
                    DEFAULT_AGE_YEARS
                }
            }
        }
    };

    let from_assessment = |field: fn(&AssessmentRecord) -> f64| {
        latest.as_ref().map(field).filter(|v| *v > 0.0)
    };

    let weight_kg = match req.weight_kg {
        Some(w) => positive("weight_kg", w)?,
        None => from_assessment(|a| a.measurement.weight_kg).unwrap_or_else(|| {
            defaults_used.push(format!("weight_kg: no assessment on file, using {}", DEFAULT_WEIGHT_KG));
            DEFAULT_WEIGHT_KG
        }),
    };

    let height_cm = match req.height_cm {
        Some(h) => positive("height_cm", h)?,
        None => from_assessment(|a| a.measurement.height_cm).unwrap_or_else(|| {
            defaults_used.push(format!("height_cm: no assessment on file, using {}", DEFAULT_HEIGHT_CM));
            DEFAULT_HEIGHT_CM
        }),
    };

    let activity = match req.activity_level.as_deref() {
        Some(a) => ActivityLevel::from_str(a).ok_or_else(|| {
            format!(
                "Invalid activity level '{}'. Use sedentary, light, moderate, high or very_high",
                a
            )
        })?,
        None => match latest.as_ref().and_then(|a| a.activity_level) {
            Some(level) => level,
            None => {
                defaults_used.push("activity_level: using sedentary".to_string());
                ActivityLevel::Sedentary
            }
        },
    };

    let goal = match req.goal.as_deref() {
        Some(g) => Goal::from_str(g).ok_or_else(|| {
            format!(
                "Invalid goal '{}'. Use deficit_20, deficit_15, maintenance, surplus_10 or surplus_15",
                g
            )
        })?,
        None => {
            defaults_used.push("goal: using deficit_15".to_string());
            Goal::Deficit15
        }
    };

    let protein_g_per_kg = check_range(
        "protein_g_per_kg",
        req.protein_g_per_kg.unwrap_or(DEFAULT_PROTEIN_G_PER_KG),
        PROTEIN_G_PER_KG_RANGE,
    )?;
    let fat_fraction = check_range(
        "fat_fraction",
        req.fat_fraction.unwrap_or(DEFAULT_FAT_FRACTION),
        FAT_FRACTION_RANGE,
    )?;

    let calculation = DietCalculation::compute(&DietInputs {
        sex,
        weight_kg,
        height_cm,
        age_years,
        activity,
        goal,
        protein_g_per_kg,
        fat_fraction,
    });

    Ok(DietResponse {
        patient_id,
        sex,
        age_years,
        weight_kg,
        height_cm,
        warning: calculation.shortfall_warning(),
        calculation,
        defaults_used,
        diet_target_id: None,
    })
}

/// Calculate and store as the patient's active target
pub fn save_diet_target(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    req: &DietRequest,
) -> Result<DietResponse, String> {
    let mut response = calculate_diet(db, ctx, patient_id, req)?;

    let mut stored = response.calculation;
    stored.bmr = round1(stored.bmr);
    stored.tdee = round1(stored.tdee);
    stored.target_calories = round1(stored.target_calories);

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let target = DietTarget::create(&conn, ctx, patient_id, &today, &stored)
        .map_err(|e| format!("Failed to save diet target: {}", e))?;

    tracing::info!(
        event = "diet_saved",
        diet_target_id = target.id,
        patient_id,
        target_calories = target.target_calories
    );

    response.calculation = stored;
    response.diet_target_id = Some(target.id);
    Ok(response)
}

/// The patient's active (most recent) diet target
pub fn get_active_diet(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
) -> Result<Option<ActiveDietResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let history = DietTarget::list_for_patient(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get diet targets: {}", e))?;

    let history_count = history.len();
    Ok(history
        .into_iter()
        .next()
        .map(|target| ActiveDietResponse { target, history_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::assessments::{record_assessment, AssessmentContext, MeasurementInput};
    use crate::tools::test_support::{seed_patient, test_db};

    #[test]
    fn test_defaults_without_assessment() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);

        let resp = calculate_diet(&db, &ctx, patient.id, &DietRequest::default()).unwrap();
        assert_eq!(resp.sex, Sex::Female);
        assert_eq!(resp.weight_kg, DEFAULT_WEIGHT_KG);
        assert_eq!(resp.height_cm, DEFAULT_HEIGHT_CM);
        assert_eq!(resp.calculation.goal, Goal::Deficit15);
        assert_eq!(resp.calculation.activity_level, ActivityLevel::Sedentary);
        assert!(resp.defaults_used.iter().any(|d| d.starts_with("weight_kg")));
        assert!(resp.diet_target_id.is_none());
    }

    #[test]
    fn test_prefills_from_latest_assessment() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);
        record_assessment(
            &db,
            &ctx,
            patient.id,
            &MeasurementInput {
                weight_kg: Some(62.0),
                height_cm: Some(160.0),
                ..Default::default()
            },
            AssessmentContext {
                activity_level: Some("moderate".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let resp = calculate_diet(
            &db,
            &ctx,
            patient.id,
            &DietRequest {
                goal: Some("maintenance".to_string()),
                age_years: Some(35),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(resp.weight_kg, 62.0);
        assert_eq!(resp.height_cm, 160.0);
        assert_eq!(resp.calculation.activity_level, ActivityLevel::Moderate);
        assert!(resp.defaults_used.is_empty());
        // 620 + 1000 - 175 - 161 = 1284
        assert!((resp.calculation.bmr - 1284.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_out_of_range_macros() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);

        let err = calculate_diet(
            &db,
            &ctx,
            patient.id,
            &DietRequest {
                protein_g_per_kg: Some(3.5),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("protein_g_per_kg"));

        let err = calculate_diet(
            &db,
            &ctx,
            patient.id,
            &DietRequest {
                fat_fraction: Some(25.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("fat_fraction"));
    }

    #[test]
    fn test_save_and_get_active() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);

        assert!(get_active_diet(&db, &ctx, patient.id).unwrap().is_none());

        let saved = save_diet_target(&db, &ctx, patient.id, &DietRequest::default()).unwrap();
        let id = saved.diet_target_id.unwrap();

        let active = get_active_diet(&db, &ctx, patient.id).unwrap().unwrap();
        assert_eq!(active.target.id, id);
        assert_eq!(active.history_count, 1);
        assert_eq!(active.target.target_calories, saved.calculation.target_calories);
    }

    #[test]
    fn test_unknown_patient() {
        let db = test_db();
        let err = calculate_diet(&db, &RequestContext::new(1), 7, &DietRequest::default()).unwrap_err();
        assert!(err.contains("not found"));
    }
}
