//! Assessment MCP Tools
//!
//! Body composition previews and per-visit assessment records.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::db::Database;
use crate::formulas::{
    parse_iso_date, ActivityLevel, BodyComposition, CutoffStatus, Measurement, Objective, Sex,
};
use crate::models::{AssessmentCreate, AssessmentRecord, Patient};

/// Measurements as entered; missing values count as "not provided"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementInput {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub neck_cm: Option<f64>,
}

impl MeasurementInput {
    pub fn with_sex(&self, sex: Sex) -> Measurement {
        let v = |x: Option<f64>| x.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0);
        Measurement {
            sex,
            weight_kg: v(self.weight_kg),
            height_cm: v(self.height_cm),
            waist_cm: v(self.waist_cm),
            hip_cm: v(self.hip_cm),
            neck_cm: v(self.neck_cm),
        }
    }
}

/// Everything recorded at a visit besides the measurement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentContext {
    /// ISO date, defaults to today
    pub assessed_on: Option<String>,
    pub objective: Option<String>,
    pub activity_level: Option<String>,
    pub sleep_hours: Option<f64>,
    pub note: Option<String>,
}

/// Computed indices with readable interpretation lines
#[derive(Debug, Serialize)]
pub struct CompositionView {
    #[serde(flatten)]
    pub composition: BodyComposition,
    pub interpretation: Vec<String>,
}

/// Response for record_assessment and get_latest_assessment
#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub record: AssessmentRecord,
    pub interpretation: Vec<String>,
}

impl From<AssessmentRecord> for AssessmentDetail {
    fn from(record: AssessmentRecord) -> Self {
        let interpretation = interpret(&record.composition);
        Self { record, interpretation }
    }
}

/// One line per index, "unavailable" where an index could not be computed
pub fn interpret(bc: &BodyComposition) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);

    lines.push(match (bc.bmi, bc.bmi_category) {
        (Some(bmi), Some(cat)) => format!("BMI {:.1} kg/m² ({})", bmi, cat.display_name()),
        _ => "BMI unavailable (weight and height required)".to_string(),
    });

    lines.push(match bc.waist.status {
        CutoffStatus::Unknown => "Waist circumference not provided".to_string(),
        status => format!(
            "Waist circumference {} ({:.0} cm)",
            status.display_name(),
            bc.waist.cutoff_cm
        ),
    });

    lines.push(match bc.waist_hip.ratio {
        Some(ratio) => format!(
            "Waist-hip ratio {:.2}, {} ({:.2})",
            ratio,
            bc.waist_hip.status.display_name(),
            bc.waist_hip.cutoff
        ),
        None => "Waist-hip ratio unavailable (waist and hip required)".to_string(),
    });

    lines.push(match bc.body_fat_pct {
        Some(bf) => format!("Estimated body fat {:.1}% (circumference method)", bf),
        None => "Body fat unavailable (check height, waist, neck and, for women, hip)".to_string(),
    });

    lines
}

/// Compute indices without storing anything
pub fn preview_assessment(sex: &str, input: &MeasurementInput) -> Result<CompositionView, String> {
    let sex = Sex::from_str(sex)
        .ok_or_else(|| format!("Invalid sex '{}'. Use male or female", sex))?;
    let composition = BodyComposition::compute(&input.with_sex(sex));
    Ok(CompositionView {
        interpretation: interpret(&composition),
        composition,
    })
}

fn parse_optional<T>(
    value: Option<&str>,
    what: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => parse(v)
            .map(Some)
            .ok_or_else(|| format!("Invalid {} '{}'", what, v)),
    }
}

/// Record a visit for a patient whose sex is on file
pub fn record_assessment(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    input: &MeasurementInput,
    visit: AssessmentContext,
) -> Result<AssessmentDetail, String> {
    let objective = parse_optional(visit.objective.as_deref(), "objective", Objective::from_str)?;
    let activity_level = parse_optional(
        visit.activity_level.as_deref(),
        "activity level",
        ActivityLevel::from_str,
    )?;

    let assessed_on = match visit.assessed_on {
        Some(ref d) => parse_iso_date(d)
            .ok_or_else(|| format!("assessed_on must be an ISO date (YYYY-MM-DD), got '{}'", d))?,
        None => Local::now().date_naive(),
    }
    .format("%Y-%m-%d")
    .to_string();

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let patient = Patient::get_by_id(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get patient: {}", e))?
        .ok_or_else(|| format!("Patient not found with id: {}", patient_id))?;
    let sex = patient.sex.ok_or_else(|| {
        format!(
            "Patient {} has no sex on file; update the patient (male/female) before recording an assessment",
            patient_id
        )
    })?;

    let record = AssessmentRecord::create(
        &conn,
        ctx,
        &AssessmentCreate {
            patient_id,
            assessed_on,
            measurement: input.with_sex(sex),
            objective,
            activity_level,
            sleep_hours: visit.sleep_hours,
            note: visit.note,
        },
    )
    .map_err(|e| format!("Failed to record assessment: {}", e))?;

    tracing::info!(
        event = "assessment_created",
        assessment_id = record.id,
        patient_id,
        user_id = ctx.user_id
    );
    Ok(record.into())
}

pub fn get_latest_assessment(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
) -> Result<Option<AssessmentDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let record = AssessmentRecord::latest_for_patient(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get assessment: {}", e))?;
    Ok(record.map(AssessmentDetail::from))
}

/// Assessment history, newest first
pub fn list_assessments(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
) -> Result<Vec<AssessmentRecord>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    AssessmentRecord::list_for_patient(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to list assessments: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientUpdate;
    use crate::tools::test_support::{seed_patient, test_db};

    fn input() -> MeasurementInput {
        MeasurementInput {
            weight_kg: Some(68.0),
            height_cm: Some(165.0),
            waist_cm: Some(80.0),
            hip_cm: Some(100.0),
            neck_cm: Some(33.0),
        }
    }

    #[test]
    fn test_preview_does_not_write() {
        let view = preview_assessment("F", &input()).unwrap();
        assert_eq!(view.composition.waist.status, CutoffStatus::Above);
        assert_eq!(view.interpretation.len(), 4);
        assert!(view.interpretation[0].starts_with("BMI 25.0"));

        assert!(preview_assessment("other", &input()).is_err());
    }

    #[test]
    fn test_preview_reports_unavailable() {
        let view = preview_assessment("male", &MeasurementInput::default()).unwrap();
        assert!(view.interpretation[0].contains("unavailable"));
        assert!(view.interpretation[3].contains("unavailable"));
    }

    #[test]
    fn test_record_uses_patient_sex() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);

        let detail = record_assessment(
            &db,
            &ctx,
            patient.id,
            &input(),
            AssessmentContext {
                assessed_on: Some("2025-01-10".to_string()),
                objective: Some("weight_loss".to_string()),
                activity_level: Some("light".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(detail.record.measurement.sex, Sex::Female);
        assert_eq!(detail.record.assessed_on, "2025-01-10");

        let latest = get_latest_assessment(&db, &ctx, patient.id).unwrap().unwrap();
        assert_eq!(latest.record.id, detail.record.id);
        assert_eq!(list_assessments(&db, &ctx, patient.id).unwrap().len(), 1);
    }

    #[test]
    fn test_record_requires_known_sex() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = db
            .with_conn(|conn| {
                Patient::create(
                    conn,
                    &ctx,
                    &crate::models::PatientCreate {
                        name: "Alex".to_string(),
                        ..Default::default()
                    },
                )
            })
            .unwrap();

        let err = record_assessment(&db, &ctx, patient.id, &input(), AssessmentContext::default())
            .unwrap_err();
        assert!(err.contains("no sex on file"));

        db.with_conn(|conn| {
            Patient::update(
                conn,
                &ctx,
                patient.id,
                &PatientUpdate {
                    sex: Some(Sex::Male),
                    ..Default::default()
                },
            )
        })
        .unwrap();
        assert!(record_assessment(&db, &ctx, patient.id, &input(), AssessmentContext::default()).is_ok());
    }

    #[test]
    fn test_record_rejects_bad_enums() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);

        let err = record_assessment(
            &db,
            &ctx,
            patient.id,
            &input(),
            AssessmentContext {
                activity_level: Some("couch".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("activity level"));
    }
}
