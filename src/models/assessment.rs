//! Assessment model
//!
//! One row per visit. The body composition indices are computed when the row
//! is created and stored alongside the raw measurement; rows are never updated.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::db::{DbError, DbResult};
use crate::formulas::{
    ActivityLevel, BmiCategory, BodyComposition, CutoffStatus, Measurement, Objective, Sex,
    WaistHipRatio, WaistStatus,
};

/// A stored assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: i64,
    pub patient_id: i64,
    /// ISO date
    pub assessed_on: String,
    pub measurement: Measurement,
    pub objective: Option<Objective>,
    pub activity_level: Option<ActivityLevel>,
    pub sleep_hours: Option<f64>,
    pub note: Option<String>,
    pub composition: BodyComposition,
    pub created_at: String,
}

/// Data for recording an assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentCreate {
    pub patient_id: i64,
    pub assessed_on: String,
    pub measurement: Measurement,
    pub objective: Option<Objective>,
    pub activity_level: Option<ActivityLevel>,
    pub sleep_hours: Option<f64>,
    pub note: Option<String>,
}

impl AssessmentRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let sex: String = row.get("sex")?;
        let sex = Sex::from_str(&sex).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown sex: {}", sex).into(),
            )
        })?;

        let objective: Option<String> = row.get("objective")?;
        let activity_level: Option<String> = row.get("activity_level")?;
        let bmi_category: Option<String> = row.get("bmi_category")?;
        let waist_status: String = row.get("waist_status")?;
        let waist_hip_status: String = row.get("waist_hip_status")?;

        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            assessed_on: row.get("assessed_on")?,
            measurement: Measurement {
                sex,
                weight_kg: row.get("weight_kg")?,
                height_cm: row.get("height_cm")?,
                waist_cm: row.get("waist_cm")?,
                hip_cm: row.get("hip_cm")?,
                neck_cm: row.get("neck_cm")?,
            },
            objective: objective.as_deref().and_then(Objective::from_str),
            activity_level: activity_level.as_deref().and_then(ActivityLevel::from_str),
            sleep_hours: row.get("sleep_hours")?,
            note: row.get("note")?,
            composition: BodyComposition {
                bmi: row.get("bmi")?,
                bmi_category: bmi_category.as_deref().and_then(BmiCategory::from_str),
                waist: WaistStatus {
                    cutoff_cm: row.get("waist_cutoff_cm")?,
                    status: CutoffStatus::from_str(&waist_status),
                },
                waist_hip: WaistHipRatio {
                    cutoff: row.get("waist_hip_cutoff")?,
                    ratio: row.get("waist_hip_ratio")?,
                    status: CutoffStatus::from_str(&waist_hip_status),
                },
                body_fat_pct: row.get("body_fat_pct")?,
            },
            created_at: row.get("created_at")?,
        })
    }

    /// Compute the indices for a measurement and store the visit
    pub fn create(conn: &Connection, ctx: &RequestContext, data: &AssessmentCreate) -> DbResult<Self> {
        let m = &data.measurement;
        let bc = BodyComposition::compute(m);

        conn.execute(
            r#"
            INSERT INTO assessments (
                user_id, patient_id, assessed_on,
                sex, weight_kg, height_cm, waist_cm, hip_cm, neck_cm,
                objective, activity_level, sleep_hours, note,
                bmi, bmi_category, waist_cutoff_cm, waist_status,
                waist_hip_cutoff, waist_hip_ratio, waist_hip_status, body_fat_pct
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
            )
            "#,
            params![
                ctx.user_id,
                data.patient_id,
                data.assessed_on,
                m.sex.as_str(),
                m.weight_kg.max(0.0),
                m.height_cm.max(0.0),
                m.waist_cm.max(0.0),
                m.hip_cm.max(0.0),
                m.neck_cm.max(0.0),
                data.objective.map(|o| o.as_str()),
                data.activity_level.map(|a| a.as_str()),
                data.sleep_hours,
                data.note,
                bc.bmi,
                bc.bmi_category.map(|c| c.as_str()),
                bc.waist.cutoff_cm,
                bc.waist.status.as_str(),
                bc.waist_hip.cutoff,
                bc.waist_hip.ratio,
                bc.waist_hip.status.as_str(),
                bc.body_fat_pct,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, ctx, id)?.ok_or(DbError::NotFound { entity: "Assessment", id })
    }

    pub fn get_by_id(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM assessments WHERE id = ?1 AND user_id = ?2")?;

        let result = stmt.query_row(params![id, ctx.user_id], Self::from_row);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent assessment by date; same-day ties go to the later insert
    pub fn latest_for_patient(
        conn: &Connection,
        ctx: &RequestContext,
        patient_id: i64,
    ) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM assessments
            WHERE patient_id = ?1 AND user_id = ?2
            ORDER BY assessed_on DESC, id DESC
            LIMIT 1
            "#,
        )?;

        let result = stmt.query_row(params![patient_id, ctx.user_id], Self::from_row);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Assessment history, newest first
    pub fn list_for_patient(
        conn: &Connection,
        ctx: &RequestContext,
        patient_id: i64,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM assessments
            WHERE patient_id = ?1 AND user_id = ?2
            ORDER BY assessed_on DESC, id DESC
            "#,
        )?;

        let records = stmt
            .query_map(params![patient_id, ctx.user_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
