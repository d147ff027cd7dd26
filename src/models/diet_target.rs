//! Diet target model
//!
//! A saved energy/macro calculation. The most recent one is the patient's
//! active target.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::db::{DbError, DbResult};
use crate::formulas::energy::KCAL_PER_G_PROTEIN;
use crate::formulas::{shortfall_message, ActivityLevel, DietCalculation, Goal};

/// A stored diet target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietTarget {
    pub id: i64,
    pub patient_id: i64,
    /// ISO date
    pub calculated_on: String,
    pub bmr: f64,
    pub tdee: f64,
    pub activity_level: ActivityLevel,
    pub activity_factor: f64,
    pub goal: Goal,
    pub goal_adjustment: f64,
    pub target_calories: f64,
    pub protein_g_per_kg: f64,
    pub fat_fraction: f64,
    pub protein_g: f64,
    pub carb_g: f64,
    pub fat_g: f64,
    pub created_at: String,
}

fn conversion_error(col: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        col,
        rusqlite::types::Type::Text,
        format!("unknown {}: {}", what, value).into(),
    )
}

impl DietTarget {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let activity: String = row.get("activity_level")?;
        let goal: String = row.get("goal")?;

        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            calculated_on: row.get("calculated_on")?,
            bmr: row.get("bmr")?,
            tdee: row.get("tdee")?,
            activity_level: ActivityLevel::from_str(&activity)
                .ok_or_else(|| conversion_error(6, "activity level", &activity))?,
            activity_factor: row.get("activity_factor")?,
            goal: Goal::from_str(&goal).ok_or_else(|| conversion_error(8, "goal", &goal))?,
            goal_adjustment: row.get("goal_adjustment")?,
            target_calories: row.get("target_calories")?,
            protein_g_per_kg: row.get("protein_g_per_kg")?,
            fat_fraction: row.get("fat_fraction")?,
            protein_g: row.get("protein_g")?,
            carb_g: row.get("carb_g")?,
            fat_g: row.get("fat_g")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Store a calculation as the patient's newest target
    pub fn create(
        conn: &Connection,
        ctx: &RequestContext,
        patient_id: i64,
        calculated_on: &str,
        calc: &DietCalculation,
    ) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO diet_targets (
                user_id, patient_id, calculated_on, bmr, tdee,
                activity_level, activity_factor, goal, goal_adjustment, target_calories,
                protein_g_per_kg, fat_fraction, protein_g, carb_g, fat_g
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                ctx.user_id,
                patient_id,
                calculated_on,
                calc.bmr,
                calc.tdee,
                calc.activity_level.as_str(),
                calc.activity_factor,
                calc.goal.as_str(),
                calc.goal_adjustment,
                calc.target_calories,
                calc.protein_g_per_kg,
                calc.fat_fraction,
                calc.macros.protein_g,
                calc.macros.carb_g,
                calc.macros.fat_g,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, ctx, id)?.ok_or(DbError::NotFound { entity: "Diet target", id })
    }

    pub fn get_by_id(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diet_targets WHERE id = ?1 AND user_id = ?2")?;

        let result = stmt.query_row(params![id, ctx.user_id], Self::from_row);
        match result {
            Ok(target) => Ok(Some(target)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// kcal by which protein and fat alone overshoot the stored target
    pub fn shortfall_kcal(&self) -> f64 {
        let remainder = self.target_calories
            - self.protein_g * KCAL_PER_G_PROTEIN
            - self.target_calories * self.fat_fraction;
        if self.carb_g > 0.0 {
            0.0
        } else {
            (-remainder).max(0.0)
        }
    }

    pub fn shortfall_warning(&self) -> Option<String> {
        let shortfall = self.shortfall_kcal();
        (shortfall > 0.0).then(|| shortfall_message(self.target_calories, shortfall))
    }

    /// The active target: latest by date, then by insertion
    pub fn latest_for_patient(
        conn: &Connection,
        ctx: &RequestContext,
        patient_id: i64,
    ) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM diet_targets
            WHERE patient_id = ?1 AND user_id = ?2
            ORDER BY calculated_on DESC, id DESC
            LIMIT 1
            "#,
        )?;

        let result = stmt.query_row(params![patient_id, ctx.user_id], Self::from_row);
        match result {
            Ok(target) => Ok(Some(target)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Target history, newest first
    pub fn list_for_patient(
        conn: &Connection,
        ctx: &RequestContext,
        patient_id: i64,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM diet_targets
            WHERE patient_id = ?1 AND user_id = ?2
            ORDER BY calculated_on DESC, id DESC
            "#,
        )?;

        let targets = stmt
            .query_map(params![patient_id, ctx.user_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(targets)
    }
}
