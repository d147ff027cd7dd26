//! Appointment model
//!
//! Scheduled visits. Listings carry the patient's name for the agenda view.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::db::{DbError, DbResult};

/// Kind of visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    #[default]
    Consultation,
    FollowUp,
    Reassessment,
}

impl AppointmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentKind::Consultation => "consultation",
            AppointmentKind::FollowUp => "follow_up",
            AppointmentKind::Reassessment => "reassessment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "consultation" | "consulta" => Some(AppointmentKind::Consultation),
            "follow_up" | "followup" | "retorno" => Some(AppointmentKind::FollowUp),
            "reassessment" | "reavaliação" | "reavaliacao" => Some(AppointmentKind::Reassessment),
            _ => None,
        }
    }
}

/// An appointment with its patient's name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    /// ISO datetime
    pub scheduled_at: String,
    pub kind: AppointmentKind,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Data for creating an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentCreate {
    pub patient_id: i64,
    pub scheduled_at: String,
    pub kind: AppointmentKind,
    pub notes: Option<String>,
}

/// Data for updating an appointment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub scheduled_at: Option<String>,
    pub kind: Option<AppointmentKind>,
    pub notes: Option<String>,
}

const SELECT_JOINED: &str = r#"
    SELECT a.id, a.patient_id, p.name AS patient_name, a.scheduled_at, a.kind, a.notes,
           a.created_at
    FROM appointments a
    INNER JOIN patients p ON p.id = a.patient_id
"#;

impl Appointment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind: String = row.get("kind")?;
        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            patient_name: row.get("patient_name")?,
            scheduled_at: row.get("scheduled_at")?,
            kind: AppointmentKind::from_str(&kind).unwrap_or_default(),
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Schedule an appointment for one of the user's patients
    pub fn create(conn: &Connection, ctx: &RequestContext, data: &AppointmentCreate) -> DbResult<Self> {
        let owned: i64 = conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE id = ?1 AND user_id = ?2",
            params![data.patient_id, ctx.user_id],
            |row| row.get(0),
        )?;
        if owned == 0 {
            return Err(DbError::NotFound {
                entity: "Patient",
                id: data.patient_id,
            });
        }

        conn.execute(
            r#"
            INSERT INTO appointments (user_id, patient_id, scheduled_at, kind, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                ctx.user_id,
                data.patient_id,
                data.scheduled_at,
                data.kind.as_str(),
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, ctx, id)?.ok_or(DbError::NotFound { entity: "Appointment", id })
    }

    pub fn get_by_id(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE a.id = ?1 AND a.user_id = ?2", SELECT_JOINED);
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt.query_row(params![id, ctx.user_id], Self::from_row);
        match result {
            Ok(appt) => Ok(Some(appt)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The user's agenda in chronological order, optionally for one patient
    pub fn list(conn: &Connection, ctx: &RequestContext, patient_id: Option<i64>) -> DbResult<Vec<Self>> {
        let appointments = if let Some(pid) = patient_id {
            let sql = format!(
                "{} WHERE a.user_id = ?1 AND a.patient_id = ?2 ORDER BY a.scheduled_at ASC, a.id ASC",
                SELECT_JOINED
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![ctx.user_id, pid], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let sql = format!(
                "{} WHERE a.user_id = ?1 ORDER BY a.scheduled_at ASC, a.id ASC",
                SELECT_JOINED
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![ctx.user_id], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        Ok(appointments)
    }

    /// Reschedule or edit an appointment
    pub fn update(
        conn: &Connection,
        ctx: &RequestContext,
        id: i64,
        data: &AppointmentUpdate,
    ) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref at) = data.scheduled_at {
            updates.push(format!("scheduled_at = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(at.clone()));
        }
        if let Some(kind) = data.kind {
            updates.push(format!("kind = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, ctx, id);
        }

        let sql = format!(
            "UPDATE appointments SET {} WHERE id = ?{} AND user_id = ?{}",
            updates.join(", "),
            params_vec.len() + 1,
            params_vec.len() + 2
        );
        params_vec.push(Box::new(id));
        params_vec.push(Box::new(ctx.user_id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, ctx, id)
    }

    /// Returns Ok(true) if deleted, Ok(false) if not found for this user
    pub fn delete(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM appointments WHERE id = ?1 AND user_id = ?2",
            params![id, ctx.user_id],
        )?;
        Ok(rows > 0)
    }
}
