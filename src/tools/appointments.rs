//! Appointment MCP Tools
//!
//! The practitioner's agenda.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::RequestContext;
use crate::db::Database;
use crate::models::{Appointment, AppointmentCreate, AppointmentKind, AppointmentUpdate};

/// Response for list_appointments
#[derive(Debug, Serialize)]
pub struct ListAppointmentsResponse {
    pub appointments: Vec<Appointment>,
    pub total: usize,
}

/// Response for delete_appointment
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Normalize "2025-03-10 08:00", "2025-03-10T08:00" and full seconds to
/// "2025-03-10T08:00:00" so the agenda sorts as text
pub fn normalize_datetime(input: &str) -> Result<String, String> {
    let s = input.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    Err(format!(
        "Invalid datetime '{}'. Use YYYY-MM-DDTHH:MM[:SS]",
        input
    ))
}

fn parse_kind(kind: Option<&str>) -> Result<Option<AppointmentKind>, String> {
    match kind {
        None => Ok(None),
        Some(k) => AppointmentKind::from_str(k).map(Some).ok_or_else(|| {
            format!(
                "Invalid appointment kind '{}'. Use consultation, follow_up or reassessment",
                k
            )
        }),
    }
}

/// Schedule an appointment
pub fn schedule_appointment(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    scheduled_at: &str,
    kind: Option<&str>,
    notes: Option<String>,
) -> Result<Appointment, String> {
    let scheduled_at = normalize_datetime(scheduled_at)?;
    let kind = parse_kind(kind)?.unwrap_or_default();

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let appt = Appointment::create(
        &conn,
        ctx,
        &AppointmentCreate {
            patient_id,
            scheduled_at,
            kind,
            notes,
        },
    )
    .map_err(|e| format!("Failed to schedule appointment: {}", e))?;

    tracing::info!(
        event = "appointment_created",
        appointment_id = appt.id,
        patient_id,
        kind = appt.kind.as_str()
    );
    Ok(appt)
}

/// The agenda, optionally for one patient
pub fn list_appointments(
    db: &Database,
    ctx: &RequestContext,
    patient_id: Option<i64>,
) -> Result<ListAppointmentsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let appointments = Appointment::list(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to list appointments: {}", e))?;
    let total = appointments.len();
    Ok(ListAppointmentsResponse { appointments, total })
}

/// Reschedule or edit an appointment
pub fn update_appointment(
    db: &Database,
    ctx: &RequestContext,
    id: i64,
    scheduled_at: Option<&str>,
    kind: Option<&str>,
    notes: Option<String>,
) -> Result<Appointment, String> {
    let data = AppointmentUpdate {
        scheduled_at: scheduled_at.map(normalize_datetime).transpose()?,
        kind: parse_kind(kind)?,
        notes,
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Appointment::update(&conn, ctx, id, &data)
        .map_err(|e| format!("Failed to update appointment: {}", e))?
        .ok_or_else(|| format!("Appointment not found with id: {}", id))
}

pub fn delete_appointment(db: &Database, ctx: &RequestContext, id: i64) -> Result<DeleteResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = Appointment::delete(&conn, ctx, id)
        .map_err(|e| format!("Failed to delete appointment: {}", e))?;

    if !deleted {
        return Err(format!("Appointment not found with id: {}", id));
    }

    Ok(DeleteResponse {
        success: true,
        deleted_id: id,
    })
}
