//! Patient MCP Tools
//!
//! Registering patients and keeping their contact details current.

use chrono::Local;
use serde::Serialize;

use crate::config::RequestContext;
use crate::db::Database;
use crate::formulas::{age_from_birthdate, parse_iso_date};
use crate::models::{Patient, PatientCreate, PatientUpdate};

/// Patient with derived age
#[derive(Debug, Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub age_years: Option<u32>,
}

impl From<Patient> for PatientDetail {
    fn from(patient: Patient) -> Self {
        let today = Local::now().date_naive();
        let age_years = patient
            .birthdate
            .as_deref()
            .and_then(|b| age_from_birthdate(b, today));
        Self { patient, age_years }
    }
}

/// Summary of a patient for list results
#[derive(Debug, Serialize)]
pub struct PatientSummary {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub sex: Option<&'static str>,
}

impl From<&Patient> for PatientSummary {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            phone: p.phone.clone(),
            email: p.email.clone(),
            sex: p.sex.map(|s| s.as_str()),
        }
    }
}

/// Response for list_patients
#[derive(Debug, Serialize)]
pub struct ListPatientsResponse {
    pub patients: Vec<PatientSummary>,
    pub total: usize,
}

fn validate_birthdate(birthdate: Option<&str>) -> Result<(), String> {
    match birthdate {
        Some(b) if parse_iso_date(b).is_none() => Err(format!(
            "birthdate must be an ISO date (YYYY-MM-DD), got '{}'",
            b
        )),
        _ => Ok(()),
    }
}

/// Register a new patient
pub fn add_patient(
    db: &Database,
    ctx: &RequestContext,
    data: PatientCreate,
) -> Result<PatientDetail, String> {
    if data.name.trim().is_empty() {
        return Err("Patient name cannot be empty".to_string());
    }
    validate_birthdate(data.birthdate.as_deref())?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let patient = Patient::create(&conn, ctx, &data)
        .map_err(|e| format!("Failed to create patient: {}", e))?;

    tracing::info!(event = "patient_created", patient_id = patient.id, user_id = ctx.user_id);
    Ok(patient.into())
}

/// Update a patient's details
pub fn update_patient(
    db: &Database,
    ctx: &RequestContext,
    id: i64,
    data: PatientUpdate,
) -> Result<PatientDetail, String> {
    if let Some(ref name) = data.name {
        if name.trim().is_empty() {
            return Err("Patient name cannot be empty".to_string());
        }
    }
    validate_birthdate(data.birthdate.as_deref())?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let updated = Patient::update(&conn, ctx, id, &data)
        .map_err(|e| format!("Failed to update patient: {}", e))?;

    match updated {
        Some(patient) => Ok(patient.into()),
        None => Err(format!("Patient not found with id: {}", id)),
    }
}

/// Get a patient by ID
pub fn get_patient(db: &Database, ctx: &RequestContext, id: i64) -> Result<Option<PatientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let patient = Patient::get_by_id(&conn, ctx, id)
        .map_err(|e| format!("Failed to get patient: {}", e))?;
    Ok(patient.map(PatientDetail::from))
}

/// List patients, optionally filtered by name
pub fn list_patients(
    db: &Database,
    ctx: &RequestContext,
    name_filter: Option<&str>,
) -> Result<ListPatientsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let patients = Patient::list(&conn, ctx, name_filter)
        .map_err(|e| format!("Failed to list patients: {}", e))?;

    let summaries: Vec<PatientSummary> = patients.iter().map(PatientSummary::from).collect();
    let total = summaries.len();

    Ok(ListPatientsResponse {
        patients: summaries,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulas::Sex;
    use crate::tools::test_support::test_db;

    #[test]
    fn test_add_patient_validates() {
        let db = test_db();
        let ctx = RequestContext::new(1);

        let empty = add_patient(&db, &ctx, PatientCreate::default());
        assert!(empty.is_err());

        let bad_date = add_patient(
            &db,
            &ctx,
            PatientCreate {
                name: "Ana".to_string(),
                birthdate: Some("12/04/1990".to_string()),
                ..Default::default()
            },
        );
        assert!(bad_date.unwrap_err().contains("ISO date"));
    }

    #[test]
    fn test_add_get_list() {
        let db = test_db();
        let ctx = RequestContext::new(1);

        let added = add_patient(
            &db,
            &ctx,
            PatientCreate {
                name: "Ana".to_string(),
                birthdate: Some("1990-04-12".to_string()),
                sex: Some(Sex::Female),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(added.age_years.is_some());

        let fetched = get_patient(&db, &ctx, added.patient.id).unwrap().unwrap();
        assert_eq!(fetched.patient.name, "Ana");

        let list = list_patients(&db, &ctx, None).unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.patients[0].sex, Some("female"));

        assert!(get_patient(&db, &RequestContext::new(2), added.patient.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_missing_patient() {
        let db = test_db();
        let result = update_patient(
            &db,
            &RequestContext::new(1),
            42,
            PatientUpdate {
                phone: Some("1".to_string()),
                ..Default::default()
            },
        );
        assert!(result.unwrap_err().contains("not found"));
    }
}
