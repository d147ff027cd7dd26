//! Patient model
//!
//! Patients belong to the practitioner (`user_id`) who registered them.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::db::{DbError, DbResult};
use crate::formulas::Sex;

/// A patient record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// ISO date
    pub birthdate: Option<String>,
    pub sex: Option<Sex>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a patient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientCreate {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub sex: Option<Sex>,
    pub notes: Option<String>,
}

/// Data for updating a patient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub sex: Option<Sex>,
    pub notes: Option<String>,
}

impl Patient {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let sex: Option<String> = row.get("sex")?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            birthdate: row.get("birthdate")?,
            sex: sex.as_deref().and_then(Sex::from_str),
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new patient
    pub fn create(conn: &Connection, ctx: &RequestContext, data: &PatientCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO patients (user_id, name, phone, email, birthdate, sex, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                ctx.user_id,
                data.name.trim(),
                data.phone,
                data.email,
                data.birthdate,
                data.sex.map(|s| s.as_str()),
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, ctx, id)?.ok_or(DbError::NotFound { entity: "Patient", id })
    }

    /// Get a patient by ID, if it belongs to the requesting user
    pub fn get_by_id(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM patients WHERE id = ?1 AND user_id = ?2")?;

        let result = stmt.query_row(params![id, ctx.user_id], Self::from_row);
        match result {
            Ok(patient) => Ok(Some(patient)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List the user's patients by name, optionally filtered by a name substring
    pub fn list(conn: &Connection, ctx: &RequestContext, name_filter: Option<&str>) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", name_filter.unwrap_or("").trim());
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM patients
            WHERE user_id = ?1 AND name LIKE ?2
            ORDER BY name COLLATE NOCASE ASC, id ASC
            "#,
        )?;

        let patients = stmt
            .query_map(params![ctx.user_id, pattern], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    /// Update a patient
    pub fn update(
        conn: &Connection,
        ctx: &RequestContext,
        id: i64,
        data: &PatientUpdate,
    ) -> DbResult<Option<Self>> {
        // Build dynamic UPDATE query
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(name, "name");
        add_update!(phone, "phone");
        add_update!(email, "email");
        add_update!(birthdate, "birthdate");
        add_update!(notes, "notes");

        if let Some(sex) = data.sex {
            updates.push(format!("sex = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(sex.as_str().to_string()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, ctx, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE patients SET {} WHERE id = ?{} AND user_id = ?{}",
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
}
