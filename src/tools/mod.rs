//! NutriPlan Tools module
//!
//! Use cases behind the MCP tool surface. Each function takes the database
//! and, for patient data, the requesting practitioner's context.

pub mod appointments;
pub mod assessments;
pub mod diets;
pub mod foods;
pub mod meal_plan;
pub mod patients;
pub mod reports;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::RequestContext;
    use crate::db::migrations::run_migrations;
    use crate::db::Database;
    use crate::formulas::Sex;
    use crate::models::{FoodProfile, FoodProfileCreate, Patient, PatientCreate};

    pub fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| run_migrations(conn)).unwrap();
        db
    }

    /// A female patient born 1990-04-12, owned by `ctx`
    pub fn seed_patient(db: &Database, ctx: &RequestContext) -> Patient {
        db.with_conn(|conn| {
            Patient::create(
                conn,
                ctx,
                &PatientCreate {
                    name: "Maria Souza".to_string(),
                    birthdate: Some("1990-04-12".to_string()),
                    sex: Some(Sex::Female),
                    ..Default::default()
                },
            )
        })
        .unwrap()
    }

    pub fn seed_food(db: &Database, name: &str, kcal: f64, protein: f64, carb: f64, fat: f64) -> FoodProfile {
        db.with_conn(|conn| {
            FoodProfile::create(
                conn,
                &FoodProfileCreate {
                    name: name.to_string(),
                    base_quantity_g: Some(100.0),
                    kcal: Some(kcal),
                    protein_g: Some(protein),
                    carb_g: Some(carb),
                    fat_g: Some(fat),
                    fiber_g: None,
                    sodium_mg: None,
                },
            )
        })
        .unwrap()
    }
}
