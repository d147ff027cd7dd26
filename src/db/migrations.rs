//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- PATIENTS
        -- Owned by a practitioner (user_id)
        -- ============================================
        CREATE TABLE patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            phone TEXT,
            email TEXT,
            birthdate TEXT,                      -- ISO date: "1990-04-12"
            sex TEXT CHECK(sex IN ('male', 'female')),  -- NULL when not declared
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_patients_user ON patients(user_id);
        CREATE INDEX idx_patients_name ON patients(name);

        -- ============================================
        -- APPOINTMENTS
        -- ============================================
        CREATE TABLE appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            scheduled_at TEXT NOT NULL,          -- ISO datetime: "2025-03-10T08:00:00"
            kind TEXT NOT NULL CHECK(kind IN ('consultation', 'follow_up', 'reassessment')),
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_appointments_user ON appointments(user_id);
        CREATE INDEX idx_appointments_time ON appointments(scheduled_at);

        -- ============================================
        -- ASSESSMENTS
        -- One row per visit, never updated
        -- ============================================
        CREATE TABLE assessments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            assessed_on TEXT NOT NULL,           -- ISO date

            -- Measurement (0 = not provided)
            sex TEXT NOT NULL CHECK(sex IN ('male', 'female')),
            weight_kg REAL NOT NULL DEFAULT 0,
            height_cm REAL NOT NULL DEFAULT 0,
            waist_cm REAL NOT NULL DEFAULT 0,
            hip_cm REAL NOT NULL DEFAULT 0,
            neck_cm REAL NOT NULL DEFAULT 0,

            objective TEXT,
            activity_level TEXT,
            sleep_hours REAL,
            note TEXT,

            -- Computed at creation time
            bmi REAL,
            bmi_category TEXT,
            waist_cutoff_cm REAL NOT NULL,
            waist_status TEXT NOT NULL,
            waist_hip_cutoff REAL NOT NULL,
            waist_hip_ratio REAL,
            waist_hip_status TEXT NOT NULL,
            body_fat_pct REAL,

            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_assessments_patient ON assessments(patient_id, assessed_on);

        -- ============================================
        -- DIET TARGETS
        -- Latest row per patient is the active target
        -- ============================================
        CREATE TABLE diet_targets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            calculated_on TEXT NOT NULL,         -- ISO date
            bmr REAL NOT NULL,
            tdee REAL NOT NULL,
            activity_level TEXT NOT NULL,
            activity_factor REAL NOT NULL,
            goal TEXT NOT NULL,
            goal_adjustment REAL NOT NULL,
            target_calories REAL NOT NULL,
            protein_g_per_kg REAL NOT NULL,
            fat_fraction REAL NOT NULL,
            protein_g REAL NOT NULL,
            carb_g REAL NOT NULL,
            fat_g REAL NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_diet_targets_patient ON diet_targets(patient_id, calculated_on);

        -- ============================================
        -- FOODS
        -- Food composition table; nutrients per base_quantity_g, NULL = not measured
        -- ============================================
        CREATE TABLE foods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            base_quantity_g REAL DEFAULT 100,
            kcal REAL,
            protein_g REAL,
            carb_g REAL,
            fat_g REAL,
            fiber_g REAL,
            sodium_mg REAL
        );

        CREATE INDEX idx_foods_name ON foods(name);

        -- ============================================
        -- MEAL ITEMS
        -- A food and a consumed quantity placed in a meal of the patient's plan
        -- ============================================
        CREATE TABLE meal_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            diet_target_id INTEGER REFERENCES diet_targets(id) ON DELETE SET NULL,
            meal TEXT NOT NULL CHECK(meal IN (
                'breakfast', 'morning_snack', 'lunch', 'afternoon_snack', 'dinner', 'evening_snack'
            )),
            food_id INTEGER NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
            grams REAL NOT NULL CHECK(grams >= 0),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_meal_items_patient ON meal_items(patient_id, diet_target_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).unwrap());

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn meal_label_constraint_is_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO patients (user_id, name) VALUES (1, 'A')", [])
            .unwrap();
        conn.execute("INSERT INTO foods (name) VALUES ('Rice')", []).unwrap();

        let result = conn.execute(
            "INSERT INTO meal_items (user_id, patient_id, meal, food_id, grams)
             VALUES (1, 1, 'brunch', 1, 50)",
            [],
        );
        assert!(result.is_err());
    }
}
