//! Food composition model
//!
//! One row of an imported food table (TACO or similar). Nutrients are given
//! per `base_quantity_g`; a missing value means "not measured".

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Default reference mass for a nutrient profile
pub const DEFAULT_BASE_QUANTITY_G: f64 = 100.0;

/// A food and its nutrient profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodProfile {
    pub id: i64,
    pub name: String,
    pub base_quantity_g: Option<f64>,
    pub kcal: Option<f64>,
    pub protein_g: Option<f64>,
    pub carb_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sodium_mg: Option<f64>,
}

/// Data for inserting a food
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodProfileCreate {
    pub name: String,
    pub base_quantity_g: Option<f64>,
    pub kcal: Option<f64>,
    pub protein_g: Option<f64>,
    pub carb_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sodium_mg: Option<f64>,
}

impl FoodProfile {
    /// Create a FoodProfile from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            base_quantity_g: row.get("base_quantity_g")?,
            kcal: row.get("kcal")?,
            protein_g: row.get("protein_g")?,
            carb_g: row.get("carb_g")?,
            fat_g: row.get("fat_g")?,
            fiber_g: row.get("fiber_g")?,
            sodium_mg: row.get("sodium_mg")?,
        })
    }

    /// Insert one food
    pub fn create(conn: &Connection, data: &FoodProfileCreate) -> DbResult<Self> {
        insert(conn, data)?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(crate::db::DbError::NotFound { entity: "Food", id })
    }

    /// Insert a batch of foods in one transaction.
    /// Rows with a blank name are skipped; returns the number inserted.
    pub fn insert_many(conn: &mut Connection, rows: &[FoodProfileCreate]) -> DbResult<usize> {
        let tx = conn.transaction()?;
        let mut inserted = 0;

        for row in rows {
            if row.name.trim().is_empty() {
                continue;
            }
            insert(&tx, row)?;
            inserted += 1;
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Get a food by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM foods WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(food) => Ok(Some(food)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive substring search on name. `%` and `_` match literally.
    /// An empty query returns nothing; `limit` is clamped to 1..=100.
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let search_pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let limit = limit.clamp(1, 100);

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM foods
            WHERE lower(name) LIKE ?1 ESCAPE '\'
            ORDER BY name ASC
            LIMIT ?2
            "#,
        )?;

        let foods = stmt
            .query_map(params![search_pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(foods)
    }

    /// Count foods in the table
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete every food (and, by cascade, every meal item that used one).
    /// Returns the number of foods removed.
    pub fn clear(conn: &Connection) -> DbResult<usize> {
        let rows = conn.execute("DELETE FROM foods", [])?;
        Ok(rows)
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn insert(conn: &Connection, data: &FoodProfileCreate) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO foods (
            name, base_quantity_g, kcal, protein_g, carb_g, fat_g, fiber_g, sodium_mg
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            data.name.trim(),
            data.base_quantity_g.unwrap_or(DEFAULT_BASE_QUANTITY_G),
            data.kcal,
            data.protein_g,
            data.carb_g,
            data.fat_g,
            data.fiber_g,
            data.sodium_mg,
        ],
    )?;
    Ok(())
}
