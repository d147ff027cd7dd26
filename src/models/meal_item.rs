//! Meal item model
//!
//! A food and a consumed quantity placed in one meal of a patient's plan.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::FoodProfile;
use crate::config::RequestContext;
use crate::db::{DbError, DbResult};

/// The meals of a day, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealLabel {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
    EveningSnack,
}

impl MealLabel {
    pub const ALL: [MealLabel; 6] = [
        MealLabel::Breakfast,
        MealLabel::MorningSnack,
        MealLabel::Lunch,
        MealLabel::AfternoonSnack,
        MealLabel::Dinner,
        MealLabel::EveningSnack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealLabel::Breakfast => "breakfast",
            MealLabel::MorningSnack => "morning_snack",
            MealLabel::Lunch => "lunch",
            MealLabel::AfternoonSnack => "afternoon_snack",
            MealLabel::Dinner => "dinner",
            MealLabel::EveningSnack => "evening_snack",
        }
    }

    /// Accepts storage keys, English display names and the Portuguese meal names
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "breakfast" | "café_da_manhã" | "cafe_da_manha" => Some(MealLabel::Breakfast),
            "morning_snack" | "lanche_manhã" | "lanche_manha" => Some(MealLabel::MorningSnack),
            "lunch" | "almoço" | "almoco" => Some(MealLabel::Lunch),
            "afternoon_snack" | "lanche_tarde" => Some(MealLabel::AfternoonSnack),
            "dinner" | "jantar" => Some(MealLabel::Dinner),
            "evening_snack" | "supper" | "ceia" => Some(MealLabel::EveningSnack),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MealLabel::Breakfast => "Breakfast",
            MealLabel::MorningSnack => "Morning snack",
            MealLabel::Lunch => "Lunch",
            MealLabel::AfternoonSnack => "Afternoon snack",
            MealLabel::Dinner => "Dinner",
            MealLabel::EveningSnack => "Evening snack",
        }
    }
}

/// A meal item joined with its food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    pub id: i64,
    pub patient_id: i64,
    pub diet_target_id: Option<i64>,
    pub meal: MealLabel,
    pub food: FoodProfile,
    pub grams: f64,
    pub created_at: String,
}

/// Data for creating a meal item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItemCreate {
    pub patient_id: i64,
    pub diet_target_id: Option<i64>,
    pub meal: MealLabel,
    pub food_id: i64,
    pub grams: f64,
}

const SELECT_JOINED: &str = r#"
    SELECT mi.id, mi.patient_id, mi.diet_target_id, mi.meal, mi.grams, mi.created_at,
           f.id AS food_id, f.name, f.base_quantity_g, f.kcal, f.protein_g, f.carb_g,
           f.fat_g, f.fiber_g, f.sodium_mg
    FROM meal_items mi
    INNER JOIN foods f ON f.id = mi.food_id
"#;

impl MealItem {
    /// Create from a joined row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let meal_str: String = row.get("meal")?;
        let meal = MealLabel::from_str(&meal_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown meal label: {}", meal_str).into(),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            diet_target_id: row.get("diet_target_id")?,
            meal,
            food: FoodProfile {
                id: row.get("food_id")?,
                name: row.get("name")?,
                base_quantity_g: row.get("base_quantity_g")?,
                kcal: row.get("kcal")?,
                protein_g: row.get("protein_g")?,
                carb_g: row.get("carb_g")?,
                fat_g: row.get("fat_g")?,
                fiber_g: row.get("fiber_g")?,
                sodium_mg: row.get("sodium_mg")?,
            },
            grams: row.get("grams")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Add a food to a patient's meal
    pub fn create(conn: &Connection, ctx: &RequestContext, data: &MealItemCreate) -> DbResult<Self> {
        if !data.grams.is_finite() || data.grams < 0.0 {
            return Err(DbError::Invalid(format!(
                "grams must be zero or positive, got {}",
                data.grams
            )));
        }
        if FoodProfile::get_by_id(conn, data.food_id)?.is_none() {
            return Err(DbError::NotFound {
                entity: "Food",
                id: data.food_id,
            });
        }

        conn.execute(
            r#"
            INSERT INTO meal_items (user_id, patient_id, diet_target_id, meal, food_id, grams)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                ctx.user_id,
                data.patient_id,
                data.diet_target_id,
                data.meal.as_str(),
                data.food_id,
                data.grams,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, ctx, id)?.ok_or(DbError::NotFound {
            entity: "Meal item",
            id,
        })
    }

    /// Get a meal item by ID
    pub fn get_by_id(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE mi.id = ?1 AND mi.user_id = ?2", SELECT_JOINED);
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt.query_row(params![id, ctx.user_id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Items of a patient's plan, ordered by meal then creation.
    /// With `diet_target_id` only the items attached to that target are returned.
    pub fn list_for_patient(
        conn: &Connection,
        ctx: &RequestContext,
        patient_id: i64,
        diet_target_id: Option<i64>,
    ) -> DbResult<Vec<Self>> {
        let mut items = if let Some(target_id) = diet_target_id {
            let sql = format!(
                "{} WHERE mi.user_id = ?1 AND mi.patient_id = ?2 AND mi.diet_target_id = ?3 ORDER BY mi.id",
                SELECT_JOINED
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![ctx.user_id, patient_id, target_id], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let sql = format!(
                "{} WHERE mi.user_id = ?1 AND mi.patient_id = ?2 ORDER BY mi.id",
                SELECT_JOINED
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![ctx.user_id, patient_id], Self::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        // Stored labels sort alphabetically, so order by the enum instead.
        items.sort_by_key(|item| (item.meal, item.id));
        Ok(items)
    }

    /// Delete a meal item.
    /// Returns Ok(true) if deleted, Ok(false) if not found for this user
    pub fn delete(conn: &Connection, ctx: &RequestContext, id: i64) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM meal_items WHERE id = ?1 AND user_id = ?2",
            params![id, ctx.user_id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::FoodProfileCreate;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO patients (user_id, name) VALUES (1, 'Ana')", [])
            .unwrap();
        for name in ["Arroz", "Feijão"] {
            FoodProfile::create(
                &conn,
                &FoodProfileCreate {
                    name: name.to_string(),
                    kcal: Some(100.0),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        conn
    }

    fn add(conn: &Connection, ctx: &RequestContext, meal: MealLabel, food_id: i64) -> MealItem {
        MealItem::create(
            conn,
            ctx,
            &MealItemCreate {
                patient_id: 1,
                diet_target_id: None,
                meal,
                food_id,
                grams: 100.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_list_orders_by_meal_then_insertion() {
        let conn = setup();
        let ctx = RequestContext::new(1);

        add(&conn, &ctx, MealLabel::Dinner, 1);
        add(&conn, &ctx, MealLabel::Breakfast, 2);
        add(&conn, &ctx, MealLabel::Dinner, 2);
        add(&conn, &ctx, MealLabel::Breakfast, 1);

        let items = MealItem::list_for_patient(&conn, &ctx, 1, None).unwrap();
        let order: Vec<_> = items.iter().map(|i| (i.meal, i.food.id)).collect();
        assert_eq!(
            order,
            vec![
                (MealLabel::Breakfast, 2),
                (MealLabel::Breakfast, 1),
                (MealLabel::Dinner, 1),
                (MealLabel::Dinner, 2),
            ]
        );
    }

    #[test]
    fn test_create_validates_inputs() {
        let conn = setup();
        let ctx = RequestContext::new(1);

        let negative = MealItem::create(
            &conn,
            &ctx,
            &MealItemCreate {
                patient_id: 1,
                diet_target_id: None,
                meal: MealLabel::Lunch,
                food_id: 1,
                grams: -5.0,
            },
        );
        assert!(matches!(negative, Err(DbError::Invalid(_))));

        let missing_food = MealItem::create(
            &conn,
            &ctx,
            &MealItemCreate {
                patient_id: 1,
                diet_target_id: None,
                meal: MealLabel::Lunch,
                food_id: 99,
                grams: 50.0,
            },
        );
        assert!(matches!(missing_food, Err(DbError::NotFound { .. })));
    }

    #[test]
    fn test_delete_is_scoped_by_user() {
        let conn = setup();
        let owner = RequestContext::new(1);
        let other = RequestContext::new(2);

        let item = add(&conn, &owner, MealLabel::Lunch, 1);
        assert!(!MealItem::delete(&conn, &other, item.id).unwrap());
        assert!(MealItem::list_for_patient(&conn, &other, 1, None).unwrap().is_empty());
        assert!(MealItem::delete(&conn, &owner, item.id).unwrap());
        assert!(MealItem::get_by_id(&conn, &owner, item.id).unwrap().is_none());
    }

    #[test]
    fn test_meal_label_order_and_names() {
        let mut labels = MealLabel::ALL.to_vec();
        labels.reverse();
        labels.sort();
        assert_eq!(labels, MealLabel::ALL.to_vec());
        assert_eq!(MealLabel::from_str("Almoço"), Some(MealLabel::Lunch));
        assert_eq!(MealLabel::from_str("Café da manhã"), Some(MealLabel::Breakfast));
        assert_eq!(MealLabel::from_str("Afternoon snack"), Some(MealLabel::AfternoonSnack));
        assert_eq!(MealLabel::from_str("brunch"), None);
    }
}
