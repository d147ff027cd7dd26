//! Meal plan MCP Tools
//!
//! Building a patient's day of meals and checking it against the diet target.
//! New items attach to the active diet target; the plan shown is the one of
//! the active target (or every item when no target has been saved yet).

use serde::Serialize;

use crate::config::RequestContext;
use crate::db::Database;
use crate::models::{DietTarget, MealItem, MealItemCreate, MealLabel, Nutrition, Patient};
use crate::nutrition::{aggregate, compare_to_target, scale, DayTotals, MacroTargets, TargetDelta};

/// Response for add_meal_item
#[derive(Debug, Serialize)]
pub struct AddMealItemResponse {
    pub id: i64,
    pub meal: MealLabel,
    pub food_name: String,
    pub grams: f64,
    pub diet_target_id: Option<i64>,
    pub nutrition: Nutrition,
}

/// Response for delete_meal_item
#[derive(Debug, Serialize)]
pub struct DeleteMealItemResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Response for get_meal_plan
#[derive(Debug, Serialize)]
pub struct MealPlanResponse {
    pub patient_id: i64,
    pub patient_name: String,
    pub diet_target: Option<DietTarget>,
    pub item_count: usize,
    pub totals: DayTotals,
    pub delta_to_target: Option<TargetDelta>,
}

/// The plan behind a report or a get_meal_plan call
#[derive(Debug)]
pub struct MealPlan {
    pub patient: Patient,
    pub diet_target: Option<DietTarget>,
    pub items: Vec<MealItem>,
    pub totals: DayTotals,
    pub delta_to_target: Option<TargetDelta>,
}

/// Load the plan for a target (default: the active one) and aggregate it
pub fn load_meal_plan(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    diet_target_id: Option<i64>,
) -> Result<MealPlan, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let patient = Patient::get_by_id(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get patient: {}", e))?
        .ok_or_else(|| format!("Patient not found with id: {}", patient_id))?;

    let diet_target = match diet_target_id {
        Some(id) => Some(
            DietTarget::get_by_id(&conn, ctx, id)
                .map_err(|e| format!("Failed to get diet target: {}", e))?
                .filter(|t| t.patient_id == patient_id)
                .ok_or_else(|| format!("Diet target not found with id: {}", id))?,
        ),
        None => DietTarget::latest_for_patient(&conn, ctx, patient_id)
            .map_err(|e| format!("Failed to get diet target: {}", e))?,
    };

    let items = MealItem::list_for_patient(&conn, ctx, patient_id, diet_target.as_ref().map(|t| t.id))
        .map_err(|e| format!("Failed to list meal items: {}", e))?;

    let totals = aggregate(&items);
    let delta_to_target = diet_target
        .as_ref()
        .map(|t| compare_to_target(&totals.total, &MacroTargets::from(t)));

    Ok(MealPlan {
        patient,
        diet_target,
        items,
        totals,
        delta_to_target,
    })
}

/// Add a food to one of the patient's meals
pub fn add_meal_item(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    meal: &str,
    food_id: i64,
    grams: f64,
    diet_target_id: Option<i64>,
) -> Result<AddMealItemResponse, String> {
    let meal = MealLabel::from_str(meal).ok_or_else(|| {
        format!(
            "Invalid meal '{}'. Use breakfast, morning_snack, lunch, afternoon_snack, dinner or evening_snack",
            meal
        )
    })?;
    if !grams.is_finite() || grams <= 0.0 {
        return Err(format!("grams must be greater than 0, got {}", grams));
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Patient::get_by_id(&conn, ctx, patient_id)
        .map_err(|e| format!("Failed to get patient: {}", e))?
        .is_none()
    {
        return Err(format!("Patient not found with id: {}", patient_id));
    }

    let diet_target_id = match diet_target_id {
        Some(id) => Some(
            DietTarget::get_by_id(&conn, ctx, id)
                .map_err(|e| format!("Failed to get diet target: {}", e))?
                .filter(|t| t.patient_id == patient_id)
                .ok_or_else(|| format!("Diet target not found with id: {}", id))?
                .id,
        ),
        None => DietTarget::latest_for_patient(&conn, ctx, patient_id)
            .map_err(|e| format!("Failed to get diet target: {}", e))?
            .map(|t| t.id),
    };

    let item = MealItem::create(
        &conn,
        ctx,
        &MealItemCreate {
            patient_id,
            diet_target_id,
            meal,
            food_id,
            grams,
        },
    )
    .map_err(|e| {
        tracing::error!(event = "error", action = "add_meal_item", patient_id, error = %e);
        format!("Failed to add meal item: {}", e)
    })?;

    tracing::info!(
        event = "diet_item_added",
        item_id = item.id,
        patient_id,
        food_id,
        grams,
        diet_target_id
    );

    Ok(AddMealItemResponse {
        id: item.id,
        meal: item.meal,
        nutrition: scale(&item.food, item.grams).rounded(),
        food_name: item.food.name,
        grams: item.grams,
        diet_target_id: item.diet_target_id,
    })
}

pub fn delete_meal_item(db: &Database, ctx: &RequestContext, id: i64) -> Result<DeleteMealItemResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = MealItem::delete(&conn, ctx, id)
        .map_err(|e| format!("Failed to delete meal item: {}", e))?;

    if !deleted {
        return Err(format!("Meal item not found with id: {}", id));
    }

    tracing::info!(event = "diet_item_deleted", item_id = id);
    Ok(DeleteMealItemResponse {
        success: true,
        deleted_id: id,
    })
}

/// Meal and day totals, with deltas against the diet target when there is one
pub fn get_meal_plan(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    diet_target_id: Option<i64>,
) -> Result<MealPlanResponse, String> {
    let plan = load_meal_plan(db, ctx, patient_id, diet_target_id)?;

    Ok(MealPlanResponse {
        patient_id: plan.patient.id,
        patient_name: plan.patient.name,
        diet_target: plan.diet_target,
        item_count: plan.items.len(),
        totals: plan.totals,
        delta_to_target: plan.delta_to_target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::diets::{save_diet_target, DietRequest};
    use crate::tools::test_support::{seed_food, seed_patient, test_db};

    #[test]
    fn test_plan_without_target() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);
        let rice = seed_food(&db, "Arroz", 130.0, 2.5, 28.0, 0.3);
        let beans = seed_food(&db, "Feijão", 76.0, 4.8, 13.6, 0.5);

        add_meal_item(&db, &ctx, patient.id, "lunch", rice.id, 150.0, None).unwrap();
        add_meal_item(&db, &ctx, patient.id, "Almoço", beans.id, 100.0, None).unwrap();
        add_meal_item(&db, &ctx, patient.id, "dinner", rice.id, 100.0, None).unwrap();

        let plan = get_meal_plan(&db, &ctx, patient.id, None).unwrap();
        assert!(plan.diet_target.is_none());
        assert!(plan.delta_to_target.is_none());
        assert_eq!(plan.item_count, 3);
        assert_eq!(plan.totals.by_meal.len(), 2);

        let lunch = plan.totals.meal(MealLabel::Lunch).unwrap();
        assert_eq!(lunch.items.len(), 2);
        assert!((lunch.total.calories - (195.0 + 76.0)).abs() < 1e-9);
        assert!((plan.totals.total.calories - (195.0 + 76.0 + 130.0)).abs() < 1e-9);
    }

    #[test]
    fn test_items_attach_to_active_target_and_compare() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);
        let rice = seed_food(&db, "Arroz", 130.0, 2.5, 28.0, 0.3);

        let saved = save_diet_target(&db, &ctx, patient.id, &DietRequest::default()).unwrap();
        let item = add_meal_item(&db, &ctx, patient.id, "breakfast", rice.id, 100.0, None).unwrap();
        assert_eq!(item.diet_target_id, saved.diet_target_id);

        let plan = get_meal_plan(&db, &ctx, patient.id, None).unwrap();
        let delta = plan.delta_to_target.unwrap();
        let target = plan.diet_target.unwrap();
        assert!((delta.calories.unwrap() - (130.0 - target.target_calories)).abs() < 1e-9);
        assert!((delta.protein_g.unwrap() - (2.5 - target.protein_g)).abs() < 1e-9);
    }

    #[test]
    fn test_add_validates_and_delete() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);
        let rice = seed_food(&db, "Arroz", 130.0, 2.5, 28.0, 0.3);

        assert!(add_meal_item(&db, &ctx, patient.id, "brunch", rice.id, 100.0, None).is_err());
        assert!(add_meal_item(&db, &ctx, patient.id, "lunch", rice.id, 0.0, None).is_err());
        assert!(add_meal_item(&db, &ctx, patient.id, "lunch", 999, 100.0, None).is_err());
        assert!(add_meal_item(&db, &ctx, 999, "lunch", rice.id, 100.0, None).is_err());

        let item = add_meal_item(&db, &ctx, patient.id, "lunch", rice.id, 100.0, None).unwrap();
        assert!(delete_meal_item(&db, &RequestContext::new(2), item.id).is_err());
        assert!(delete_meal_item(&db, &ctx, item.id).unwrap().success);
        assert_eq!(get_meal_plan(&db, &ctx, patient.id, None).unwrap().item_count, 0);
    }

    #[test]
    fn test_add_rejects_target_of_another_patient() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let first = seed_patient(&db, &ctx);
        let second = seed_patient(&db, &ctx);
        let rice = seed_food(&db, "Arroz", 130.0, 2.5, 28.0, 0.3);

        let own = save_diet_target(&db, &ctx, first.id, &DietRequest::default()).unwrap();
        let foreign = save_diet_target(&db, &ctx, second.id, &DietRequest::default()).unwrap();
        let foreign_id = foreign.diet_target_id.unwrap();

        let err = add_meal_item(&db, &ctx, first.id, "lunch", rice.id, 100.0, Some(foreign_id)).unwrap_err();
        assert_eq!(err, format!("Diet target not found with id: {}", foreign_id));
        assert!(add_meal_item(&db, &ctx, first.id, "lunch", rice.id, 100.0, Some(9999)).is_err());

        let item = add_meal_item(&db, &ctx, first.id, "lunch", rice.id, 100.0, own.diet_target_id).unwrap();
        assert_eq!(item.diet_target_id, own.diet_target_id);

        assert_eq!(get_meal_plan(&db, &ctx, first.id, None).unwrap().item_count, 1);
        assert_eq!(get_meal_plan(&db, &ctx, second.id, None).unwrap().item_count, 0);
    }
}
