//! Meal and day nutrition totals
//!
//! Scales each food's profile to the consumed quantity and rolls the items up
//! by meal and for the whole day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    DietTarget, FoodProfile, MealItem, MealLabel, Nutrition, DEFAULT_BASE_QUANTITY_G,
};

/// Nutrients of `consumed_grams` of a food.
/// Missing nutrients count as 0; a non-positive base quantity yields zeros.
pub fn scale(food: &FoodProfile, consumed_grams: f64) -> Nutrition {
    let base = food.base_quantity_g.unwrap_or(DEFAULT_BASE_QUANTITY_G);
    let factor = if base > 0.0 { consumed_grams / base } else { 0.0 };

    Nutrition {
        calories: food.kcal.unwrap_or(0.0),
        protein: food.protein_g.unwrap_or(0.0),
        carbs: food.carb_g.unwrap_or(0.0),
        fat: food.fat_g.unwrap_or(0.0),
        fiber: food.fiber_g.unwrap_or(0.0),
        sodium: food.sodium_mg.unwrap_or(0.0),
    } * factor
}

/// One meal item after scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledItem {
    pub item_id: i64,
    pub food_id: i64,
    pub food_name: String,
    pub grams: f64,
    pub nutrition: Nutrition,
}

/// Totals for one meal with its items in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealTotals {
    pub meal: MealLabel,
    pub label: String,
    pub total: Nutrition,
    pub items: Vec<ScaledItem>,
}

/// Day totals and the per-meal breakdown, meals in display order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayTotals {
    pub total: Nutrition,
    pub by_meal: Vec<MealTotals>,
}

impl DayTotals {
    pub fn meal(&self, label: MealLabel) -> Option<&MealTotals> {
        self.by_meal.iter().find(|m| m.meal == label)
    }
}

/// Scale and sum a plan's items.
/// Only meals that have at least one item appear in `by_meal`.
pub fn aggregate<'a, I>(items: I) -> DayTotals
where
    I: IntoIterator<Item = &'a MealItem>,
{
    let mut buckets: BTreeMap<MealLabel, Vec<ScaledItem>> = BTreeMap::new();

    for item in items {
        buckets.entry(item.meal).or_default().push(ScaledItem {
            item_id: item.id,
            food_id: item.food.id,
            food_name: item.food.name.clone(),
            grams: item.grams,
            nutrition: scale(&item.food, item.grams),
        });
    }

    let by_meal: Vec<MealTotals> = buckets
        .into_iter()
        .map(|(meal, items)| MealTotals {
            meal,
            label: meal.display_name().to_string(),
            total: items.iter().map(|i| i.nutrition).sum(),
            items,
        })
        .collect();

    DayTotals {
        total: by_meal.iter().map(|m| m.total).sum(),
        by_meal,
    }
}

/// Macro targets a plan is compared against; unset fields are skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carb_g: Option<f64>,
    pub fat_g: Option<f64>,
}

impl From<&DietTarget> for MacroTargets {
    fn from(t: &DietTarget) -> Self {
        Self {
            calories: Some(t.target_calories),
            protein_g: Some(t.protein_g),
            carb_g: Some(t.carb_g),
            fat_g: Some(t.fat_g),
        }
    }
}

/// Actual minus target; positive means over target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDelta {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carb_g: Option<f64>,
    pub fat_g: Option<f64>,
}

pub fn compare_to_target(actual: &Nutrition, targets: &MacroTargets) -> TargetDelta {
    TargetDelta {
        calories: targets.calories.map(|t| actual.calories - t),
        protein_g: targets.protein_g.map(|t| actual.protein - t),
        carb_g: targets.carb_g.map(|t| actual.carbs - t),
        fat_g: targets.fat_g.map(|t| actual.fat - t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(id: i64, base: Option<f64>, kcal: f64, protein: f64) -> FoodProfile {
        FoodProfile {
            id,
            name: format!("food {}", id),
            base_quantity_g: base,
            kcal: Some(kcal),
            protein_g: Some(protein),
            carb_g: Some(20.0),
            fat_g: None,
            fiber_g: Some(2.0),
            sodium_mg: Some(10.0),
        }
    }

    fn item(id: i64, meal: MealLabel, food: FoodProfile, grams: f64) -> MealItem {
        MealItem {
            id,
            patient_id: 1,
            diet_target_id: None,
            meal,
            food,
            grams,
            created_at: String::new(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_scale_halves_at_half_base() {
        let f = food(1, Some(100.0), 130.0, 2.5);
        let full = scale(&f, 100.0);
        let half = scale(&f, 50.0);

        assert!(close(half.calories, full.calories / 2.0));
        assert!(close(half.protein, full.protein / 2.0));
        assert!(close(half.carbs, full.carbs / 2.0));
        assert!(close(half.fiber, full.fiber / 2.0));
        assert!(close(half.sodium, full.sodium / 2.0));
        assert_eq!(half.fat, 0.0);
    }

    #[test]
    fn test_scale_base_defaults_and_zero_base() {
        let absent = food(1, None, 200.0, 10.0);
        assert!(close(scale(&absent, 150.0).calories, 300.0));

        let zero = food(2, Some(0.0), 200.0, 10.0);
        assert_eq!(scale(&zero, 150.0), Nutrition::zero());

        let custom = food(3, Some(30.0), 120.0, 6.0);
        assert!(close(scale(&custom, 60.0).calories, 240.0));
    }

    fn sample_items() -> Vec<MealItem> {
        vec![
            item(1, MealLabel::Dinner, food(1, None, 100.0, 5.0), 200.0),
            item(2, MealLabel::Breakfast, food(2, None, 50.0, 1.0), 100.0),
            item(3, MealLabel::Lunch, food(3, None, 300.0, 20.0), 150.0),
            item(4, MealLabel::Breakfast, food(4, None, 80.0, 3.0), 50.0),
        ]
    }

    #[test]
    fn test_aggregate_groups_in_display_order() {
        let totals = aggregate(&sample_items());

        let meals: Vec<_> = totals.by_meal.iter().map(|m| m.meal).collect();
        assert_eq!(
            meals,
            vec![MealLabel::Breakfast, MealLabel::Lunch, MealLabel::Dinner]
        );

        let breakfast = totals.meal(MealLabel::Breakfast).unwrap();
        let ids: Vec<_> = breakfast.items.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert!(close(breakfast.total.calories, 50.0 + 40.0));

        // 200 + 50 + 450 + 40
        assert!(close(totals.total.calories, 740.0));
        assert!(totals.meal(MealLabel::EveningSnack).is_none());
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let items = sample_items();
        let forward = aggregate(&items);

        let mut reversed = items.clone();
        reversed.reverse();
        let backward = aggregate(&reversed);

        assert!(close(forward.total.calories, backward.total.calories));
        assert!(close(forward.total.protein, backward.total.protein));
        assert!(close(forward.total.carbs, backward.total.carbs));
        assert!(close(forward.total.sodium, backward.total.sodium));
    }

    #[test]
    fn test_removing_a_meal_removes_only_its_contribution() {
        let items = sample_items();
        let all = aggregate(&items);
        let without_breakfast: Vec<_> = items
            .iter()
            .filter(|i| i.meal != MealLabel::Breakfast)
            .cloned()
            .collect();
        let rest = aggregate(&without_breakfast);

        let breakfast = all.meal(MealLabel::Breakfast).unwrap().total;
        assert!(close(rest.total.calories, all.total.calories - breakfast.calories));
        assert!(close(rest.total.protein, all.total.protein - breakfast.protein));
        assert_eq!(rest.meal(MealLabel::Lunch), all.meal(MealLabel::Lunch));
        assert_eq!(rest.meal(MealLabel::Dinner), all.meal(MealLabel::Dinner));
    }

    #[test]
    fn test_aggregate_empty_plan() {
        let totals = aggregate(&Vec::<MealItem>::new());
        assert_eq!(totals, DayTotals::default());
    }

    #[test]
    fn test_compare_to_target() {
        let actual = Nutrition {
            calories: 1800.0,
            protein: 130.0,
            carbs: 200.0,
            fat: 60.0,
            ..Default::default()
        };
        let targets = MacroTargets {
            calories: Some(2000.0),
            protein_g: Some(126.0),
            carb_g: None,
            fat_g: Some(55.6),
        };

        let delta = compare_to_target(&actual, &targets);
        assert_eq!(delta.calories, Some(-200.0));
        assert_eq!(delta.protein_g, Some(4.0));
        assert_eq!(delta.carb_g, None);
        assert!(close(delta.fat_g.unwrap(), 4.4));
    }
}
