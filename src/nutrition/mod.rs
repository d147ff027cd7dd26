//! Nutrition calculation module
//!
//! Portion scaling, meal/day aggregation and food-table number parsing.

pub mod aggregate;
pub mod parse;

pub use aggregate::{
    aggregate, compare_to_target, scale, DayTotals, MacroTargets, MealTotals, ScaledItem,
    TargetDelta,
};
pub use parse::parse_nutrient;
