//! Data models
//!
//! Rust structs representing database entities.

mod appointment;
mod assessment;
mod diet_target;
mod food;
mod meal_item;
mod nutrition;
mod patient;

pub use appointment::{Appointment, AppointmentCreate, AppointmentKind, AppointmentUpdate};
pub use assessment::{AssessmentCreate, AssessmentRecord};
pub use diet_target::DietTarget;
pub use food::{FoodProfile, FoodProfileCreate, DEFAULT_BASE_QUANTITY_G};
pub use meal_item::{MealItem, MealItemCreate, MealLabel};
pub use nutrition::Nutrition;
pub use patient::{Patient, PatientCreate, PatientUpdate};
