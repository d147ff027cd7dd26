//! NutriPlan Library
//!
//! Nutrition practice management: anthropometric and energy calculations,
//! food tables, meal plans and reports.

pub mod build_info;
pub mod config;
pub mod db;
pub mod formulas;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
