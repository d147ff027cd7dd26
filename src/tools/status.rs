//! NutriPlan Status Tool
//!
//! Runtime status of the service and the workflow guide served to assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::config::AppConfig;

/// Workflow instructions for AI assistants
pub const WORKFLOW_INSTRUCTIONS: &str = r#"
# NutriPlan Workflow

NutriPlan keeps a nutrition practitioner's patients, visits, diet targets and
meal plans. Every patient belongs to the practitioner the server runs for.

## 1. Patients and agenda

- `add_patient` with at least a name. Record `sex` (male/female) and a
  `birthdate` (YYYY-MM-DD): assessments need the sex, diet calculations use
  the age.
- `list_patients` (optional name search), `get_patient`, `update_patient`.
- `schedule_appointment` takes `scheduled_at` as YYYY-MM-DDTHH:MM and a kind:
  consultation, follow_up or reassessment. `list_appointments` returns the
  agenda in time order.

## 2. Assessment

- `preview_assessment` computes indices without saving (useful while the
  patient is still being measured).
- `record_assessment` stores weight (kg), height (cm), waist, hip and neck
  (cm), plus objective, activity level and sleep hours.
- Missing measurements are fine: the matching index is reported as
  unavailable instead of guessed.
- Indices: BMI with category, waist cutoff (80 cm women / 94 cm men),
  waist-hip ratio (0.85 / 1.00) and circumference body fat.

## 3. Diet target

- `calculate_diet` previews BMR (Mifflin-St Jeor), TDEE, target calories and
  the macro split. Anything not passed is taken from the patient and their
  latest assessment; `defaults_used` lists every fallback.
- Activity levels: sedentary, light, moderate, high, very_high.
- Goals: deficit_20, deficit_15, maintenance, surplus_10, surplus_15.
- Protein 1.2-2.6 g/kg, fat 15-40% of calories, carbohydrate takes the rest.
  If protein and fat alone exceed the target, carbohydrate is 0 g and a
  `warning` explains the shortfall.
- `save_diet_target` stores the result; the newest saved target is the
  active one (`get_active_diet`).

## 4. Food table and meal plan

- Foods come from a food composition table (TACO headers by default) in CSV
  or a spreadsheet (.xlsx, .xls, .ods), imported with `import_food_table` or
  the `import_foods` command. Pass `delimiter` for an unusual CSV separator
  and `sheet` when the table is not on the first sheet.
- `search_foods` by name, `scale_food` to preview nutrients for a portion.
- `add_meal_item` with a meal (breakfast, morning_snack, lunch,
  afternoon_snack, dinner, evening_snack), a food id and grams. Items attach
  to the active diet target.
- `get_meal_plan` returns per-item, per-meal and day totals, with the
  difference to the target.

## 5. Report

- `generate_patient_report` writes a PDF with the patient block, latest
  assessment, active diet target, meal plan and a macro chart.

## Notes

- Dates are ISO: YYYY-MM-DD.
- Trace (Tr) nutrient values count as 0. Blank, `-` or unreadable cells
  count as absent, never as an error.
"#;

/// Runtime status of the NutriPlan service
#[derive(Debug, Clone, Serialize)]
pub struct NutriPlanStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub report_dir: String,
    pub user_id: i64,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    report_dir: PathBuf,
    user_id: i64,
}

impl StatusTracker {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            start_time: Instant::now(),
            database_path: config.database_path.clone(),
            report_dir: config.report_dir.clone(),
            user_id: config.user_id,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> NutriPlanStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        // Get process info
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutriPlanStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            report_dir: self.report_dir.display().to_string(),
            user_id: self.user_id,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
