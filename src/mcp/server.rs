//! NutriPlan MCP Server Implementation
//!
//! Implements the MCP server with all NutriPlan tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::{AppConfig, RequestContext};
use crate::db::Database;
use crate::formulas::Sex;
use crate::models::{PatientCreate, PatientUpdate};
use crate::tools::assessments::{self, AssessmentContext, MeasurementInput};
use crate::tools::diets::{self, DietRequest};
use crate::tools::foods::{self, ColumnMapping, ImportOptions};
use crate::tools::status::StatusTracker;
use crate::tools::{appointments, meal_plan, patients, reports};

/// NutriPlan MCP Service
#[derive(Clone)]
pub struct NutriPlanService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    config: AppConfig,
    ctx: RequestContext,
    tool_router: ToolRouter<NutriPlanService>,
}

impl NutriPlanService {
    pub fn new(config: AppConfig, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(&config))),
            database,
            ctx: config.request_context(),
            config,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        what, id
    ))]))
}

fn parse_sex(value: Option<&str>) -> Result<Option<Sex>, McpError> {
    match value {
        None => Ok(None),
        Some(s) => Sex::from_str(s).map(Some).ok_or_else(|| {
            McpError::invalid_params(format!("Invalid sex '{}'. Use male or female", s), None)
        }),
    }
}

// ============================================================================
// Patient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddPatientParams {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// YYYY-MM-DD
    pub birthdate: Option<String>,
    /// male or female
    pub sex: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdatePatientParams {
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub sex: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PatientIdParams {
    pub patient_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListPatientsParams {
    /// Case-insensitive name fragment
    pub name: Option<String>,
}

// ============================================================================
// Appointment Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScheduleAppointmentParams {
    pub patient_id: i64,
    /// YYYY-MM-DDTHH:MM[:SS]
    pub scheduled_at: String,
    /// consultation, follow_up or reassessment
    pub kind: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListAppointmentsParams {
    pub patient_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateAppointmentParams {
    pub id: i64,
    pub scheduled_at: Option<String>,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

// ============================================================================
// Assessment Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewAssessmentParams {
    /// male or female
    pub sex: String,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub neck_cm: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecordAssessmentParams {
    pub patient_id: i64,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub neck_cm: Option<f64>,
    /// YYYY-MM-DD, defaults to today
    pub assessed_on: Option<String>,
    /// weight_loss, muscle_gain, maintenance or performance
    pub objective: Option<String>,
    /// sedentary, light, moderate, high or very_high
    pub activity_level: Option<String>,
    pub sleep_hours: Option<f64>,
    pub note: Option<String>,
}

// ============================================================================
// Diet Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DietParams {
    pub patient_id: i64,
    pub sex: Option<String>,
    pub age_years: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    /// sedentary, light, moderate, high or very_high
    pub activity_level: Option<String>,
    /// deficit_20, deficit_15, maintenance, surplus_10 or surplus_15
    pub goal: Option<String>,
    /// 1.2 to 2.6, default 1.8
    pub protein_g_per_kg: Option<f64>,
    /// 0.15 to 0.40, default 0.25
    pub fat_fraction: Option<f64>,
}

impl DietParams {
    fn into_request(self) -> (i64, DietRequest) {
        (
            self.patient_id,
            DietRequest {
                sex: self.sex,
                age_years: self.age_years,
                weight_kg: self.weight_kg,
                height_cm: self.height_cm,
                activity_level: self.activity_level,
                goal: self.goal,
                protein_g_per_kg: self.protein_g_per_kg,
                fat_fraction: self.fat_fraction,
            },
        )
    }
}

// ============================================================================
// Food Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportFoodTableParams {
    /// Path to a food composition table: CSV, or .xlsx/.xls/.ods
    pub file_path: String,
    /// Grams the nutrient values refer to, default 100
    pub base_quantity_g: Option<f64>,
    /// CSV separator such as ";" or "tab", sniffed from the header when absent
    pub delimiter: Option<String>,
    /// Spreadsheet sheet name, the first sheet when absent
    pub sheet: Option<String>,
    /// Header overrides, default TACO column names
    pub name_column: Option<String>,
    pub kcal_column: Option<String>,
    pub protein_column: Option<String>,
    pub carb_column: Option<String>,
    pub fat_column: Option<String>,
    pub fiber_column: Option<String>,
    pub sodium_column: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScaleFoodParams {
    pub id: i64,
    pub grams: f64,
}

// ============================================================================
// Meal Plan Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMealItemParams {
    pub patient_id: i64,
    /// breakfast, morning_snack, lunch, afternoon_snack, dinner or evening_snack
    pub meal: String,
    pub food_id: i64,
    pub grams: f64,
    /// Defaults to the active diet target
    pub diet_target_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMealPlanParams {
    pub patient_id: i64,
    /// Defaults to the active diet target
    pub diet_target_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateReportParams {
    pub patient_id: i64,
    /// Defaults to <report dir>/patient_report_<id>.pdf
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    total: i64,
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl NutriPlanService {
    // --- Status ---

    #[tool(description = "Get the current status of the NutriPlan service including build info, database status, and process information")]
    async fn nutriplan_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        to_json(&status)
    }

    #[tool(description = "Get the step-by-step workflow: patients, assessments, diet targets, food table, meal plans and reports. Call this when starting a session.")]
    fn workflow_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::WORKFLOW_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(WORKFLOW_INSTRUCTIONS)]))
    }

    // --- Patients ---

    #[tool(description = "Register a patient. Sex (male/female) and birthdate (YYYY-MM-DD) are needed for assessments and diet calculations.")]
    fn add_patient(&self, Parameters(p): Parameters<AddPatientParams>) -> Result<CallToolResult, McpError> {
        let data = PatientCreate {
            name: p.name,
            phone: p.phone,
            email: p.email,
            birthdate: p.birthdate,
            sex: parse_sex(p.sex.as_deref())?,
            notes: p.notes,
        };
        let result = patients::add_patient(&self.database, &self.ctx, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update patient fields; omitted fields are left unchanged")]
    fn update_patient(&self, Parameters(p): Parameters<UpdatePatientParams>) -> Result<CallToolResult, McpError> {
        let data = PatientUpdate {
            name: p.name,
            phone: p.phone,
            email: p.email,
            birthdate: p.birthdate,
            sex: parse_sex(p.sex.as_deref())?,
            notes: p.notes,
        };
        let result = patients::update_patient(&self.database, &self.ctx, p.id, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a patient with computed age")]
    fn get_patient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = patients::get_patient(&self.database, &self.ctx, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(patient) => to_json(&patient),
            None => not_found("Patient", p.id),
        }
    }

    #[tool(description = "List patients, optionally filtered by a name fragment")]
    fn list_patients(&self, Parameters(p): Parameters<ListPatientsParams>) -> Result<CallToolResult, McpError> {
        let result = patients::list_patients(&self.database, &self.ctx, p.name.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Appointments ---

    #[tool(description = "Schedule an appointment (consultation, follow_up or reassessment)")]
    fn schedule_appointment(&self, Parameters(p): Parameters<ScheduleAppointmentParams>) -> Result<CallToolResult, McpError> {
        let result = appointments::schedule_appointment(
            &self.database,
            &self.ctx,
            p.patient_id,
            &p.scheduled_at,
            p.kind.as_deref(),
            p.notes,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List appointments in time order, optionally for one patient")]
    fn list_appointments(&self, Parameters(p): Parameters<ListAppointmentsParams>) -> Result<CallToolResult, McpError> {
        let result = appointments::list_appointments(&self.database, &self.ctx, p.patient_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Reschedule or edit an appointment")]
    fn update_appointment(&self, Parameters(p): Parameters<UpdateAppointmentParams>) -> Result<CallToolResult, McpError> {
        let result = appointments::update_appointment(
            &self.database,
            &self.ctx,
            p.id,
            p.scheduled_at.as_deref(),
            p.kind.as_deref(),
            p.notes,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete an appointment")]
    fn delete_appointment(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = appointments::delete_appointment(&self.database, &self.ctx, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Assessments ---

    #[tool(description = "Compute BMI, waist cutoff, waist-hip ratio and body fat without saving anything")]
    fn preview_assessment(&self, Parameters(p): Parameters<PreviewAssessmentParams>) -> Result<CallToolResult, McpError> {
        let input = MeasurementInput {
            weight_kg: p.weight_kg,
            height_cm: p.height_cm,
            waist_cm: p.waist_cm,
            hip_cm: p.hip_cm,
            neck_cm: p.neck_cm,
        };
        let result = assessments::preview_assessment(&p.sex, &input)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Record an assessment visit. Uses the patient's sex on file; missing measurements make the matching index unavailable.")]
    fn record_assessment(&self, Parameters(p): Parameters<RecordAssessmentParams>) -> Result<CallToolResult, McpError> {
        let input = MeasurementInput {
            weight_kg: p.weight_kg,
            height_cm: p.height_cm,
            waist_cm: p.waist_cm,
            hip_cm: p.hip_cm,
            neck_cm: p.neck_cm,
        };
        let visit = AssessmentContext {
            assessed_on: p.assessed_on,
            objective: p.objective,
            activity_level: p.activity_level,
            sleep_hours: p.sleep_hours,
            note: p.note,
        };
        let result = assessments::record_assessment(&self.database, &self.ctx, p.patient_id, &input, visit)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get the patient's most recent assessment with interpretation")]
    fn get_latest_assessment(&self, Parameters(p): Parameters<PatientIdParams>) -> Result<CallToolResult, McpError> {
        let result = assessments::get_latest_assessment(&self.database, &self.ctx, p.patient_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(detail) => to_json(&detail),
            None => not_found("Assessment for patient", p.patient_id),
        }
    }

    #[tool(description = "List a patient's assessments, newest first")]
    fn list_assessments(&self, Parameters(p): Parameters<PatientIdParams>) -> Result<CallToolResult, McpError> {
        let result = assessments::list_assessments(&self.database, &self.ctx, p.patient_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Diet ---

    #[tool(description = "Preview BMR, TDEE, target calories and macros. Omitted inputs come from the patient and latest assessment; defaults_used lists every fallback.")]
    fn calculate_diet(&self, Parameters(p): Parameters<DietParams>) -> Result<CallToolResult, McpError> {
        let (patient_id, req) = p.into_request();
        let result = diets::calculate_diet(&self.database, &self.ctx, patient_id, &req)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Calculate and save a diet target; the newest saved target is the patient's active one")]
    fn save_diet_target(&self, Parameters(p): Parameters<DietParams>) -> Result<CallToolResult, McpError> {
        let (patient_id, req) = p.into_request();
        let result = diets::save_diet_target(&self.database, &self.ctx, patient_id, &req)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get the patient's active diet target")]
    fn get_active_diet(&self, Parameters(p): Parameters<PatientIdParams>) -> Result<CallToolResult, McpError> {
        let result = diets::get_active_diet(&self.database, &self.ctx, p.patient_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(active) => to_json(&active),
            None => not_found("Diet target for patient", p.patient_id),
        }
    }

    // --- Food Table ---

    #[tool(description = "Import a food composition table from CSV (separator sniffed or given) or a spreadsheet (.xlsx, .xls, .ods; first sheet unless named). Trace (Tr) cells count as 0; blank, '-' and NA cells as absent.")]
    fn import_food_table(&self, Parameters(p): Parameters<ImportFoodTableParams>) -> Result<CallToolResult, McpError> {
        let defaults = ColumnMapping::default();
        let options = ImportOptions {
            mapping: ColumnMapping {
                name: p.name_column.unwrap_or(defaults.name),
                kcal: p.kcal_column.unwrap_or(defaults.kcal),
                protein_g: p.protein_column.unwrap_or(defaults.protein_g),
                carb_g: p.carb_column.unwrap_or(defaults.carb_g),
                fat_g: p.fat_column.unwrap_or(defaults.fat_g),
                fiber_g: p.fiber_column.unwrap_or(defaults.fiber_g),
                sodium_mg: p.sodium_column.unwrap_or(defaults.sodium_mg),
            },
            base_quantity_g: p.base_quantity_g,
            delimiter: p.delimiter,
            sheet: p.sheet,
        };
        let result = foods::import_food_table(&self.database, &p.file_path, &options)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Search foods by name")]
    fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        let result = foods::search_foods(&self.database, &p.query, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a food's nutrient profile")]
    fn get_food(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = foods::get_food(&self.database, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(food) => to_json(&food),
            None => not_found("Food", p.id),
        }
    }

    #[tool(description = "Count foods in the food table")]
    fn count_foods(&self) -> Result<CallToolResult, McpError> {
        let total = foods::count_foods(&self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&CountResponse { total })
    }

    #[tool(description = "Delete every food in the food table, together with the meal plan items that use them")]
    fn clear_foods(&self) -> Result<CallToolResult, McpError> {
        let result = foods::clear_foods(&self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Preview a food's nutrients for a portion in grams")]
    fn scale_food(&self, Parameters(p): Parameters<ScaleFoodParams>) -> Result<CallToolResult, McpError> {
        let result = foods::scale_food(&self.database, p.id, p.grams)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(scaled) => to_json(&scaled),
            None => not_found("Food", p.id),
        }
    }

    // --- Meal Plan ---

    #[tool(description = "Add a food portion to one of the patient's meals")]
    fn add_meal_item(&self, Parameters(p): Parameters<AddMealItemParams>) -> Result<CallToolResult, McpError> {
        let result = meal_plan::add_meal_item(
            &self.database,
            &self.ctx,
            p.patient_id,
            &p.meal,
            p.food_id,
            p.grams,
            p.diet_target_id,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Remove an item from a meal plan")]
    fn delete_meal_item(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = meal_plan::delete_meal_item(&self.database, &self.ctx, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get the meal plan with per-item, per-meal and day totals and the difference to the diet target")]
    fn get_meal_plan(&self, Parameters(p): Parameters<GetMealPlanParams>) -> Result<CallToolResult, McpError> {
        let result = meal_plan::get_meal_plan(&self.database, &self.ctx, p.patient_id, p.diet_target_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Reports ---

    #[tool(description = "Generate the patient's PDF report: assessment, diet target, meal plan and a macro chart")]
    fn generate_patient_report(&self, Parameters(p): Parameters<GenerateReportParams>) -> Result<CallToolResult, McpError> {
        let path = p
            .output_path
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.report_path_for(p.patient_id));
        let result = reports::generate_patient_report(&self.database, &self.ctx, p.patient_id, &path)
            .map_err(|e| {
                tracing::error!(event = "error", action = "generate_patient_report", patient_id = p.patient_id, error = %e);
                McpError::internal_error(e, None)
            })?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutriPlanService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutriplan".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("NutriPlan".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "NutriPlan - nutrition practice management. \
                 IMPORTANT: Call workflow_instructions first. \
                 Patients: add/update/get/list_patients. \
                 Agenda: schedule/list/update/delete_appointment. \
                 Assessments: preview_assessment, record_assessment, get_latest_assessment, list_assessments. \
                 Diet: calculate_diet, save_diet_target, get_active_diet. \
                 Food table: import_food_table, search_foods, get_food, count_foods, scale_food, clear_foods. \
                 Meal plan: add_meal_item, delete_meal_item, get_meal_plan. \
                 Report: generate_patient_report."
                    .into(),
            ),
        }
    }
}
