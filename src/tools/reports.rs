//! Report generation tools
//!
//! A printable patient report: identification, latest assessment, active diet
//! target and the meal plan with totals against the target, followed by a
//! chart page comparing planned and target macros.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::Local;
use ::image::{DynamicImage, ImageFormat, RgbImage};
use printpdf::*;
use serde::Serialize;

use crate::config::RequestContext;
use crate::db::Database;
use crate::formulas::age_from_birthdate;
use crate::models::DietTarget;
use crate::nutrition::{DayTotals, TargetDelta};
use crate::tools::assessments::{get_latest_assessment, AssessmentDetail};
use crate::tools::meal_plan::load_meal_plan;

// ============================================================================
// Layout
// ============================================================================

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 15.0;
const TOP_Y_MM: f32 = PAGE_HEIGHT_MM - 20.0;
/// Content below this line continues on a new page
const BOTTOM_Y_MM: f32 = 30.0;

const COLOR_TITLE: (u8, u8, u8) = (0, 112, 96);
const COLOR_ACTUAL: (u8, u8, u8) = (0, 112, 192);
const COLOR_TARGET: (u8, u8, u8) = (0, 176, 80);
const COLOR_WARNING: (u8, u8, u8) = (255, 0, 0);
const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (128, 128, 128);

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub success: bool,
    pub file_path: String,
    pub patient_id: i64,
    pub has_assessment: bool,
    pub has_diet_target: bool,
    pub meal_items: usize,
    pub message: String,
}

/// Planned vs target grams for one macro
#[derive(Debug, Clone, PartialEq)]
pub struct MacroBar {
    pub label: &'static str,
    pub actual_g: f64,
    pub target_g: Option<f64>,
}

pub fn macro_bars(totals: &DayTotals, target: Option<&DietTarget>) -> Vec<MacroBar> {
    vec![
        MacroBar {
            label: "Protein",
            actual_g: totals.total.protein,
            target_g: target.map(|t| t.protein_g),
        },
        MacroBar {
            label: "Carbohydrate",
            actual_g: totals.total.carbs,
            target_g: target.map(|t| t.carb_g),
        },
        MacroBar {
            label: "Fat",
            actual_g: totals.total.fat,
            target_g: target.map(|t| t.fat_g),
        },
    ]
}

// ============================================================================
// Chart Generation (plotters)
// ============================================================================

/// Grouped bar chart of planned vs target macros as PNG bytes
pub fn generate_macro_chart(bars: &[MacroBar], width: u32, height: u32) -> Result<Vec<u8>, String> {
    use plotters::prelude::*;
    use plotters_bitmap::BitMapBackend;

    if bars.is_empty() {
        return Err("No data to chart".to_string());
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        let y_max = bars
            .iter()
            .flat_map(|b| [Some(b.actual_g), b.target_g])
            .flatten()
            .fold(0.0_f64, f64::max)
            .max(10.0)
            * 1.15;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-0.5_f64..(bars.len() as f64 - 0.5), 0.0..y_max)
            .map_err(|e| e.to_string())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len())
            .x_label_formatter(&|x| {
                let idx = x.round();
                if (x - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < bars.len() {
                    bars[idx as usize].label.to_string()
                } else {
                    String::new()
                }
            })
            .y_desc("g/day")
            .draw()
            .map_err(|e| e.to_string())?;

        let actual = RGBColor(COLOR_ACTUAL.0, COLOR_ACTUAL.1, COLOR_ACTUAL.2);
        let target = RGBColor(COLOR_TARGET.0, COLOR_TARGET.1, COLOR_TARGET.2);

        chart
            .draw_series(bars.iter().enumerate().map(|(i, b)| {
                let x = i as f64;
                Rectangle::new([(x - 0.35, 0.0), (x - 0.02, b.actual_g)], actual.filled())
            }))
            .map_err(|e| e.to_string())?
            .label("Planned")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], actual.filled()));

        chart
            .draw_series(bars.iter().enumerate().filter_map(|(i, b)| {
                let x = i as f64;
                b.target_g
                    .map(|t| Rectangle::new([(x + 0.02, 0.0), (x + 0.35, t)], target.filled()))
            }))
            .map_err(|e| e.to_string())?
            .label("Target")
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], target.filled()));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    // Convert RGB buffer to PNG
    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or("Failed to create image from buffer")?;

    let mut png_bytes = Vec::new();
    let dyn_img = DynamicImage::ImageRgb8(img);
    dyn_img
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    Ok(png_bytes)
}

// ============================================================================
// PDF Generation Helper Functions
// ============================================================================

fn rgb_to_printpdf(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: Mm,
    y: Mm,
    size: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.use_text(text, size, x, y, font);
}

fn add_line(layer: &PdfLayerReference, x1: Mm, y1: Mm, x2: Mm, y2: Mm, color: (u8, u8, u8), width: f32) {
    layer.set_outline_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.set_outline_thickness(width);

    let line = Line {
        points: vec![(Point::new(x1, y1), false), (Point::new(x2, y2), false)],
        is_closed: false,
    };
    layer.add_line(line);
}

/// Top-to-bottom text flow that opens a new page when it runs out of room
struct PageFlow<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl<'a> PageFlow<'a> {
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM_Y_MM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y_MM;
            self.pages += 1;
        }
    }

    fn text_at(&mut self, x: f32, text: &str, size: f32, bold: bool, color: (u8, u8, u8)) {
        let font = if bold { &self.font_bold } else { &self.font };
        add_text(&self.layer, font, text, Mm(x), Mm(self.y), size, color);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool, color: (u8, u8, u8)) {
        self.ensure_room(size * 0.5);
        self.text_at(MARGIN_LEFT_MM, text, size, bold, color);
        self.y -= size * 0.5 + 1.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(16.0);
        self.y -= 3.0;
        self.line(text, 13.0, true, COLOR_TITLE);
    }

    fn rule(&mut self) {
        self.ensure_room(4.0);
        add_line(
            &self.layer,
            Mm(MARGIN_LEFT_MM),
            Mm(self.y),
            Mm(PAGE_WIDTH_MM - MARGIN_LEFT_MM),
            Mm(self.y),
            COLOR_GRAY,
            0.5,
        );
        self.y -= 5.0;
    }
}

fn fmt_delta(delta: Option<f64>, unit: &str) -> String {
    match delta {
        Some(d) => format!("{:+.1} {}", d, unit),
        None => "-".to_string(),
    }
}

fn write_assessment(flow: &mut PageFlow, assessment: Option<&AssessmentDetail>) {
    flow.heading("Latest assessment");
    let Some(detail) = assessment else {
        flow.line("No assessment recorded.", 10.0, false, COLOR_GRAY);
        return;
    };

    let m = &detail.record.measurement;
    flow.line(&format!("Date: {}", detail.record.assessed_on), 10.0, false, COLOR_BLACK);
    flow.line(
        &format!(
            "Weight {:.1} kg | Height {:.1} cm | Waist {:.1} cm | Hip {:.1} cm | Neck {:.1} cm",
            m.weight_kg, m.height_cm, m.waist_cm, m.hip_cm, m.neck_cm
        ),
        10.0,
        false,
        COLOR_BLACK,
    );
    if let Some(objective) = detail.record.objective {
        flow.line(&format!("Objective: {}", objective.display_name()), 10.0, false, COLOR_BLACK);
    }
    for line in &detail.interpretation {
        flow.line(&format!("- {}", line), 10.0, false, COLOR_BLACK);
    }
}

fn write_diet(flow: &mut PageFlow, target: Option<&DietTarget>) {
    flow.heading("Diet target");
    let Some(t) = target else {
        flow.line("No diet target saved.", 10.0, false, COLOR_GRAY);
        return;
    };

    flow.line(&format!("Calculated on {}", t.calculated_on), 10.0, false, COLOR_BLACK);
    flow.line(
        &format!(
            "BMR {:.0} kcal | Activity {} (x{:.3}) | TDEE {:.0} kcal",
            t.bmr,
            t.activity_level.display_name(),
            t.activity_factor,
            t.tdee
        ),
        10.0,
        false,
        COLOR_BLACK,
    );
    flow.line(
        &format!(
            "Goal {} (x{:.2}) | Target {:.0} kcal/day",
            t.goal.display_name(),
            t.goal_adjustment,
            t.target_calories
        ),
        10.0,
        true,
        COLOR_BLACK,
    );
    flow.line(
        &format!(
            "Protein {:.0} g ({:.1} g/kg) | Fat {:.0} g ({:.0}% kcal) | Carbohydrate {:.0} g",
            t.protein_g,
            t.protein_g_per_kg,
            t.fat_g,
            t.fat_fraction * 100.0,
            t.carb_g
        ),
        10.0,
        false,
        COLOR_BLACK,
    );
    if let Some(warning) = t.shortfall_warning() {
        flow.line(&warning, 10.0, false, COLOR_WARNING);
    }
}

fn write_meal_plan(flow: &mut PageFlow, totals: &DayTotals, delta: Option<&TargetDelta>) {
    flow.heading("Meal plan");
    if totals.by_meal.is_empty() {
        flow.line("No foods in the meal plan.", 10.0, false, COLOR_GRAY);
        return;
    }

    for meal in &totals.by_meal {
        flow.ensure_room(12.0);
        flow.line(&meal.label, 11.0, true, COLOR_BLACK);
        for item in &meal.items {
            flow.ensure_room(5.0);
            let n = &item.nutrition;
            flow.text_at(MARGIN_LEFT_MM + 4.0, &format!("{} ({:.0} g)", item.food_name, item.grams), 9.0, false, COLOR_BLACK);
            flow.text_at(
                115.0,
                &format!("{:.0} kcal  P {:.1}  C {:.1}  F {:.1}", n.calories, n.protein, n.carbs, n.fat),
                9.0,
                false,
                COLOR_BLACK,
            );
            flow.y -= 5.0;
        }
        let t = &meal.total;
        flow.ensure_room(5.0);
        flow.text_at(MARGIN_LEFT_MM + 4.0, "Meal total", 9.0, true, COLOR_BLACK);
        flow.text_at(
            115.0,
            &format!("{:.0} kcal  P {:.1}  C {:.1}  F {:.1}", t.calories, t.protein, t.carbs, t.fat),
            9.0,
            true,
            COLOR_BLACK,
        );
        flow.y -= 7.0;
    }

    flow.rule();
    let day = &totals.total;
    flow.line(
        &format!(
            "Day total: {:.0} kcal | Protein {:.1} g | Carbohydrate {:.1} g | Fat {:.1} g | Fiber {:.1} g | Sodium {:.0} mg",
            day.calories, day.protein, day.carbs, day.fat, day.fiber, day.sodium
        ),
        10.0,
        true,
        COLOR_BLACK,
    );
    if let Some(d) = delta {
        flow.line(
            &format!(
                "Difference to target: {} | Protein {} | Carbohydrate {} | Fat {}",
                fmt_delta(d.calories, "kcal"),
                fmt_delta(d.protein_g, "g"),
                fmt_delta(d.carb_g, "g"),
                fmt_delta(d.fat_g, "g"),
            ),
            10.0,
            false,
            COLOR_BLACK,
        );
    }
}

// ============================================================================
// Patient Report Generation
// ============================================================================

/// Generate the patient PDF report at `output_path`
pub fn generate_patient_report(
    db: &Database,
    ctx: &RequestContext,
    patient_id: i64,
    output_path: &Path,
) -> Result<GenerateReportResponse, String> {
    let plan = load_meal_plan(db, ctx, patient_id, None)?;
    let assessment = get_latest_assessment(db, ctx, patient_id)?;

    let patient = &plan.patient;
    let today = Local::now().date_naive();

    let (doc, page1, layer1) = PdfDocument::new(
        "Nutrition Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let font = doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;
    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| e.to_string())?;

    let mut flow = PageFlow {
        doc: &doc,
        layer: doc.get_page(page1).get_layer(layer1),
        font: font.clone(),
        font_bold: font_bold.clone(),
        y: TOP_Y_MM,
        pages: 1,
    };

    // Title and patient block
    flow.line("Nutrition Report", 18.0, true, COLOR_TITLE);
    flow.y -= 2.0;
    flow.text_at(MARGIN_LEFT_MM, &format!("Patient: {}", patient.name), 11.0, false, COLOR_BLACK);
    flow.text_at(120.0, &format!("Generated: {}", today.format("%Y-%m-%d")), 11.0, false, COLOR_BLACK);
    flow.y -= 6.0;

    let age = patient
        .birthdate
        .as_deref()
        .and_then(|b| age_from_birthdate(b, today))
        .map(|a| format!("{} years", a))
        .unwrap_or_else(|| "-".to_string());
    let sex = patient.sex.map(|s| s.display_name()).unwrap_or("-");
    flow.text_at(MARGIN_LEFT_MM, &format!("Birthdate: {}", patient.birthdate.as_deref().unwrap_or("-")), 11.0, false, COLOR_BLACK);
    flow.text_at(120.0, &format!("Age: {} | Sex: {}", age, sex), 11.0, false, COLOR_BLACK);
    flow.y -= 6.0;
    if patient.phone.is_some() || patient.email.is_some() {
        flow.line(
            &format!(
                "Contact: {} {}",
                patient.phone.as_deref().unwrap_or(""),
                patient.email.as_deref().unwrap_or("")
            ),
            11.0,
            false,
            COLOR_BLACK,
        );
    }
    flow.rule();

    write_assessment(&mut flow, assessment.as_ref());
    write_diet(&mut flow, plan.diet_target.as_ref());
    write_meal_plan(&mut flow, &plan.totals, plan.delta_to_target.as_ref());

    let text_pages = flow.pages;
    drop(flow);

    // ========================================================================
    // Chart page
    // ========================================================================
    let (page2, layer2) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Chart Page");
    let layer2 = doc.get_page(page2).get_layer(layer2);
    let mut y2 = TOP_Y_MM;

    add_text(&layer2, &font_bold, "Macronutrients: planned vs target", Mm(MARGIN_LEFT_MM), Mm(y2), 16.0, COLOR_TITLE);
    y2 -= 10.0;

    let bars = macro_bars(&plan.totals, plan.diet_target.as_ref());
    match generate_macro_chart(&bars, 900, 500) {
        Ok(png_bytes) => {
            let dynamic_image = printpdf::image_crate::load_from_memory(&png_bytes)
                .map_err(|e| e.to_string())?;
            let pdf_image = Image::from_dynamic_image(&dynamic_image);

            // 900x500 pixels at 130 DPI is about 176mm x 98mm
            let transform = ImageTransform {
                translate_x: Some(Mm(MARGIN_LEFT_MM)),
                translate_y: Some(Mm(y2 - 100.0)),
                dpi: Some(130.0),
                ..Default::default()
            };

            pdf_image.add_to_layer(layer2.clone(), transform);
            y2 -= 105.0;
        }
        Err(e) => {
            add_text(&layer2, &font, &format!("Chart generation error: {}", e), Mm(MARGIN_LEFT_MM), Mm(y2 - 10.0), 9.0, COLOR_WARNING);
            y2 -= 15.0;
        }
    }

    y2 -= 5.0;
    add_text(&layer2, &font_bold, "Legend:", Mm(MARGIN_LEFT_MM), Mm(y2), 10.0, COLOR_BLACK);
    add_text(&layer2, &font, "Planned", Mm(45.0), Mm(y2), 10.0, COLOR_ACTUAL);
    add_text(&layer2, &font, "Target", Mm(80.0), Mm(y2), 10.0, COLOR_TARGET);
    if plan.diet_target.is_none() {
        y2 -= 6.0;
        add_text(&layer2, &font, "No diet target saved; only planned values are shown.", Mm(MARGIN_LEFT_MM), Mm(y2), 9.0, COLOR_GRAY);
    }

    // Save PDF
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(output_path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| e.to_string())?;

    let file_path = output_path.display().to_string();
    tracing::info!(event = "pdf_generated", patient_id, path = %file_path, pages = text_pages + 1);

    Ok(GenerateReportResponse {
        success: true,
        file_path,
        patient_id,
        has_assessment: assessment.is_some(),
        has_diet_target: plan.diet_target.is_some(),
        meal_items: plan.items.len(),
        message: format!(
            "Report generated for {} with {} meal item(s) over {} page(s)",
            patient.name,
            plan.items.len(),
            text_pages + 1
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::diets::{save_diet_target, DietRequest};
    use crate::tools::meal_plan::add_meal_item;
    use crate::tools::test_support::{seed_food, seed_patient, test_db};

    #[test]
    fn test_macro_bars_without_target() {
        let bars = macro_bars(&DayTotals::default(), None);
        assert_eq!(bars.len(), 3);
        assert!(bars.iter().all(|b| b.target_g.is_none() && b.actual_g == 0.0));
    }

    #[test]
    fn test_report_with_placeholders() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);

        let path = std::env::temp_dir().join(format!("nutriplan_report_empty_{}.pdf", std::process::id()));
        let resp = generate_patient_report(&db, &ctx, patient.id, &path).unwrap();
        assert!(resp.success);
        assert!(!resp.has_assessment);
        assert!(!resp.has_diet_target);

        let size = std::fs::metadata(&path).unwrap().len();
        assert!(size > 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_report_with_plan_spanning_pages() {
        let db = test_db();
        let ctx = RequestContext::new(1);
        let patient = seed_patient(&db, &ctx);
        save_diet_target(&db, &ctx, patient.id, &DietRequest::default()).unwrap();

        let rice = seed_food(&db, "Arroz", 130.0, 2.5, 28.0, 0.3);
        for meal in ["breakfast", "lunch", "afternoon_snack", "dinner"] {
            for _ in 0..12 {
                add_meal_item(&db, &ctx, patient.id, meal, rice.id, 50.0, None).unwrap();
            }
        }

        let path = std::env::temp_dir().join(format!("nutriplan_report_full_{}.pdf", std::process::id()));
        let resp = generate_patient_report(&db, &ctx, patient.id, &path).unwrap();
        assert!(resp.has_diet_target);
        assert_eq!(resp.meal_items, 48);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_report_unknown_patient() {
        let db = test_db();
        let path = std::env::temp_dir().join("nutriplan_report_missing.pdf");
        assert!(generate_patient_report(&db, &RequestContext::new(1), 404, &path).is_err());
    }
}
