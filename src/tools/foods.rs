//! Food table MCP Tools
//!
//! Importing a food composition table from CSV or a spreadsheet and looking foods up.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Database;
use crate::models::{FoodProfile, FoodProfileCreate, Nutrition, DEFAULT_BASE_QUANTITY_G};
use crate::nutrition::{parse_nutrient, scale};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// File-level import failures. Bad cells never fail an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to open workbook '{path}': {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("Invalid delimiter '{0}'. Use a single character such as ',' or ';', or 'tab'")]
    InvalidDelimiter(String),

    #[error("The file has no header row")]
    Empty,

    #[error("Name column '{0}' not found in header")]
    MissingNameColumn(String),

    #[error("Base quantity must be greater than 0, got {0}")]
    InvalidBaseQuantity(f64),
}

/// Which header names hold which nutrient. Defaults match the TACO table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: String,
    pub kcal: String,
    pub protein_g: String,
    pub carb_g: String,
    pub fat_g: String,
    pub fiber_g: String,
    pub sodium_mg: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: "Alimento".to_string(),
            kcal: "Energia (kcal)".to_string(),
            protein_g: "Proteína (g)".to_string(),
            carb_g: "Carboidrato (g)".to_string(),
            fat_g: "Lipídeos (g)".to_string(),
            fiber_g: "Fibra alimentar (g)".to_string(),
            sodium_mg: "Sódio (mg)".to_string(),
        }
    }
}

/// How to read a food table file
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub mapping: ColumnMapping,
    /// Grams the nutrient values refer to, default 100
    pub base_quantity_g: Option<f64>,
    /// CSV only. Sniffed from the header when absent.
    pub delimiter: Option<String>,
    /// Spreadsheets only. The first sheet when absent.
    pub sheet: Option<String>,
}

/// Rows parsed from a table, ready to insert
#[derive(Debug)]
pub struct ParsedTable {
    pub delimiter: Option<char>,
    pub sheet: Option<String>,
    pub rows: Vec<FoodProfileCreate>,
    pub skipped: usize,
    pub missing_columns: Vec<String>,
}

/// Response for import_food_table
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub source: String,
    pub format: &'static str,
    pub delimiter: Option<String>,
    pub sheet: Option<String>,
    pub imported: usize,
    pub skipped: usize,
    pub base_quantity_g: f64,
    pub missing_columns: Vec<String>,
    pub total_foods: i64,
}

/// Response for search_foods
#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub foods: Vec<FoodProfile>,
    pub total: usize,
}

/// Response for scale_food
#[derive(Debug, Serialize)]
pub struct ScaledFoodResponse {
    pub food: FoodProfile,
    pub grams: f64,
    pub nutrition: Nutrition,
}

/// Response for clear_foods
#[derive(Debug, Serialize)]
pub struct ClearFoodsResponse {
    pub success: bool,
    pub deleted: usize,
}

/// Pick the delimiter that splits the header into the most columns.
/// Ties go to the later entry, so `;` wins over `,`.
fn detect_delimiter(header: &str) -> u8 {
    [b',', b'\t', b';']
        .into_iter()
        .max_by_key(|d| header.matches(*d as char).count())
        .filter(|d| header.contains(*d as char))
        .unwrap_or(b',')
}

/// Accepts a single ASCII character, or `tab` / `\t`
pub fn parse_delimiter(value: &str) -> Result<u8, ImportError> {
    if value == "\t" {
        return Ok(b'\t');
    }
    match value.trim() {
        v if v.eq_ignore_ascii_case("tab") || v == "\\t" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        _ => Err(ImportError::InvalidDelimiter(value.to_string())),
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().trim_start_matches('\u{feff}').to_lowercase()
}

fn check_base_quantity(base_quantity_g: f64) -> Result<(), ImportError> {
    if base_quantity_g.is_finite() && base_quantity_g > 0.0 {
        Ok(())
    } else {
        Err(ImportError::InvalidBaseQuantity(base_quantity_g))
    }
}

/// Map header and record cells to food rows, whatever the file format.
/// Rows without a name are counted as skipped; unparseable cells become absent.
fn build_table(
    headers: &[String],
    records: impl IntoIterator<Item = Vec<String>>,
    mapping: &ColumnMapping,
    base_quantity_g: f64,
) -> Result<ParsedTable, ImportError> {
    let headers: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let find = |name: &str| headers.iter().position(|h| *h == normalize_header(name));

    let name_col = find(&mapping.name).ok_or_else(|| ImportError::MissingNameColumn(mapping.name.clone()))?;

    let optional = [
        &mapping.kcal,
        &mapping.protein_g,
        &mapping.carb_g,
        &mapping.fat_g,
        &mapping.fiber_g,
        &mapping.sodium_mg,
    ];
    let cols: Vec<Option<usize>> = optional.iter().map(|c| find(c)).collect();
    let missing_columns = optional
        .iter()
        .zip(&cols)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0;

    for fields in records {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .and_then(|v| parse_nutrient(v))
        };

        let name = fields.get(name_col).map(|s| s.trim()).unwrap_or("");
        if name.is_empty() {
            skipped += 1;
            continue;
        }

        rows.push(FoodProfileCreate {
            name: name.to_string(),
            base_quantity_g: Some(base_quantity_g),
            kcal: cell(cols[0]),
            protein_g: cell(cols[1]),
            carb_g: cell(cols[2]),
            fat_g: cell(cols[3]),
            fiber_g: cell(cols[4]),
            sodium_mg: cell(cols[5]),
        });
    }

    Ok(ParsedTable {
        delimiter: None,
        sheet: None,
        rows,
        skipped,
        missing_columns,
    })
}

/// Parse CSV text into food rows. The delimiter is sniffed from the header
/// line unless one is given.
pub fn parse_food_table(
    text: &str,
    mapping: &ColumnMapping,
    base_quantity_g: f64,
    delimiter: Option<u8>,
) -> Result<ParsedTable, ImportError> {
    check_base_quantity(base_quantity_g)?;

    let text = text.trim_start_matches('\u{feff}');
    let header_line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or(ImportError::Empty)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(header_line));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let records = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, csv::Error>>()?;

    let mut table = build_table(&headers, records, mapping, base_quantity_g)?;
    table.delimiter = Some(delimiter as char);
    Ok(table)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// Parse one sheet of a spreadsheet (the first one unless named).
/// Blank rows are ignored; the first non-blank row is the header.
pub fn parse_food_workbook(
    path: &Path,
    sheet: Option<&str>,
    mapping: &ColumnMapping,
    base_quantity_g: f64,
) -> Result<ParsedTable, ImportError> {
    check_base_quantity(base_quantity_g)?;

    let workbook_error = |source: calamine::Error| ImportError::Workbook {
        path: path.display().to_string(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => sheet_names
            .into_iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))?,
        None => sheet_names.into_iter().next().ok_or(ImportError::Empty)?,
    };
    let range = workbook.worksheet_range(&sheet_name).map_err(workbook_error)?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()));
    let headers = rows.next().ok_or(ImportError::Empty)?;

    let mut table = build_table(&headers, rows, mapping, base_quantity_g)?;
    table.sheet = Some(sheet_name);
    Ok(table)
}

fn delimiter_name(d: char) -> String {
    match d {
        '\t' => "tab".to_string(),
        other => other.to_string(),
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn store_table(
    db: &Database,
    source: &str,
    format: &'static str,
    parsed: ParsedTable,
    base_quantity_g: f64,
) -> Result<ImportSummary, String> {
    let (imported, total_foods) = db
        .with_conn_mut(|conn| {
            let imported = FoodProfile::insert_many(conn, &parsed.rows)?;
            let total = FoodProfile::count(conn)?;
            Ok((imported, total))
        })
        .map_err(|e| format!("Failed to import foods: {}", e))?;

    tracing::info!(
        event = "foods_imported",
        source,
        format,
        imported,
        skipped = parsed.skipped,
        total_foods
    );

    Ok(ImportSummary {
        source: source.to_string(),
        format,
        delimiter: parsed.delimiter.map(delimiter_name),
        sheet: parsed.sheet,
        imported,
        skipped: parsed.skipped + (parsed.rows.len() - imported),
        base_quantity_g,
        missing_columns: parsed.missing_columns,
        total_foods,
    })
}

/// Import already-loaded CSV text
pub fn import_food_csv(
    db: &Database,
    source: &str,
    text: &str,
    options: &ImportOptions,
) -> Result<ImportSummary, String> {
    let base_quantity_g = options.base_quantity_g.unwrap_or(DEFAULT_BASE_QUANTITY_G);
    let delimiter = options
        .delimiter
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(parse_delimiter)
        .transpose()
        .map_err(|e| e.to_string())?;

    let parsed = parse_food_table(text, &options.mapping, base_quantity_g, delimiter)
        .map_err(|e| e.to_string())?;

    store_table(db, source, "csv", parsed, base_quantity_g)
}

/// Import a food table from disk. `.xlsx`, `.xls`, `.xlsm`, `.xlsb` and `.ods`
/// files are read as spreadsheets, anything else as CSV.
pub fn import_food_table(
    db: &Database,
    file_path: &str,
    options: &ImportOptions,
) -> Result<ImportSummary, String> {
    let path = Path::new(file_path);

    if is_workbook(path) {
        let base_quantity_g = options.base_quantity_g.unwrap_or(DEFAULT_BASE_QUANTITY_G);
        let parsed = parse_food_workbook(path, options.sheet.as_deref(), &options.mapping, base_quantity_g)
            .map_err(|e| e.to_string())?;
        return store_table(db, file_path, "spreadsheet", parsed, base_quantity_g);
    }

    let bytes = std::fs::read(path)
        .map_err(|source| ImportError::Io {
            path: file_path.to_string(),
            source,
        })
        .map_err(|e| e.to_string())?;
    let text = String::from_utf8_lossy(&bytes);

    import_food_csv(db, file_path, &text, options)
}

/// Search foods by name
pub fn search_foods(db: &Database, query: &str, limit: i64) -> Result<SearchFoodsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let foods = FoodProfile::search(&conn, query, limit)
        .map_err(|e| format!("Search failed: {}", e))?;
    let total = foods.len();
    Ok(SearchFoodsResponse { foods, total })
}

pub fn get_food(db: &Database, id: i64) -> Result<Option<FoodProfile>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    FoodProfile::get_by_id(&conn, id).map_err(|e| format!("Failed to get food: {}", e))
}

pub fn count_foods(db: &Database) -> Result<i64, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    FoodProfile::count(&conn).map_err(|e| format!("Failed to count foods: {}", e))
}

/// Empty the food table. Meal items that used those foods go with them.
pub fn clear_foods(db: &Database) -> Result<ClearFoodsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = FoodProfile::clear(&conn).map_err(|e| format!("Failed to clear foods: {}", e))?;

    tracing::warn!(event = "foods_cleared", deleted);
    Ok(ClearFoodsResponse {
        success: true,
        deleted,
    })
}

/// Nutrients for a quantity of a food, without adding it to any plan
pub fn scale_food(db: &Database, id: i64, grams: f64) -> Result<Option<ScaledFoodResponse>, String> {
    if !grams.is_finite() || grams < 0.0 {
        return Err(format!("grams must be zero or positive, got {}", grams));
    }

    Ok(get_food(db, id)?.map(|food| ScaledFoodResponse {
        nutrition: scale(&food, grams).rounded(),
        food,
        grams,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_db;
    use rust_xlsxwriter::Workbook;

    const TACO_SAMPLE: &str = "\u{feff}Número;Alimento;Energia (kcal);Proteína (g);Lipídeos (g);Carboidrato (g);Fibra alimentar (g);Sódio (mg)\n\
        1;\"Arroz, integral, cozido\";124;2,6;1,0;25,8;2,7;1\n\
        2;\"Açúcar, cristal\";387;0,3;Tr;99,6;NA;Tr\n\
        3;;10;1;1;1;1;1\n\
        4;\"Sal, \"\"grosso\"\"\";0;-;-;-;-;39943\n";

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("nutriplan_{}_{}", std::process::id(), name))
    }

    /// A notes sheet first, then the food table on a sheet named "TACO"
    fn write_taco_workbook(path: &Path) {
        let mut workbook = Workbook::new();

        let notes = workbook.add_worksheet();
        notes.set_name("Notas").unwrap();
        notes.write_string(0, 0, "Tabela Brasileira de Composição de Alimentos").unwrap();

        let taco = workbook.add_worksheet();
        taco.set_name("TACO").unwrap();
        for (col, header) in ["Alimento", "Energia (kcal)", "Proteína (g)", "Lipídeos (g)"]
            .into_iter()
            .enumerate()
        {
            taco.write_string(0, col as u16, header).unwrap();
        }
        taco.write_string(1, 0, "Arroz, integral, cozido").unwrap();
        taco.write_number(1, 1, 124.0).unwrap();
        taco.write_number(1, 2, 2.6).unwrap();
        taco.write_string(1, 3, "Tr").unwrap();
        taco.write_string(3, 0, "Feijão, carioca, cozido").unwrap();
        taco.write_number(3, 1, 76.0).unwrap();
        taco.write_string(3, 2, "NA").unwrap();
        taco.write_number(3, 3, 0.5).unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("\"Alimento, cru\";kcal"), b';');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter(" , ").unwrap(), b',');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("TAB").unwrap(), b'\t');
        assert!(matches!(parse_delimiter(";;"), Err(ImportError::InvalidDelimiter(_))));
        assert!(matches!(parse_delimiter("¦"), Err(ImportError::InvalidDelimiter(_))));
    }

    #[test]
    fn test_parse_taco_semicolon_table() {
        let parsed = parse_food_table(TACO_SAMPLE, &ColumnMapping::default(), 100.0, None).unwrap();

        assert_eq!(parsed.delimiter, Some(';'));
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.skipped, 1);
        assert!(parsed.missing_columns.is_empty());

        let rice = &parsed.rows[0];
        assert_eq!(rice.name, "Arroz, integral, cozido");
        assert_eq!(rice.kcal, Some(124.0));
        assert_eq!(rice.protein_g, Some(2.6));
        assert_eq!(rice.carb_g, Some(25.8));

        let sugar = &parsed.rows[1];
        assert_eq!(sugar.fat_g, Some(0.0));
        assert_eq!(sugar.fiber_g, None);
        assert_eq!(sugar.sodium_mg, Some(0.0));

        let salt = &parsed.rows[2];
        assert_eq!(salt.name, "Sal, \"grosso\"");
        assert_eq!(salt.protein_g, None);
        assert_eq!(salt.sodium_mg, Some(39943.0));
    }

    #[test]
    fn test_quoted_cell_spanning_lines_stays_one_row() {
        let csv = "Alimento;Energia (kcal)\n\"Arroz,\ncozido\";124,0\nFeijão;76\n";
        let parsed = parse_food_table(csv, &ColumnMapping::default(), 100.0, None).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.rows[0].name, "Arroz,\ncozido");
        assert_eq!(parsed.rows[0].kcal, Some(124.0));
        assert_eq!(parsed.rows[1].name, "Feijão");
        assert_eq!(parsed.rows[1].kcal, Some(76.0));
    }

    #[test]
    fn test_explicit_delimiter_overrides_sniffing() {
        // The header alone looks comma separated
        let csv = "Alimento|Energia (kcal), por 100 g\nOvo|143\n";
        let mapping = ColumnMapping {
            kcal: "Energia (kcal), por 100 g".to_string(),
            ..Default::default()
        };

        let sniffed = parse_food_table(csv, &mapping, 100.0, None).unwrap_err();
        assert!(matches!(sniffed, ImportError::MissingNameColumn(_)));

        let parsed = parse_food_table(csv, &mapping, 100.0, Some(b'|')).unwrap();
        assert_eq!(parsed.delimiter, Some('|'));
        assert_eq!(parsed.rows[0].name, "Ovo");
        assert_eq!(parsed.rows[0].kcal, Some(143.0));
    }

    #[test]
    fn test_custom_mapping_and_missing_columns() {
        let csv = "food,kcal,protein\nEgg,143,12.6\n";
        let mapping = ColumnMapping {
            name: "food".to_string(),
            kcal: "KCAL".to_string(),
            protein_g: "protein".to_string(),
            ..Default::default()
        };

        let parsed = parse_food_table(csv, &mapping, 50.0, None).unwrap();
        assert_eq!(parsed.rows[0].kcal, Some(143.0));
        assert_eq!(parsed.rows[0].base_quantity_g, Some(50.0));
        assert_eq!(parsed.missing_columns.len(), 4);
        assert!(parsed.missing_columns.contains(&"Sódio (mg)".to_string()));
    }

    #[test]
    fn test_file_level_errors() {
        let mapping = ColumnMapping::default();
        assert!(matches!(parse_food_table("", &mapping, 100.0, None), Err(ImportError::Empty)));
        assert!(matches!(
            parse_food_table("name;kcal\nx;1", &mapping, 100.0, None),
            Err(ImportError::MissingNameColumn(_))
        ));
        assert!(matches!(
            parse_food_table(TACO_SAMPLE, &mapping, 0.0, None),
            Err(ImportError::InvalidBaseQuantity(_))
        ));
    }

    #[test]
    fn test_parse_named_sheet() {
        let path = temp_path("taco_named.xlsx");
        write_taco_workbook(&path);

        let parsed = parse_food_workbook(&path, Some("TACO"), &ColumnMapping::default(), 100.0).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(parsed.sheet.as_deref(), Some("TACO"));
        assert_eq!(parsed.delimiter, None);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.missing_columns.len(), 3);

        let rice = &parsed.rows[0];
        assert_eq!(rice.name, "Arroz, integral, cozido");
        assert_eq!(rice.kcal, Some(124.0));
        assert_eq!(rice.protein_g, Some(2.6));
        assert_eq!(rice.fat_g, Some(0.0));

        let beans = &parsed.rows[1];
        assert_eq!(beans.protein_g, None);
        assert_eq!(beans.fat_g, Some(0.5));
    }

    #[test]
    fn test_workbook_defaults_to_first_sheet() {
        let path = temp_path("taco_first.xlsx");
        write_taco_workbook(&path);

        let first = parse_food_workbook(&path, None, &ColumnMapping::default(), 100.0);
        let unknown = parse_food_workbook(&path, Some("Planilha9"), &ColumnMapping::default(), 100.0);
        std::fs::remove_file(&path).ok();

        assert!(matches!(first, Err(ImportError::MissingNameColumn(_))));
        assert!(matches!(unknown, Err(ImportError::SheetNotFound(name)) if name == "Planilha9"));
    }

    #[test]
    fn test_import_workbook_from_disk() {
        let db = test_db();
        let path = temp_path("taco_import.xlsx");
        write_taco_workbook(&path);

        let options = ImportOptions {
            sheet: Some("TACO".to_string()),
            ..Default::default()
        };
        let summary = import_food_table(&db, &path.display().to_string(), &options);
        std::fs::remove_file(&path).ok();

        let summary = summary.unwrap();
        assert_eq!(summary.format, "spreadsheet");
        assert_eq!(summary.sheet.as_deref(), Some("TACO"));
        assert_eq!(summary.delimiter, None);
        assert_eq!(summary.imported, 2);
        assert_eq!(count_foods(&db).unwrap(), 2);
    }

    #[test]
    fn test_import_search_scale_clear() {
        let db = test_db();
        let summary = import_food_csv(&db, "taco.csv", TACO_SAMPLE, &ImportOptions::default()).unwrap();
        assert_eq!(summary.format, "csv");
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.delimiter.as_deref(), Some(";"));
        assert_eq!(count_foods(&db).unwrap(), 3);

        let found = search_foods(&db, "arroz", 50).unwrap();
        assert_eq!(found.total, 1);

        let scaled = scale_food(&db, found.foods[0].id, 50.0).unwrap().unwrap();
        assert_eq!(scaled.nutrition.calories, 62.0);
        assert_eq!(scaled.nutrition.protein, 1.3);

        assert!(scale_food(&db, 999, 50.0).unwrap().is_none());
        assert!(scale_food(&db, found.foods[0].id, -1.0).is_err());

        assert_eq!(clear_foods(&db).unwrap().deleted, 3);
        assert_eq!(count_foods(&db).unwrap(), 0);
    }

    #[test]
    fn test_import_with_explicit_tab_delimiter() {
        let db = test_db();
        let options = ImportOptions {
            delimiter: Some("tab".to_string()),
            ..Default::default()
        };
        let text = "Alimento\tEnergia (kcal)\nOvo, cozido\t146\n";

        let summary = import_food_csv(&db, "ovos.tsv", text, &options).unwrap();
        assert_eq!(summary.delimiter.as_deref(), Some("tab"));
        assert_eq!(summary.imported, 1);

        let bad = ImportOptions {
            delimiter: Some("::".to_string()),
            ..Default::default()
        };
        let err = import_food_csv(&db, "ovos.tsv", text, &bad).unwrap_err();
        assert!(err.contains("Invalid delimiter"));
    }

    #[test]
    fn test_import_missing_file() {
        let db = test_db();
        let err = import_food_table(&db, "/nonexistent/taco.csv", &ImportOptions::default()).unwrap_err();
        assert!(err.contains("Failed to read"));

        let err = import_food_table(&db, "/nonexistent/taco.xlsx", &ImportOptions::default()).unwrap_err();
        assert!(err.contains("Failed to open workbook"));
    }
}
