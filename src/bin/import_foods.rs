//! Import a food composition table into the NutriPlan database
//!
//! Usage: import_foods <file.csv|file.xlsx> [base_grams] [--delimiter <sep>] [--sheet <name>]

use nutriplan::config::AppConfig;
use nutriplan::tools::foods::{import_food_table, ImportOptions};

const USAGE: &str =
    "Usage: import_foods <file.csv|file.xlsx> [base_grams] [--delimiter <sep>] [--sheet <name>]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("nutriplan=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut file = None;
    let mut options = ImportOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--delimiter" | "-d" => options.delimiter = Some(args.next().ok_or(USAGE)?),
            "--sheet" | "-s" => options.sheet = Some(args.next().ok_or(USAGE)?),
            _ if file.is_none() => file = Some(arg),
            _ if options.base_quantity_g.is_none() => {
                options.base_quantity_g = Some(
                    arg.trim()
                        .replace(',', ".")
                        .parse::<f64>()
                        .map_err(|_| format!("base_grams must be a number, got '{}'", arg))?,
                );
            }
            _ => {
                eprintln!("{}", USAGE);
                std::process::exit(2);
            }
        }
    }
    let Some(file) = file else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = AppConfig::from_env();
    println!("Database path: {}", config.database_path.display());
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = nutriplan::db::Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        nutriplan::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let summary = import_food_table(&database, &file, &options)?;

    println!("Imported {} foods from {} ({})", summary.imported, summary.source, summary.format);
    if let Some(delimiter) = &summary.delimiter {
        println!("  Delimiter: {}", delimiter);
    }
    if let Some(sheet) = &summary.sheet {
        println!("  Sheet: {}", sheet);
    }
    println!("  Base quantity: {} g", summary.base_quantity_g);
    println!("  Rows skipped: {}", summary.skipped);
    if !summary.missing_columns.is_empty() {
        println!("  Missing columns: {}", summary.missing_columns.join(", "));
    }
    println!("  Foods in table: {}", summary.total_foods);

    Ok(())
}
