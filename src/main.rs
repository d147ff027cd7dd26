//! NutriPlan
//!
//! An MCP server for nutrition practice management.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use nutriplan::build_info;
use nutriplan::config::AppConfig;
use nutriplan::db;
use nutriplan::mcp::NutriPlanService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutriplan=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = AppConfig::from_env();
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Report directory: {}", config.report_dir.display());

    // Ensure data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = db::Database::new(&config.database_path)?;

    // Run migrations
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    tracing::info!(user_id = config.user_id, "serving requests");

    let service = NutriPlanService::new(config, database);

    // Start the MCP server on stdio and wait for it to complete
    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
