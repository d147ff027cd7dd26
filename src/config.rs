//! Runtime configuration
//!
//! Everything is read from the environment once at startup and then passed
//! around explicitly.

use std::path::{Path, PathBuf};

use serde::Serialize;

const DATABASE_PATH_VAR: &str = "NUTRIPLAN_DATABASE_PATH";
const REPORT_DIR_VAR: &str = "NUTRIPLAN_REPORT_DIR";
const USER_ID_VAR: &str = "NUTRIPLAN_USER_ID";

/// The practitioner a request is made on behalf of.
///
/// Every patient-scoped operation takes one of these instead of reading a
/// session global, and every query filters on `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub user_id: i64,
}

impl RequestContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub report_dir: PathBuf,
    pub user_id: i64,
}

impl AppConfig {
    /// Build the configuration from `NUTRIPLAN_*` environment variables
    pub fn from_env() -> Self {
        let database_path = std::env::var(DATABASE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_database_path());

        let report_dir = std::env::var(REPORT_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_report_dir(&database_path));

        let user_id = std::env::var(USER_ID_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(1);

        Self {
            database_path,
            report_dir,
            user_id,
        }
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.user_id)
    }

    /// Default output path for a patient's PDF report
    pub fn report_path_for(&self, patient_id: i64) -> PathBuf {
        self.report_dir
            .join(format!("patient_report_{}.pdf", patient_id))
    }
}

/// `<project>/data/nutriplan.db`, resolved from the executable location
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("nutriplan.db");
    path
}

fn default_report_dir(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .map(|p| p.join("reports"))
        .unwrap_or_else(|| PathBuf::from("reports"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_dir_sits_next_to_database() {
        let dir = default_report_dir(Path::new("/srv/nutri/data/nutriplan.db"));
        assert_eq!(dir, PathBuf::from("/srv/nutri/data/reports"));
    }

    #[test]
    fn report_path_uses_patient_id() {
        let config = AppConfig {
            database_path: PathBuf::from("/tmp/db.sqlite"),
            report_dir: PathBuf::from("/tmp/reports"),
            user_id: 7,
        };
        assert_eq!(
            config.report_path_for(42),
            PathBuf::from("/tmp/reports/patient_report_42.pdf")
        );
        assert_eq!(config.request_context(), RequestContext::new(7));
    }
}
