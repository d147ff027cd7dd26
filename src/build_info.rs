//! Build metadata embedded by `build.rs`

use serde::Serialize;

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build metadata reported by `nutriplan_status` and the startup banner
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    /// 0 when built without the build script's counter
    pub build_number: u64,
    /// UTC, ISO 8601
    pub build_timestamp: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            build_number: option_env!("NUTRIPLAN_BUILD_NUMBER")
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),
            build_timestamp: option_env!("NUTRIPLAN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        }
    }

    /// One line per fact, for stderr at startup
    pub fn banner(&self) -> Vec<String> {
        vec![
            format!("NutriPlan {} (build {}, {})", self.version, self.build_number, self.build_timestamp),
            "Nutrition practice tools over MCP stdio: patients, assessments, diets, meal plans".to_string(),
        ]
    }
}

/// Print the startup banner to stderr; stdout carries the protocol
pub fn print_startup_banner() {
    for line in BuildInfo::current().banner() {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_version_and_build() {
        let info = BuildInfo {
            version: "1.2.3",
            build_number: 42,
            build_timestamp: "2026-01-05T10:00:00Z",
        };
        let banner = info.banner();
        assert_eq!(banner[0], "NutriPlan 1.2.3 (build 42, 2026-01-05T10:00:00Z)");
        assert!(banner[1].contains("MCP"));
    }

    #[test]
    fn current_uses_package_version() {
        assert_eq!(BuildInfo::current().version, VERSION);
    }
}
