// ⚙️ Settings - where source files live and where the database goes

use std::path::PathBuf;

/// Default directory scanned by `create-database`
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default SQLite file shared by ingestion and reports
pub const DEFAULT_DATABASE: &str = "users.sqlite3";

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "FAMILY_RECORDS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl Settings {
    pub fn new(data_dir: impl Into<PathBuf>, database_path: impl Into<PathBuf>) -> Self {
        Settings {
            data_dir: data_dir.into(),
            database_path: database_path.into(),
        }
    }

    /// Apply CLI overrides on top of the defaults
    pub fn with_overrides(data_dir: Option<PathBuf>, database_path: Option<PathBuf>) -> Self {
        let defaults = Settings::default();
        Settings {
            data_dir: data_dir.unwrap_or(defaults.data_dir),
            database_path: database_path.unwrap_or(defaults.database_path),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new(DEFAULT_DATA_DIR, DEFAULT_DATABASE)
    }
}
