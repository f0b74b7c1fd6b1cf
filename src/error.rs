// ⚠️ Error taxonomy for ingestion, storage and reports
//
// Validation failures never show up here: dropped rows are counted in the
// NormalizationReport. Failed logins are a ReportOutcome, not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the ingestion pipeline, the store and the reports
#[derive(Error, Debug)]
pub enum RecordsError {
    /// A source file could not be parsed in its declared format
    #[error("Failed to parse {}: {message}", .path.display())]
    IngestParse { path: PathBuf, message: String },

    /// A nested child record lacks a mandatory field
    #[error("Missing field '{field}' in a child of account {parent}")]
    MissingField { parent: i64, field: &'static str },

    /// A child entry carries no usable age
    #[error("No age found for child '{piece}' of account {parent}")]
    InvalidChildAge { parent: i64, piece: String },

    /// The database file cannot be opened or lacks its tables (ingestion never ran)
    #[error(
        "Cannot read database {}: {source}. Run `create-database` first",
        .path.display()
    )]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A report query came back empty where rows were expected
    #[error("No result from database: {0}")]
    EmptyResult(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordsError {
    pub(crate) fn parse(path: &std::path::Path, message: impl ToString) -> Self {
        RecordsError::IngestParse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, RecordsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_store_unavailable_mentions_create_database() {
        let err = RecordsError::StoreUnavailable {
            path: PathBuf::from("users.sqlite3"),
            source: rusqlite::Error::InvalidQuery,
        };

        let message = err.to_string();
        assert!(message.contains("users.sqlite3"));
        assert!(message.contains("create-database"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = RecordsError::parse(Path::new("data/a.json"), "expected value");
        assert_eq!(err.to_string(), "Failed to parse data/a.json: expected value");
    }
}
