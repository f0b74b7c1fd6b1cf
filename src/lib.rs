// Family Records - Core Library
// Ingestion pipeline (CSV/JSON/XML → SQLite) and authenticated reports

pub mod auth;
pub mod children;
pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod normalizer;
pub mod parser;
pub mod reports;

// Re-export commonly used types
pub use auth::{Authenticator, Credentials};
pub use children::{extract_children, Child};
pub use collector::collect_files;
pub use config::Settings;
pub use db::{QueryTable, Store};
pub use error::{RecordsError, Result};
pub use ingest::{build_tables, create_database, merge_sources, IngestSummary};
pub use normalizer::{
    format_created_at, is_valid_email, normalize_telephone, Account, AccountNormalizer,
    AccountRecord, NormalizationReport,
};
pub use parser::{
    detect_format, get_parser, ChildrenField, CsvParser, JsonParser, RawChild, RawRecord,
    RecordParser, SourceFormat, XmlParser,
};
pub use reports::{ReportEngine, ReportKind, ReportOutcome, INVALID_LOGIN};
