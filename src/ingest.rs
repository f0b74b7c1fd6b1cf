// 🗄️ Ingestion - files → raw records → accounts + children → SQLite
//
// One-shot batch job. Any unreadable file aborts the run before the
// database is touched.

use crate::children::{extract_children, Child};
use crate::collector::collect_files;
use crate::config::Settings;
use crate::db::Store;
use crate::error::Result;
use crate::normalizer::{Account, AccountNormalizer, NormalizationReport};
use crate::parser::{detect_format, get_parser, RawRecord};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// What a `create-database` run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub files: usize,
    pub skipped_files: usize,
    pub records: usize,
    pub accounts: usize,
    pub children: usize,
    pub report: NormalizationReport,
}

/// Output of the pipeline before it is written anywhere
#[derive(Debug, Clone)]
pub struct IngestedTables {
    pub accounts: Vec<Account>,
    pub children: Vec<Child>,
    pub summary: IngestSummary,
}

/// Parse every supported file and concatenate the rows in path order.
///
/// Returns the rows and the number of files skipped for their extension.
pub fn merge_sources(paths: &[PathBuf]) -> Result<(Vec<RawRecord>, usize)> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for path in paths {
        let Some(format) = detect_format(path) else {
            debug!(file = %path.display(), "skipping unsupported file");
            skipped += 1;
            continue;
        };

        let parsed = get_parser(format).parse(path)?;
        info!(
            file = %path.display(),
            source_format = format.name(),
            records = parsed.len(),
            "parsed source file"
        );
        records.extend(parsed);
    }

    Ok((records, skipped))
}

/// Run collection, parsing, normalization and child extraction
pub fn build_tables(settings: &Settings) -> Result<IngestedTables> {
    let files = collect_files(&settings.data_dir)?;
    let (records, skipped_files) = merge_sources(&files)?;
    let record_count = records.len();

    let normalized = AccountNormalizer::new().normalize(records);
    let children = extract_children(&normalized.accounts)?;
    let report = normalized.report;

    info!(
        input = report.input,
        missing_telephone = report.missing_telephone,
        invalid_email = report.invalid_email,
        missing_fields = report.missing_fields,
        duplicate_email = report.duplicate_email,
        duplicate_telephone = report.duplicate_telephone,
        accounts = report.accounts,
        "normalized accounts"
    );

    let accounts: Vec<Account> = normalized.accounts.into_iter().map(|r| r.account).collect();

    let summary = IngestSummary {
        files: files.len() - skipped_files,
        skipped_files,
        records: record_count,
        accounts: accounts.len(),
        children: children.len(),
        report,
    };

    Ok(IngestedTables {
        accounts,
        children,
        summary,
    })
}

/// Build both tables and overwrite them in the configured database
pub fn create_database(settings: &Settings) -> Result<IngestSummary> {
    let tables = build_tables(settings)?;

    Store::new(&settings.database_path).replace_all(&tables.accounts, &tables.children)?;
    info!(
        database = %settings.database_path.display(),
        accounts = tables.summary.accounts,
        children = tables.summary.children,
        "database written"
    );

    Ok(tables.summary)
}
