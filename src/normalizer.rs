// 🔍 Account Normalizer - clean, validate and deduplicate raw records
//
// Order matters: phone filter → email filter → required fields →
// phone formatting → timestamp formatting → newest-first dedup → ids.

use crate::parser::{ChildrenField, RawRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@]+@[^@.]+\.[A-Za-z0-9]{1,4}$").expect("EMAIL_REGEX is a valid regex pattern")
});

/// Country-code prefixes, tried in this order, anchored at the start
static PHONE_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+48|^48|^\(48\)|^00").expect("PHONE_PREFIX_REGEX is a valid regex pattern")
});

/// Canonical timestamp layout; sorts lexicographically in time order
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// CANONICAL TYPES
// ============================================================================

/// Account - canonical identity as stored in the `Users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Dense 0-based id, reassigned on every ingestion run
    pub id: i64,
    pub firstname: String,
    pub telephone_number: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub created_at: String,
}

/// An account that still carries the children field it was parsed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub account: Account,
    pub children: ChildrenField,
}

/// How many rows each normalization step dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub input: usize,
    pub missing_telephone: usize,
    pub invalid_email: usize,
    pub missing_fields: usize,
    pub duplicate_email: usize,
    pub duplicate_telephone: usize,
    pub accounts: usize,
}

impl NormalizationReport {
    pub fn dropped(&self) -> usize {
        self.input - self.accounts
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub accounts: Vec<AccountRecord>,
    pub report: NormalizationReport,
}

// ============================================================================
// FIELD RULES
// ============================================================================

/// `user@domain.tld` with a 1-4 character alphanumeric TLD
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Strip one leading `+48`, `48`, `(48)` or `00`, then every space
pub fn normalize_telephone(number: &str) -> String {
    PHONE_PREFIX_REGEX.replacen(number, 1, "").replace(' ', "")
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// Strings that are not recognisable timestamps are kept (trimmed) so they
/// still take part in the ordering.
pub fn format_created_at(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_utc().format(CREATED_AT_FORMAT).to_string();
    }

    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return dt.format(CREATED_AT_FORMAT).to_string();
        }
    }

    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return dt.format(CREATED_AT_FORMAT).to_string();
    }

    raw.to_string()
}

// ============================================================================
// NORMALIZER
// ============================================================================

pub struct AccountNormalizer;

struct Candidate {
    firstname: String,
    telephone_number: String,
    email: String,
    password: String,
    role: Option<String>,
    created_at: String,
    children: ChildrenField,
}

impl AccountNormalizer {
    pub fn new() -> Self {
        AccountNormalizer
    }

    /// Turn the merged raw table into the canonical account table.
    ///
    /// Empty input gives an empty table; invalid rows are dropped silently
    /// and only show up in the report counters.
    pub fn normalize(&self, records: Vec<RawRecord>) -> Normalized {
        let mut report = NormalizationReport {
            input: records.len(),
            ..NormalizationReport::default()
        };

        let mut candidates = Vec::with_capacity(records.len());

        for record in records {
            let Some(telephone) = record.telephone_number else {
                debug!(file = %record.source_file, line = record.line_number, "dropped: no telephone number");
                report.missing_telephone += 1;
                continue;
            };

            let Some(email) = record.email.filter(|e| is_valid_email(e)) else {
                debug!(file = %record.source_file, line = record.line_number, "dropped: invalid email");
                report.invalid_email += 1;
                continue;
            };

            let (Some(firstname), Some(password), Some(created_at)) =
                (record.firstname, record.password, record.created_at)
            else {
                debug!(file = %record.source_file, line = record.line_number, "dropped: missing required field");
                report.missing_fields += 1;
                continue;
            };

            candidates.push(Candidate {
                firstname,
                telephone_number: normalize_telephone(&telephone),
                email,
                password,
                role: record.role,
                created_at: format_created_at(&created_at),
                children: record.children,
            });
        }

        // Newest first; stable so ties keep merge order
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let before_email_dedup = candidates.len();
        let mut seen_emails = HashSet::new();
        candidates.retain(|c| seen_emails.insert(c.email.clone()));
        report.duplicate_email = before_email_dedup - candidates.len();

        let before_phone_dedup = candidates.len();
        let mut seen_phones = HashSet::new();
        candidates.retain(|c| seen_phones.insert(c.telephone_number.clone()));
        report.duplicate_telephone = before_phone_dedup - candidates.len();

        let accounts: Vec<AccountRecord> = candidates
            .into_iter()
            .enumerate()
            .map(|(idx, c)| AccountRecord {
                account: Account {
                    id: idx as i64,
                    firstname: c.firstname,
                    telephone_number: c.telephone_number,
                    email: c.email,
                    password: c.password,
                    role: c.role,
                    created_at: c.created_at,
                },
                children: c.children,
            })
            .collect();

        report.accounts = accounts.len();

        Normalized { accounts, report }
    }
}

impl Default for AccountNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
