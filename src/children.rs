// 👶 Child Extractor - flatten each account's children into one table

use crate::error::{RecordsError, Result};
use crate::normalizer::AccountRecord;
use crate::parser::{ChildrenField, RawChild};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// First run of one or two ASCII digits inside a delimited child entry
static AGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,2}").expect("AGE_REGEX is a valid regex pattern"));

/// Child - one row of the `Children` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub name: String,
    pub age: i64,
    /// `id` of the owning account from the same ingestion run
    pub index_parent: i64,
}

/// Build the children table from normalized accounts.
///
/// Accounts without children contribute nothing. A child without a usable
/// age fails the whole run.
pub fn extract_children(accounts: &[AccountRecord]) -> Result<Vec<Child>> {
    let mut children = Vec::new();

    for record in accounts {
        let parent = record.account.id;
        match &record.children {
            ChildrenField::Absent => {}
            ChildrenField::Nested(raw) => {
                for child in raw {
                    children.push(from_nested(child, parent)?);
                }
            }
            ChildrenField::Delimited(text) => {
                for piece in text.split(',') {
                    children.push(from_delimited(piece, parent)?);
                }
            }
        }
    }

    Ok(children)
}

fn from_nested(child: &RawChild, parent: i64) -> Result<Child> {
    let name = child
        .name
        .clone()
        .ok_or(RecordsError::MissingField { parent, field: "name" })?;
    let age = child
        .age
        .as_deref()
        .ok_or(RecordsError::MissingField { parent, field: "age" })?;

    let age = age.trim().parse::<i64>().map_err(|_| RecordsError::InvalidChildAge {
        parent,
        piece: format!("{} ({})", name, age),
    })?;

    Ok(Child {
        name,
        age,
        index_parent: parent,
    })
}

/// `"Jackie (9)"` → name `Jackie`, age 9
fn from_delimited(piece: &str, parent: i64) -> Result<Child> {
    let name = piece.split_whitespace().next().unwrap_or("").to_string();

    let age = AGE_REGEX
        .find(piece)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .ok_or_else(|| RecordsError::InvalidChildAge {
            parent,
            piece: piece.trim().to_string(),
        })?;

    Ok(Child {
        name,
        age,
        index_parent: parent,
    })
}
