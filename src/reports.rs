// 📊 Report Engine - five fixed, authenticated reports rendered as text

use crate::auth::{Authenticator, Credentials};
use crate::db::{
    age_groups, child_ages_of_login, children_of_login, children_of_parent, count_accounts,
    oldest_account, parents_with_child_age, ChildSummary, Store,
};
use crate::error::{RecordsError, Result};
use std::collections::HashSet;
use std::fmt;

/// Literal shown instead of a report when authentication fails
pub const INVALID_LOGIN: &str = "Invalid Login";

// ============================================================================
// REPORT KINDS & OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    CountAccounts,
    OldestAccount,
    GroupChildrenByAge,
    ListOwnChildren,
    FindSimilarChildrenByAge,
}

impl ReportKind {
    /// Admin-only reports; the children reports are open to every account
    pub fn requires_admin(&self) -> bool {
        match self {
            ReportKind::CountAccounts
            | ReportKind::OldestAccount
            | ReportKind::GroupChildrenByAge => true,
            ReportKind::ListOwnChildren | ReportKind::FindSimilarChildrenByAge => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Rendered(String),
    InvalidLogin,
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::Rendered(text) => f.write_str(text),
            ReportOutcome::InvalidLogin => f.write_str(INVALID_LOGIN),
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ReportEngine<'a> {
    store: &'a Store,
}

impl<'a> ReportEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        ReportEngine { store }
    }

    /// Authenticate, then render the requested report
    pub fn run(&self, kind: ReportKind, credentials: &Credentials) -> Result<ReportOutcome> {
        let authenticator = Authenticator::new(self.store);
        if !authenticator.validate(credentials, kind.requires_admin())? {
            tracing::warn!(login = %credentials.login, report = ?kind, "invalid login");
            return Ok(ReportOutcome::InvalidLogin);
        }

        let text = match kind {
            ReportKind::CountAccounts => self.count_accounts()?,
            ReportKind::OldestAccount => self.oldest_account()?,
            ReportKind::GroupChildrenByAge => self.group_children_by_age()?,
            ReportKind::ListOwnChildren => self.list_own_children(&credentials.login)?,
            ReportKind::FindSimilarChildrenByAge => {
                self.find_similar_children_by_age(&credentials.login)?
            }
        };

        Ok(ReportOutcome::Rendered(text))
    }

    fn count_accounts(&self) -> Result<String> {
        let count = self.store.with_read_only(count_accounts)?;
        Ok(count.to_string())
    }

    fn oldest_account(&self) -> Result<String> {
        let account = self
            .store
            .with_read_only(oldest_account)?
            .ok_or(RecordsError::EmptyResult("no accounts stored"))?;

        Ok([
            format!("name: {}", account.firstname),
            format!("email_adress: {}", account.email),
            format!("created_at: {}", account.created_at),
        ]
        .join("\n"))
    }

    fn group_children_by_age(&self) -> Result<String> {
        let groups = self.store.with_read_only(age_groups)?;
        if groups.is_empty() {
            return Err(RecordsError::EmptyResult("no children stored"));
        }

        Ok(groups
            .iter()
            .map(|g| format!("age: {}, count: {}", g.age, g.count))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn list_own_children(&self, login: &str) -> Result<String> {
        let children = self
            .store
            .with_read_only(|conn| children_of_login(conn, login))?;
        if children.is_empty() {
            return Err(RecordsError::EmptyResult("account has no children"));
        }

        Ok(children.iter().map(render_child).collect::<Vec<_>>().join("\n"))
    }

    /// Other accounts sharing at least one child age with the caller, each
    /// listed once with all of its children.
    fn find_similar_children_by_age(&self, login: &str) -> Result<String> {
        let lines = self.store.with_read_only(|conn| {
            let ages = child_ages_of_login(conn, login)?;
            if ages.is_empty() {
                return Err(RecordsError::EmptyResult("account has no children"));
            }

            let mut seen = HashSet::new();
            let mut lines = Vec::new();
            for age in ages {
                for parent in parents_with_child_age(conn, age, login)? {
                    let listing = children_of_parent(conn, parent.id)?
                        .iter()
                        .map(render_child)
                        .collect::<Vec<_>>()
                        .join("; ");
                    let line = format!(
                        "{}, {}: {}",
                        parent.firstname, parent.telephone_number, listing
                    );
                    if seen.insert(line.clone()) {
                        lines.push(line);
                    }
                }
            }
            Ok(lines)
        })?;

        if lines.is_empty() {
            return Err(RecordsError::EmptyResult(
                "no other account has children of the same age",
            ));
        }

        Ok(lines.join("\n"))
    }
}

fn render_child(child: &ChildSummary) -> String {
    format!("{}, {}", child.name, child.age)
}
