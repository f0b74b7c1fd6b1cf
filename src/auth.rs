// 🔐 Authenticator - login (email or phone) + password, optional admin role

use crate::db::{credentials_match, Store};
use crate::error::Result;

/// What the caller typed on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            login: login.into(),
            password: password.into(),
        }
    }
}

pub struct Authenticator<'a> {
    store: &'a Store,
}

impl<'a> Authenticator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Authenticator { store }
    }

    /// True iff some account matches login and password exactly (and is an
    /// admin when `require_admin` is set). Plain equality, no normalization.
    pub fn validate(&self, credentials: &Credentials, require_admin: bool) -> Result<bool> {
        let valid = self.store.with_read_only(|conn| {
            credentials_match(conn, &credentials.login, &credentials.password, require_admin)
        })?;

        tracing::debug!(login = %credentials.login, require_admin, valid, "credentials checked");
        Ok(valid)
    }
}
