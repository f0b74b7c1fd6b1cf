// 🗄️ Store - SQLite file holding the Users and Children tables
//
// Ingestion replaces both tables in one transaction. Reports open their own
// read-only connection per call; it is dropped when the call returns.

use crate::children::Child;
use crate::error::{RecordsError, Result};
use crate::normalizer::Account;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// ROW TYPES
// ============================================================================

/// `name, age` pair as shown by the children reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildSummary {
    pub name: String,
    pub age: i64,
}

/// Parent of a child matched by age
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentSummary {
    pub id: i64,
    pub firstname: String,
    pub telephone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeGroup {
    pub age: i64,
    pub count: i64,
}

/// Result of an ad-hoc query: column names plus raw values
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Handle on the database file; connections are opened per operation
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Store { path: path.into() }
    }

    /// Drop and rewrite both tables (creates the file if needed)
    pub fn replace_all(&self, accounts: &[Account], children: &[Child]) -> Result<()> {
        let mut conn = Connection::open(&self.path)?;
        write_tables(&mut conn, accounts, children)
    }

    /// Run `f` against a read-only connection that is closed afterwards.
    ///
    /// A file without the expected tables was never ingested into and is
    /// reported like a missing one.
    pub fn with_read_only<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = open_read_only(&self.path)?;
        f(&conn).map_err(|err| match err {
            RecordsError::Database(source) if is_missing_table(&source) => {
                RecordsError::StoreUnavailable {
                    path: self.path.clone(),
                    source,
                }
            }
            other => other,
        })
    }

    /// Execute ad-hoc SQL against a read-only connection
    pub fn query(&self, sql: &str) -> Result<QueryTable> {
        self.with_read_only(|conn| run_query(conn, sql))
    }
}

pub fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| RecordsError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.starts_with("no such table")
    )
}

// ============================================================================
// SCHEMA & WRITES
// ============================================================================

/// Recreate empty Users and Children tables
pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS Users;
         DROP TABLE IF EXISTS Children;

         CREATE TABLE Users (
            id_user INTEGER PRIMARY KEY,
            firstname TEXT NOT NULL,
            telephone_number TEXT NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL,
            role TEXT,
            created_at TEXT NOT NULL
         );

         CREATE TABLE Children (
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            index_parent INTEGER NOT NULL
         );",
    )?;

    Ok(())
}

/// Replace both tables atomically
pub fn write_tables(conn: &mut Connection, accounts: &[Account], children: &[Child]) -> Result<()> {
    let tx = conn.transaction()?;
    setup_database(&tx)?;
    insert_accounts(&tx, accounts)?;
    insert_children(&tx, children)?;
    tx.commit()?;
    Ok(())
}

pub fn insert_accounts(conn: &Connection, accounts: &[Account]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO Users (
            id_user, firstname, telephone_number, email, password, role, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for account in accounts {
        stmt.execute(params![
            account.id,
            account.firstname,
            account.telephone_number,
            account.email,
            account.password,
            account.role,
            account.created_at,
        ])?;
    }

    Ok(accounts.len())
}

pub fn insert_children(conn: &Connection, children: &[Child]) -> Result<usize> {
    let mut stmt =
        conn.prepare("INSERT INTO Children (name, age, index_parent) VALUES (?1, ?2, ?3)")?;

    for child in children {
        stmt.execute(params![child.name, child.age, child.index_parent])?;
    }

    Ok(children.len())
}

// ============================================================================
// QUERIES
// ============================================================================

/// Run arbitrary SQL and collect every row
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryTable> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(QueryTable { columns, rows })
}

/// Does an account with this login (email or phone) and password exist?
pub fn credentials_match(
    conn: &Connection,
    login: &str,
    password: &str,
    require_admin: bool,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM Users
         WHERE (email = ?1 OR telephone_number = ?1)
           AND password = ?2
           AND (?3 = 0 OR role = 'admin')",
        params![login, password, require_admin],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

pub fn count_accounts(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM Users", [], |row| row.get(0))?;
    Ok(count)
}

/// Account with the smallest `created_at` (string order)
pub fn oldest_account(conn: &Connection) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id_user, firstname, telephone_number, email, password, role, created_at
             FROM Users
             ORDER BY created_at, id_user
             LIMIT 1",
            [],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    firstname: row.get(1)?,
                    telephone_number: row.get(2)?,
                    email: row.get(3)?,
                    password: row.get(4)?,
                    role: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )
        .optional()?;

    Ok(account)
}

/// Children per age, smallest groups first
pub fn age_groups(conn: &Connection) -> Result<Vec<AgeGroup>> {
    let mut stmt = conn.prepare(
        "SELECT age, COUNT(*) FROM Children
         GROUP BY age
         ORDER BY COUNT(*), age",
    )?;

    let groups = stmt
        .query_map([], |row| {
            Ok(AgeGroup {
                age: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(groups)
}

/// Children of whichever account(s) the login resolves to, by name
pub fn children_of_login(conn: &Connection, login: &str) -> Result<Vec<ChildSummary>> {
    let mut stmt = conn.prepare(
        "SELECT Children.name, Children.age
         FROM Children
         JOIN Users ON Users.id_user = Children.index_parent
         WHERE Users.email = ?1 OR Users.telephone_number = ?1
         ORDER BY Children.name, Children.age",
    )?;

    let children = stmt
        .query_map([login], child_summary)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(children)
}

/// Distinct ages of the login's children, in the order they were stored
pub fn child_ages_of_login(conn: &Connection, login: &str) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT Children.age
         FROM Children
         JOIN Users ON Users.id_user = Children.index_parent
         WHERE Users.email = ?1 OR Users.telephone_number = ?1
         GROUP BY Children.age
         ORDER BY MIN(Children.rowid)",
    )?;

    let ages = stmt
        .query_map([login], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;

    Ok(ages)
}

/// Parents of children aged `age`, excluding the login's own account(s).
///
/// One row per matching child, in child-name order.
pub fn parents_with_child_age(
    conn: &Connection,
    age: i64,
    excluded_login: &str,
) -> Result<Vec<ParentSummary>> {
    let mut stmt = conn.prepare(
        "SELECT Users.id_user, Users.firstname, Users.telephone_number
         FROM Children
         JOIN Users ON Users.id_user = Children.index_parent
         WHERE Children.age = ?1
           AND NOT (Users.email = ?2 OR Users.telephone_number = ?2)
         ORDER BY Children.name",
    )?;

    let parents = stmt
        .query_map(params![age, excluded_login], |row| {
            Ok(ParentSummary {
                id: row.get(0)?,
                firstname: row.get(1)?,
                telephone_number: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(parents)
}

pub fn children_of_parent(conn: &Connection, parent_id: i64) -> Result<Vec<ChildSummary>> {
    let mut stmt = conn.prepare(
        "SELECT name, age FROM Children
         WHERE index_parent = ?1
         ORDER BY name, age",
    )?;

    let children = stmt
        .query_map([parent_id], child_summary)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(children)
}

fn child_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChildSummary> {
    Ok(ChildSummary {
        name: row.get(0)?,
        age: row.get(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, name: &str, phone: &str, email: &str, role: Option<&str>, created_at: &str) -> Account {
        Account {
            id,
            firstname: name.to_string(),
            telephone_number: phone.to_string(),
            email: email.to_string(),
            password: format!("{}-pw", name.to_lowercase()),
            role: role.map(|r| r.to_string()),
            created_at: created_at.to_string(),
        }
    }

    fn child(name: &str, age: i64, parent: i64) -> Child {
        Child {
            name: name.to_string(),
            age,
            index_parent: parent,
        }
    }

    fn seeded() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        let accounts = vec![
            account(0, "Brenda", "600100200", "brenda@example.org", Some("admin"), "2023-06-01 10:00:00"),
            account(1, "Justin", "600100201", "justin@example.org", None, "2022-11-25 02:19:37"),
            account(2, "Kim", "600100202", "kim@example.net", Some("user"), "2023-01-01 00:00:00"),
        ];
        let children = vec![
            child("Mitchell", 6, 1),
            child("Jackie", 9, 1),
            child("Andrew", 4, 2),
            child("Teresa", 9, 2),
        ];
        write_tables(&mut conn, &accounts, &children).unwrap();
        conn
    }

    #[test]
    fn test_write_tables_replaces_previous_run() {
        let mut conn = seeded();
        assert_eq!(count_accounts(&conn).unwrap(), 3);

        let accounts = vec![account(0, "Solo", "1", "solo@example.com", None, "2024-01-01 00:00:00")];
        write_tables(&mut conn, &accounts, &[]).unwrap();

        assert_eq!(count_accounts(&conn).unwrap(), 1);
        assert!(age_groups(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_credentials_match() {
        let conn = seeded();

        assert!(credentials_match(&conn, "brenda@example.org", "brenda-pw", true).unwrap());
        assert!(credentials_match(&conn, "600100200", "brenda-pw", true).unwrap());
        assert!(!credentials_match(&conn, "brenda@example.org", "xyz", true).unwrap());
        // non-admin may log in, but not as admin
        assert!(credentials_match(&conn, "justin@example.org", "justin-pw", false).unwrap());
        assert!(!credentials_match(&conn, "justin@example.org", "justin-pw", true).unwrap());
        // no normalization on the query side
        assert!(!credentials_match(&conn, "+48 600100200", "brenda-pw", false).unwrap());
    }

    #[test]
    fn test_oldest_account() {
        let conn = seeded();
        let oldest = oldest_account(&conn).unwrap().unwrap();
        assert_eq!(oldest.firstname, "Justin");
        assert_eq!(oldest.created_at, "2022-11-25 02:19:37");
    }

    #[test]
    fn test_age_groups_ordered_by_count() {
        let conn = seeded();
        let groups = age_groups(&conn).unwrap();

        assert_eq!(
            groups,
            vec![
                AgeGroup { age: 4, count: 1 },
                AgeGroup { age: 6, count: 1 },
                AgeGroup { age: 9, count: 2 },
            ]
        );
    }

    #[test]
    fn test_children_of_login_sorted_by_name() {
        let conn = seeded();
        let children = children_of_login(&conn, "600100201").unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Jackie", "Mitchell"]);
    }

    #[test]
    fn test_child_ages_in_stored_order() {
        let conn = seeded();
        assert_eq!(child_ages_of_login(&conn, "justin@example.org").unwrap(), vec![6, 9]);
        assert_eq!(child_ages_of_login(&conn, "600100202").unwrap(), vec![4, 9]);
        assert!(child_ages_of_login(&conn, "brenda@example.org").unwrap().is_empty());
    }

    #[test]
    fn test_parents_with_child_age_excludes_caller() {
        let conn = seeded();

        let parents = parents_with_child_age(&conn, 9, "justin@example.org").unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].firstname, "Kim");

        let children = children_of_parent(&conn, parents[0].id).unwrap();
        assert_eq!(
            children,
            vec![
                ChildSummary { name: "Andrew".to_string(), age: 4 },
                ChildSummary { name: "Teresa".to_string(), age: 9 },
            ]
        );
    }

    #[test]
    fn test_store_query_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_database.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE test_table (id INTEGER, name TEXT);
                 INSERT INTO test_table (id, name) VALUES (1, 'Alicja');
                 INSERT INTO test_table (id, name) VALUES (2, 'Patryk');",
            )
            .unwrap();
        }

        let store = Store::new(&path);
        let table = store.query("SELECT * FROM test_table").unwrap();

        assert_eq!(table.columns, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(
            table.rows,
            vec![
                vec![Value::Integer(1), Value::Text("Alicja".to_string())],
                vec![Value::Integer(2), Value::Text("Patryk".to_string())],
            ]
        );

        let write = store.query("DELETE FROM test_table");
        assert!(matches!(write, Err(RecordsError::Database(_))));
    }

    #[test]
    fn test_missing_store_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("never-created.sqlite3"));

        let result = store.query("SELECT 1");
        assert!(matches!(result, Err(RecordsError::StoreUnavailable { .. })));
    }

    #[test]
    fn test_store_without_tables_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.sqlite3");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER);")
            .unwrap();

        let result = Store::new(&path).with_read_only(count_accounts);

        match result {
            Err(err @ RecordsError::StoreUnavailable { .. }) => {
                assert!(err.to_string().contains("create-database"));
            }
            other => panic!("expected StoreUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_replace_all_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("users.sqlite3"));
        let accounts = vec![account(0, "Ann", "123", "ann@example.com", None, "2023-01-01 00:00:00")];
        let children = vec![child("Zoe", 7, 0)];

        store.replace_all(&accounts, &children).unwrap();

        let count = store.with_read_only(count_accounts).unwrap();
        assert_eq!(count, 1);
        let table = store.query("SELECT name, age, index_parent FROM Children").unwrap();
        assert_eq!(
            table.rows,
            vec![vec![Value::Text("Zoe".to_string()), Value::Integer(7), Value::Integer(0)]]
        );
    }
}
