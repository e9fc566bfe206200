//! # Student Store
//!
//! The narrow persistence seam of the generator. Pool derivation and
//! synthesis never touch a database; they only see what
//! [`StudentStore::load_reference`] returns and hand their output to
//! [`StudentStore::insert_batch`].
//!
//! - **PostgreSQL** ([`postgres::PgStore`]): enum and integer columns are cast
//!   on read so custom types like `student_status` decode as text. A `NULL`
//!   status reads as the column default, `active`.
//! - **SQLite** ([`sqlite::SqliteStore`]): requires SQLite 3.35+ for
//!   `INSERT ... RETURNING`.
//!
//! Both backends insert a batch as a single multi-row `INSERT ... RETURNING`
//! inside one transaction: either every row lands or none do.

pub mod postgres;
pub mod sqlite;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudentSeedError};
use crate::record::{NewStudent, StudentRecord, STUDENTS_TABLE, WRITABLE_COLUMNS};

/// Persistence operations the generator depends on.
pub trait StudentStore: Send + Sync {
    /// Up to `limit` existing records ordered by identifier. An empty store
    /// yields an empty vector, not an error.
    fn load_reference(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<StudentRecord>>> + Send;

    /// Insert all records in one statement and transaction, returning the
    /// store-assigned identifiers in ascending order, which matches the order
    /// of `records`. On error nothing is persisted.
    fn insert_batch(
        &self,
        records: &[NewStudent],
    ) -> impl Future<Output = Result<Vec<i64>>> + Send;
}

impl<S: StudentStore> StudentStore for std::sync::Arc<S> {
    fn load_reference(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<StudentRecord>>> + Send {
        (**self).load_reference(limit)
    }

    fn insert_batch(
        &self,
        records: &[NewStudent],
    ) -> impl Future<Output = Result<Vec<i64>>> + Send {
        (**self).insert_batch(records)
    }
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

/// Determine the database type from a connection URL.
pub fn database_type_from_url(url: &str) -> Result<DatabaseType> {
    let scheme = url.split(':').next().unwrap_or("");
    match scheme {
        "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
        "sqlite" => Ok(DatabaseType::SQLite),
        other => Err(StudentSeedError::UnsupportedDatabase {
            scheme: other.to_string(),
        }),
    }
}

/// Connection knobs shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// How long to wait for a connection before giving up.
    pub connect_timeout: Duration,
    /// Table read from and written to.
    pub table: String,
    /// Destination columns; record fields outside this list are not written.
    pub columns: Vec<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            table: STUDENTS_TABLE.to_string(),
            columns: WRITABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Discrete PostgreSQL connection parameters, as accepted by the CLI flags
/// and the service's query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "lms-postgres".to_string(),
            port: 5432,
            dbname: "lms_db".to_string(),
            user: "postgres".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl ConnectionParams {
    /// Build a `postgres://` URL, percent-encoding credentials as needed.
    pub fn to_url(&self) -> Result<String> {
        let invalid = |what: &str| StudentSeedError::Config {
            message: format!("Invalid database {} in connection parameters", what),
        };
        let mut url = url::Url::parse("postgres://localhost").map_err(|_| invalid("url"))?;
        url.set_host(Some(&self.host)).map_err(|_| invalid("host"))?;
        url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("password"))?;
        }
        url.set_path(&self.dbname);
        Ok(url.to_string())
    }
}

/// A store for whichever backend the URL names.
pub enum DatabaseStore {
    Postgres(postgres::PgStore),
    Sqlite(sqlite::SqliteStore),
}

impl DatabaseStore {
    pub async fn connect(url: &str, options: &StoreOptions) -> Result<Self> {
        match database_type_from_url(url)? {
            DatabaseType::PostgreSQL => Ok(Self::Postgres(
                postgres::PgStore::connect(url, options).await?,
            )),
            DatabaseType::SQLite => Ok(Self::Sqlite(
                sqlite::SqliteStore::connect(url, options).await?,
            )),
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        match self {
            Self::Postgres(_) => DatabaseType::PostgreSQL,
            Self::Sqlite(_) => DatabaseType::SQLite,
        }
    }

    pub async fn close(&self) {
        match self {
            Self::Postgres(s) => s.close().await,
            Self::Sqlite(s) => s.close().await,
        }
    }
}

impl StudentStore for DatabaseStore {
    async fn load_reference(&self, limit: u64) -> Result<Vec<StudentRecord>> {
        match self {
            Self::Postgres(s) => s.load_reference(limit).await,
            Self::Sqlite(s) => s.load_reference(limit).await,
        }
    }

    async fn insert_batch(&self, records: &[NewStudent]) -> Result<Vec<i64>> {
        match self {
            Self::Postgres(s) => s.insert_batch(records).await,
            Self::Sqlite(s) => s.insert_batch(records).await,
        }
    }
}

/// Row shape returned by [`reference_query`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReferenceRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    date_of_birth: Option<chrono::NaiveDate>,
    gender: Option<String>,
    enrollment_date: chrono::NaiveDate,
    status: String,
    created_at: Option<chrono::NaiveDateTime>,
    updated_at: Option<chrono::NaiveDateTime>,
}

impl ReferenceRow {
    pub(crate) fn into_record(self) -> Result<StudentRecord> {
        let status =
            self.status
                .parse()
                .map_err(|_| StudentSeedError::InvalidReferenceValue {
                    column: "status".to_string(),
                    value: self.status.clone(),
                    row_id: self.id,
                })?;
        Ok(StudentRecord {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            enrollment_date: self.enrollment_date,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `SELECT` for up to `limit` reference rows ordered by id.
pub fn reference_query(table: &str, limit: u64, db_type: DatabaseType) -> String {
    let t = quote_identifier(table);
    match db_type {
        DatabaseType::PostgreSQL => format!(
            "SELECT CAST(\"id\" AS BIGINT) AS id, first_name, last_name, email, phone, \
             date_of_birth, gender, enrollment_date, \
             COALESCE(CAST(\"status\" AS TEXT), 'active') AS status, \
             CAST(created_at AS TIMESTAMP) AS created_at, \
             CAST(updated_at AS TIMESTAMP) AS updated_at \
             FROM {} ORDER BY \"id\" LIMIT {}",
            t, limit
        ),
        DatabaseType::SQLite => format!(
            "SELECT id, first_name, last_name, email, phone, \
             date_of_birth, gender, enrollment_date, status, created_at, updated_at \
             FROM {} ORDER BY \"id\" LIMIT {}",
            t, limit
        ),
    }
}

/// Build one multi-row `INSERT ... RETURNING id` for the batch.
///
/// Produces: `INSERT INTO "t" ("c1", "c2") VALUES (v1, v2), (v3, v4) RETURNING ...`.
/// Only columns a `NewStudent` knows are written; unknown names are dropped.
/// Returns `None` if there is nothing to insert.
pub fn build_insert_returning<S: AsRef<str>>(
    table: &str,
    columns: &[S],
    records: &[NewStudent],
) -> Option<String> {
    let first = records.first()?;
    let known: Vec<String> = first.to_row(columns).into_keys().collect();
    if known.is_empty() {
        return None;
    }

    let col_list = known
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", quote_identifier(table), col_list);

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        let row = record.to_row(&known);
        for (j, value) in row.values().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&value.to_sql_literal());
        }
        sql.push(')');
    }

    sql.push_str(" RETURNING CAST(\"id\" AS BIGINT) AS id");
    Some(sql)
}

/// Quote a SQL identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Truncate a SQL string for error messages.
pub(crate) fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        return sql.to_string();
    }
    let mut end = max_len;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

/// Sanitize a database URL for error messages (hide password).
pub fn sanitize_url(db_url: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(db_url) {
        if parsed.password().is_some() {
            let _ = parsed.set_password(Some("****"));
        }
        return parsed.to_string();
    }
    // If URL parsing fails, return as-is (e.g., SQLite file paths)
    db_url.to_string()
}
