use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{Result, StudentSeedError};
use crate::record::{NewStudent, StudentRecord};
use crate::store::{
    build_insert_returning, quote_identifier, reference_query, sanitize_url, truncate_sql,
    DatabaseType, ReferenceRow, StoreOptions, StudentStore,
};

/// DDL for a local students table, for databases that start empty.
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "first_name" TEXT NOT NULL,
    "last_name" TEXT NOT NULL,
    "email" TEXT NOT NULL UNIQUE,
    "phone" TEXT,
    "date_of_birth" DATE,
    "gender" TEXT,
    "enrollment_date" DATE NOT NULL,
    "status" TEXT NOT NULL DEFAULT 'active'
        CHECK ("status" IN ('active', 'inactive', 'graduated')),
    "created_at" DATETIME DEFAULT CURRENT_TIMESTAMP,
    "updated_at" DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#,
        quote_identifier(table)
    )
}

/// SQLite-backed student store.
///
/// Uses a single connection, so `sqlite::memory:` databases stay alive for
/// the lifetime of the store.
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
    columns: Vec<String>,
}

impl SqliteStore {
    pub async fn connect(url: &str, options: &StoreOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(options.connect_timeout)
            .connect(url)
            .await
            .map_err(|e| StudentSeedError::Connection {
                message: "Failed to open SQLite database".to_string(),
                connection_hint: sanitize_url(url),
                source: e,
            })?;
        info!(url = %url, "Opened SQLite database");

        Ok(Self {
            pool,
            table: options.table.clone(),
            columns: options.columns.clone(),
        })
    }

    /// Create the student table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        let sql = create_table_sql(&self.table);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StudentSeedError::Load {
                query: truncate_sql(&sql, 200),
                source: e,
            })?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl StudentStore for SqliteStore {
    async fn load_reference(&self, limit: u64) -> Result<Vec<StudentRecord>> {
        let sql = reference_query(&self.table, limit, DatabaseType::SQLite);
        let rows: Vec<ReferenceRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StudentSeedError::Load {
                query: truncate_sql(&sql, 200),
                source: e,
            })?;

        debug!(rows = rows.len(), limit, "Loaded reference rows");
        rows.into_iter().map(ReferenceRow::into_record).collect()
    }

    async fn insert_batch(&self, records: &[NewStudent]) -> Result<Vec<i64>> {
        let Some(sql) = build_insert_returning(&self.table, &self.columns, records) else {
            return Ok(Vec::new());
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StudentSeedError::InsertFailed {
                row_count: records.len(),
                message: "Failed to begin transaction".to_string(),
                sql_preview: "BEGIN".to_string(),
                source: e,
            })?;

        let rows = sqlx::query(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StudentSeedError::InsertFailed {
                row_count: records.len(),
                message: "INSERT failed within transaction".to_string(),
                sql_preview: truncate_sql(&sql, 200),
                source: e,
            })?;

        let mut ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StudentSeedError::InsertFailed {
                row_count: records.len(),
                message: "Could not read returned ids".to_string(),
                sql_preview: truncate_sql(&sql, 200),
                source: e,
            })?;
        // RETURNING row order is unspecified; ids from one statement ascend.
        ids.sort_unstable();

        tx.commit().await.map_err(|e| StudentSeedError::InsertFailed {
            row_count: records.len(),
            message: "Failed to commit transaction".to_string(),
            sql_preview: "COMMIT".to_string(),
            source: e,
        })?;

        info!(inserted = ids.len(), table = %self.table, "Inserted synthetic students");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StudentStatus;
    use chrono::NaiveDate;

    async fn memory_store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:", &StoreOptions::default())
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    fn student(email: &str) -> NewStudent {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        NewStudent {
            first_name: "Liis".to_string(),
            last_name: "Kask".to_string(),
            email: email.to_string(),
            phone: "+3725550000".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2001, 1, 31).unwrap(),
            gender: Some("female".to_string()),
            enrollment_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            status: StudentStatus::Graduated,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let store = memory_store().await;
        assert!(store.load_reference(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_then_load_round_trip() {
        let store = memory_store().await;
        let ids = store
            .insert_batch(&[student("a@x.ee"), student("b@x.ee"), student("c@x.ee")])
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);

        let loaded = store.load_reference(2).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(loaded[0].email, "a@x.ee");
        assert_eq!(loaded[1].status, StudentStatus::Graduated);
        assert_eq!(
            loaded[0].date_of_birth,
            Some(NaiveDate::from_ymd_opt(2001, 1, 31).unwrap())
        );
    }

    #[tokio::test]
    async fn test_returned_ids_follow_batch_order() {
        let store = memory_store().await;
        let batch: Vec<NewStudent> = (0..25)
            .map(|i| student(&format!("s{}@x.ee", i)))
            .collect();
        let ids = store.insert_batch(&batch).await.unwrap();
        assert_eq!(ids, (1..=25).collect::<Vec<i64>>());

        let loaded = store.load_reference(100).await.unwrap();
        for (id, record) in ids.iter().zip(&batch) {
            let row = loaded.iter().find(|r| r.id == *id).unwrap();
            assert_eq!(row.email, record.email);
        }
    }

    #[tokio::test]
    async fn test_failed_batch_persists_nothing() {
        let store = memory_store().await;
        // Duplicate email violates the UNIQUE constraint mid-batch.
        let err = store
            .insert_batch(&[student("dup@x.ee"), student("dup@x.ee")])
            .await
            .unwrap_err();
        assert!(matches!(err, StudentSeedError::InsertFailed { .. }));
        assert!(store.load_reference(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = memory_store().await;
        assert!(store.insert_batch(&[]).await.unwrap().is_empty());
    }
}
