use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{Result, StudentSeedError};
use crate::record::{NewStudent, StudentRecord};
use crate::store::{
    build_insert_returning, reference_query, sanitize_url, truncate_sql, DatabaseType,
    ReferenceRow, StoreOptions, StudentStore,
};

/// PostgreSQL-backed student store.
pub struct PgStore {
    pool: PgPool,
    table: String,
    columns: Vec<String>,
}

impl PgStore {
    pub async fn connect(url: &str, options: &StoreOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(options.connect_timeout)
            .connect(url)
            .await
            .map_err(|e| StudentSeedError::Connection {
                message: "Failed to connect to PostgreSQL".to_string(),
                connection_hint: sanitize_url(url),
                source: e,
            })?;
        info!(url = %sanitize_url(url), "Connected to PostgreSQL");

        Ok(Self {
            pool,
            table: options.table.clone(),
            columns: options.columns.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl StudentStore for PgStore {
    async fn load_reference(&self, limit: u64) -> Result<Vec<StudentRecord>> {
        let sql = reference_query(&self.table, limit, DatabaseType::PostgreSQL);
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

        // Dropping `tx` without commit rolls the whole batch back.
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
                message: "Batched INSERT failed".to_string(),
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
