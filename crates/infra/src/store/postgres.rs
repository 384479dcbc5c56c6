//! Postgres-backed document store.
//!
//! Documents live in one `documents` table keyed by `(collection, id)` with
//! a JSONB body. Sequences live in `sequences`.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error | Constraint | StoreError |
//! |------------------|------------|------------|
//! | `23505` unique violation | `documents_pkey` | `Concurrency` (insert raced another insert) |
//! | `23505` unique violation | `documents_unique_key` | `Duplicate` |
//! | anything else | | `Backend` |
//!
//! An update or delete whose version predicate matches no row is reported
//! as `Concurrency`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions};
use tracing::instrument;
use uuid::Uuid;

use stockroom_core::ExpectedVersion;

use super::r#trait::{DocumentStore, RawDocument, StoreError, WriteBatch, WriteOp};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection  TEXT        NOT NULL,
        id          UUID        NOT NULL,
        version     BIGINT      NOT NULL CHECK (version > 0),
        unique_key  TEXT,
        body        JSONB       NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT documents_pkey PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS documents_unique_key
        ON documents (collection, unique_key)
        WHERE unique_key IS NOT NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sequences (
        name   TEXT   PRIMARY KEY,
        value  BIGINT NOT NULL
    )
    "#,
];

/// Postgres-backed document store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`. Every batch runs in
/// one transaction; returning early drops the transaction, which rolls it
/// back.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }
}

fn version_param(expected: ExpectedVersion) -> Option<i64> {
    match expected {
        ExpectedVersion::Any => None,
        ExpectedVersion::Exact(v) => Some(v as i64),
    }
}

async fn apply_op(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Insert {
            collection,
            id,
            unique_key,
            body,
        } => {
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, version, unique_key, body)
                VALUES ($1, $2, 1, $3, $4)
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(unique_key)
            .bind(body)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_document", e))?;
        }
        WriteOp::Update {
            collection,
            id,
            expected,
            unique_key,
            body,
        } => {
            let result = sqlx::query(
                r#"
                UPDATE documents
                SET body = $3, unique_key = $4, version = version + 1, updated_at = now()
                WHERE collection = $1 AND id = $2 AND ($5::BIGINT IS NULL OR version = $5)
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .bind(unique_key)
            .bind(version_param(expected))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_document", e))?;

            if result.rows_affected() == 0 {
                return Err(StoreError::Concurrency(format!(
                    "{collection}/{id}: expected {expected:?}, document changed or missing"
                )));
            }
        }
        WriteOp::Delete {
            collection,
            id,
            expected,
        } => {
            let result = sqlx::query(
                r#"
                DELETE FROM documents
                WHERE collection = $1 AND id = $2 AND ($3::BIGINT IS NULL OR version = $3)
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(version_param(expected))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete_document", e))?;

            if result.rows_affected() == 0 {
                return Err(StoreError::Concurrency(format!(
                    "{collection}/{id}: expected {expected:?}, document changed or missing"
                )));
            }
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self), err)]
    async fn fetch(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT collection, id, version, unique_key, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch", e))?;

        row.as_ref().map(read_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT collection, id, version, unique_key, body, created_at, updated_at
            FROM documents
            WHERE collection = $1
            ORDER BY id ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_all", e))?;

        rows.iter().map(read_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn find_unique(
        &self,
        collection: &str,
        unique_key: &str,
    ) -> Result<Option<RawDocument>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT collection, id, version, unique_key, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND unique_key = $2
            "#,
        )
        .bind(collection)
        .bind(unique_key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_unique", e))?;

        row.as_ref().map(read_row).transpose()
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()), err)]
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for op in batch.into_ops() {
            apply_op(&mut tx, op).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), err)]
    async fn next_sequence(&self, name: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO sequences (name, value) VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET value = sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_sequence", e))?;

        let value: i64 = row
            .try_get("value")
            .map_err(|e| StoreError::Backend(format!("failed to read sequence value: {e}")))?;
        Ok(value as u64)
    }
}

fn read_row(row: &sqlx::postgres::PgRow) -> Result<RawDocument, StoreError> {
    let read = |e: sqlx::Error| StoreError::Backend(format!("failed to read document row: {e}"));
    let version: i64 = row.try_get("version").map_err(read)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(read)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(read)?;
    Ok(RawDocument {
        collection: row.try_get("collection").map_err(read)?,
        id: row.try_get("id").map_err(read)?,
        version: version as u64,
        unique_key: row.try_get("unique_key").map_err(read)?,
        body: row.try_get("body").map_err(read)?,
        created_at,
        updated_at,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                if db_err.constraint() == Some("documents_pkey") {
                    StoreError::Concurrency(msg)
                } else {
                    StoreError::Duplicate(msg)
                }
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
