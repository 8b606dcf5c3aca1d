//! Transaction Store — durable record of completed pipeline runs.
//!
//! Connection handling follows an explicit lazy-init-once-and-reuse model:
//! the pool is created (and the schema provisioned) on first use, cached,
//! and invalidated on connection loss so the next call reconnects. The
//! connect+provision path is the only retry loop in the service: three
//! attempts with a fixed delay, and only for transient failure signatures
//! (a cold-started database). Anything else is a permanent
//! `StoreError::Unavailable` for that call.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::transaction::{Transaction, TransactionRow, TransactionSummary};

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cap (and default) for `list_recent`.
pub const MAX_LIST_LIMIT: i64 = 50;

/// Provisioning DDL, executed statement by statement on first connect.
/// Safe to run repeatedly. The large free-text columns (resume texts, cover
/// letter, JD, encoded upload) deliberately carry NO index: Postgres btree
/// index rows cap out around 2.7 KB, so indexing them would reject real
/// resumes outright. Only `created_at` is indexed, for listing order.
/// The trailing ALTER is the schema-evolution path for rows created before
/// `missing_keywords` existed.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
      id                    uuid PRIMARY KEY,
      created_at            timestamptz NOT NULL,
      job_title_snippet     text NOT NULL,
      jd_text               text NOT NULL,
      original_filename     text NOT NULL,
      original_file_b64     text NOT NULL,
      original_resume_text  text NOT NULL,
      original_score        integer NOT NULL,
      optimized_resume_text text NOT NULL,
      optimized_score       integer NOT NULL,
      cover_letter_text     text NOT NULL,
      tips                  text[] NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions (created_at DESC)",
    "ALTER TABLE transactions ADD COLUMN IF NOT EXISTS missing_keywords text[] NOT NULL DEFAULT '{}'",
];

const INSERT_SQL: &str = r#"
    INSERT INTO transactions
      (id, created_at, job_title_snippet, jd_text, original_filename,
       original_file_b64, original_resume_text, original_score,
       optimized_resume_text, optimized_score, cover_letter_text,
       tips, missing_keywords)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

const LIST_SQL: &str = r#"
    SELECT id, created_at, job_title_snippet, original_filename,
           original_score, optimized_score
    FROM transactions
    ORDER BY created_at DESC
    LIMIT $1
"#;

const GET_SQL: &str = "SELECT * FROM transactions WHERE id = $1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The persistence seam the pipeline writes through. `TransactionStore` is
/// the production implementation; tests plug in recording doubles.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Inserts one record, stamping `created_at` if absent. Returns the
    /// store-assigned id. Errors are returned, never panicked across the
    /// pipeline boundary.
    async fn save(&self, record: Transaction) -> Result<Uuid, StoreError>;

    /// Newest-first listing, at most `min(limit, MAX_LIST_LIMIT)` entries.
    /// An unavailable store yields an empty listing, not an error.
    async fn list_recent(&self, limit: i64) -> Vec<TransactionSummary>;

    /// Fetches one full record for detail/download.
    async fn get(&self, id: Uuid) -> Result<Option<TransactionRow>, StoreError>;
}

/// Postgres-backed store with a lazily initialized, process-wide pool.
pub struct TransactionStore {
    database_url: String,
    pool: RwLock<Option<PgPool>>,
}

impl TransactionStore {
    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            pool: RwLock::new(None),
        }
    }

    /// Drops the cached pool so the next call reconnects and re-provisions.
    pub async fn invalidate(&self) {
        *self.pool.write().await = None;
    }

    /// Returns the cached pool, connecting and provisioning on first use.
    async fn pool(&self) -> Result<PgPool, StoreError> {
        {
            let guard = self.pool.read().await;
            if let Some(pool) = guard.as_ref() {
                return Ok(pool.clone());
            }
        }

        let mut guard = self.pool.write().await;
        // Another caller may have connected while we waited for the lock.
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = self.connect_and_provision().await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn connect_and_provision(&self) -> Result<PgPool, StoreError> {
        let mut last_err = String::new();

        for attempt in 1..=CONNECT_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }

            match self.try_connect().await {
                Ok(pool) => {
                    info!("transaction store connected and provisioned");
                    return Ok(pool);
                }
                Err(e) if is_transient(&e) => {
                    warn!(
                        "store connect attempt {attempt}/{CONNECT_ATTEMPTS} hit a transient failure: {e}"
                    );
                    last_err = e.to_string();
                }
                Err(e) => {
                    return Err(StoreError::Unavailable(format!("connect failed: {e}")));
                }
            }
        }

        Err(StoreError::Unavailable(format!(
            "connect failed after {CONNECT_ATTEMPTS} attempts: {last_err}"
        )))
    }

    async fn try_connect(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&self.database_url)
            .await?;

        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&pool).await?;
        }

        Ok(pool)
    }

    async fn invalidate_on_connection_loss(&self, e: &sqlx::Error) {
        if is_connection_loss(e) {
            warn!("store connection lost, invalidating cached pool");
            self.invalidate().await;
        }
    }
}

#[async_trait]
impl TransactionLog for TransactionStore {
    async fn save(&self, record: Transaction) -> Result<Uuid, StoreError> {
        let pool = self.pool().await?;

        let id = Uuid::new_v4();
        let created_at = record.created_at.unwrap_or_else(Utc::now);

        let result = sqlx::query(INSERT_SQL)
            .bind(id)
            .bind(created_at)
            .bind(&record.job_title_snippet)
            .bind(&record.jd_text)
            .bind(&record.original_filename)
            .bind(&record.original_file_b64)
            .bind(&record.original_resume_text)
            .bind(record.original_score)
            .bind(&record.optimized_resume_text)
            .bind(record.optimized_score)
            .bind(&record.cover_letter_text)
            .bind(&record.tips)
            .bind(&record.missing_keywords)
            .execute(&pool)
            .await;

        match result {
            Ok(_) => {
                info!(%id, "transaction saved");
                Ok(id)
            }
            Err(e) => {
                self.invalidate_on_connection_loss(&e).await;
                Err(StoreError::Database(e))
            }
        }
    }

    async fn list_recent(&self, limit: i64) -> Vec<TransactionSummary> {
        let limit = clamp_limit(limit);

        let pool = match self.pool().await {
            Ok(pool) => pool,
            Err(e) => {
                warn!("transaction listing skipped, store unavailable: {e}");
                return Vec::new();
            }
        };

        match sqlx::query_as::<_, TransactionSummary>(LIST_SQL)
            .bind(limit)
            .fetch_all(&pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("transaction listing failed, returning empty: {e}");
                self.invalidate_on_connection_loss(&e).await;
                Vec::new()
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<TransactionRow>, StoreError> {
        let pool = self.pool().await?;

        match sqlx::query_as::<_, TransactionRow>(GET_SQL)
            .bind(id)
            .fetch_optional(&pool)
            .await
        {
            Ok(row) => Ok(row),
            Err(e) => {
                self.invalidate_on_connection_loss(&e).await;
                Err(StoreError::Database(e))
            }
        }
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(0, MAX_LIST_LIMIT)
}

/// Transient connect failures worth retrying: the socket-level errors a
/// cold-started database produces. Auth and protocol errors are permanent.
fn is_transient(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

fn is_connection_loss(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

/// Encodes an original upload for storage.
pub fn encode_original(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Reconstructs an original upload from its stored representation.
pub fn decode_original(b64: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(b64)
}
