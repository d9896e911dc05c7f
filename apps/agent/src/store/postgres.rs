use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::{ChangeEvent, ChangeKind, RawPosting, StructuredJob, UserProfile};
use crate::store::{
    image_of, ChangeFeed, ProfileSource, RecordStore, ScanFilter, SequencedChange, Table,
};

/// Postgres-backed record store.
///
/// Each record lives as a JSONB image; `fit_score` and `analyzed_at` are mirrored into
/// columns for the digest scan. Writes append to `change_log` inside the same transaction
/// (outbox style), so a captured change exists iff its write committed.
/// Schema: `migrations/0001_pipeline.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> AnyResult<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }

    /// Seeds or replaces a profile. Profiles are not change-captured.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, data) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(&profile.user_id)
        .bind(image_of(profile)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn append_change(
    tx: &mut Transaction<'_, Postgres>,
    table: Table,
    kind: ChangeKind,
    key: &str,
    image: &Value,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO change_log (table_name, event_kind, key, new_image) VALUES ($1, $2, $3, $4)",
    )
    .bind(table.as_str())
    .bind(kind.as_str())
    .bind(key)
    .bind(image)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// `xmax = 0` holds only for a freshly inserted row, so it tells insert from overwrite.
fn kind_from_inserted(inserted: bool) -> ChangeKind {
    if inserted {
        ChangeKind::Insert
    } else {
        ChangeKind::Modify
    }
}

fn decode<T: serde::de::DeserializeOwned>(image: Value, what: &str) -> Result<T, AppError> {
    serde_json::from_value(image)
        .map_err(|e| AppError::MalformedRecord(format!("Stored {what} does not decode: {e}")))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn put_raw(&self, posting: &RawPosting) -> Result<(), AppError> {
        let image = image_of(posting)?;
        let mut tx = self.pool.begin().await?;

        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO raw_postings (job_id, data, scraped_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id) DO UPDATE
                SET data = EXCLUDED.data, scraped_at = EXCLUDED.scraped_at
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&posting.job_id)
        .bind(&image)
        .bind(posting.scraped_at)
        .fetch_one(&mut *tx)
        .await?;

        append_change(
            &mut tx,
            Table::RawPostings,
            kind_from_inserted(inserted),
            &posting.job_id,
            &image,
        )
        .await?;
        tx.commit().await?;

        debug!(job_id = %posting.job_id, inserted, "Raw posting stored");
        Ok(())
    }

    async fn get_raw(&self, job_id: &str) -> Result<Option<RawPosting>, AppError> {
        let image: Option<Value> =
            sqlx::query_scalar("SELECT data FROM raw_postings WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        image.map(|v| decode(v, "raw posting")).transpose()
    }

    async fn put_structured(&self, job: &StructuredJob) -> Result<(), AppError> {
        let image = image_of(job)?;
        let mut tx = self.pool.begin().await?;

        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO structured_jobs (job_id, data, fit_score, analyzed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_id) DO UPDATE
                SET data = EXCLUDED.data,
                    fit_score = EXCLUDED.fit_score,
                    analyzed_at = EXCLUDED.analyzed_at
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&job.job_id)
        .bind(&image)
        .bind(job.fit_score)
        .bind(job.analyzed_at)
        .fetch_one(&mut *tx)
        .await?;

        append_change(
            &mut tx,
            Table::StructuredJobs,
            kind_from_inserted(inserted),
            &job.job_id,
            &image,
        )
        .await?;
        tx.commit().await?;

        debug!(job_id = %job.job_id, inserted, "Structured job stored");
        Ok(())
    }

    async fn update_fit_score(&self, job_id: &str, fit_score: f64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let image: Option<Value> = sqlx::query_scalar(
            r#"
            UPDATE structured_jobs
            SET fit_score = $2,
                data = jsonb_set(data, '{fit_score}', to_jsonb($2::float8))
            WHERE job_id = $1
            RETURNING data
            "#,
        )
        .bind(job_id)
        .bind(fit_score)
        .fetch_optional(&mut *tx)
        .await?;

        let image =
            image.ok_or_else(|| AppError::NotFound(format!("Structured job {job_id} not found")))?;

        append_change(
            &mut tx,
            Table::StructuredJobs,
            ChangeKind::Modify,
            job_id,
            &image,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_structured(&self, job_id: &str) -> Result<Option<StructuredJob>, AppError> {
        let image: Option<Value> =
            sqlx::query_scalar("SELECT data FROM structured_jobs WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        image.map(|v| decode(v, "structured job")).transpose()
    }

    async fn scan_structured(&self, filter: &ScanFilter) -> Result<Vec<StructuredJob>, AppError> {
        let images: Vec<Value> = sqlx::query_scalar(
            r#"
            SELECT data FROM structured_jobs
            WHERE COALESCE(fit_score, 0) >= $1 AND analyzed_at > $2
            "#,
        )
        .bind(filter.min_fit_score)
        .bind(filter.analyzed_after)
        .fetch_all(&self.pool)
        .await?;

        images
            .into_iter()
            .map(|v| decode(v, "structured job"))
            .collect()
    }
}

#[async_trait]
impl ChangeFeed for PgStore {
    async fn poll(&self, table: Table, limit: usize) -> Result<Vec<SequencedChange>, AppError> {
        let rows: Vec<(i64, String, String, Option<Value>)> = sqlx::query_as(
            r#"
            SELECT seq, event_kind, key, new_image
            FROM change_log
            WHERE table_name = $1 AND delivered_at IS NULL
            ORDER BY seq ASC
            LIMIT $2
            "#,
        )
        .bind(table.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(seq, kind, key, new_image)| SequencedChange {
                seq,
                event: ChangeEvent {
                    event_kind: ChangeKind::parse(&kind),
                    key,
                    new_image,
                },
            })
            .collect())
    }

    async fn ack(&self, table: Table, seqs: &[i64]) -> Result<(), AppError> {
        if seqs.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            UPDATE change_log SET delivered_at = NOW()
            WHERE table_name = $1 AND seq = ANY($2) AND delivered_at IS NULL
            "#,
        )
        .bind(table.as_str())
        .bind(seqs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for PgStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let image: Option<Value> =
            sqlx::query_scalar("SELECT data FROM user_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        image.map(|v| decode(v, "user profile")).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_inserted() {
        assert_eq!(kind_from_inserted(true), ChangeKind::Insert);
        assert_eq!(kind_from_inserted(false), ChangeKind::Modify);
    }

    #[test]
    fn test_decode_failure_is_malformed() {
        let err = decode::<RawPosting>(serde_json::json!({"job_id": 7}), "raw posting").unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
    }
}
