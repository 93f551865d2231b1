use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::domain::errors::PipelineError;
use crate::domain::log::TrafficLog;
use crate::domain::transform::{UPDATE_APPLIED, UPDATE_MARKER};
use crate::store::LogStore;

#[derive(Clone)]
pub struct PostgresLogStore {
    pool: PgPool,
}

impl PostgresLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), PipelineError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|error| PipelineError::storage(error.to_string()))
}

#[async_trait]
impl LogStore for PostgresLogStore {
    async fn fetch_all(&self) -> Result<Vec<TrafficLog>, PipelineError> {
        let rows = sqlx::query(
            r#"
            SELECT id, payload, created_at
            FROM traffic_logs
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.iter().map(row_to_log).collect())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<TrafficLog>, PipelineError> {
        let maybe_row = sqlx::query(
            r#"
            SELECT id, payload, created_at
            FROM traffic_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(maybe_row.as_ref().map(row_to_log))
    }

    async fn insert_one(&self, payload: &str) -> Result<TrafficLog, PipelineError> {
        let row = sqlx::query(
            r#"
            INSERT INTO traffic_logs (payload)
            VALUES ($1)
            RETURNING id, payload, created_at
            "#,
        )
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row_to_log(&row))
    }

    async fn insert_batch(&self, payloads: &[String]) -> Result<u64, PipelineError> {
        if payloads.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO traffic_logs (payload) ");
        builder.push_values(payloads, |mut row, payload| {
            row.push_bind(payload.as_str());
        });

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn apply_rewrite(&self, id: i64) -> Result<bool, PipelineError> {
        let result = sqlx::query(
            r#"
            UPDATE traffic_logs
            SET payload = REPLACE(payload, $1, $2)
            WHERE id = $3
            "#,
        )
        .bind(UPDATE_MARKER)
        .bind(UPDATE_APPLIED)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn id_range(&self) -> Result<Option<(i64, i64)>, PipelineError> {
        let row = sqlx::query("SELECT MIN(id) AS min_id, MAX(id) AS max_id FROM traffic_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let min_id = row.get::<Option<i64>, _>("min_id");
        let max_id = row.get::<Option<i64>, _>("max_id");

        Ok(min_id.zip(max_id))
    }
}

fn row_to_log(row: &sqlx::postgres::PgRow) -> TrafficLog {
    TrafficLog {
        id: row.get::<i64, _>("id"),
        payload: row.get::<String, _>("payload"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn map_sqlx_error(error: sqlx::Error) -> PipelineError {
    PipelineError::Storage(error.to_string())
}
