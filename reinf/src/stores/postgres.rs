use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::instrument;

use super::{InsertOutcome, RecordStore, StoreError, StoredDocument};
use crate::events::EventType;
use crate::record_key::RecordKey;

/// Records kept in the `reinf_records` table, keyed by `(event_type, id)`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build a store on a lazily connected pool: no connection is opened until the first insert.
    ///
    /// # Arguments
    ///
    /// * `url`: A URL pointing to where the PostgreSQL database is hosted.
    /// * `max_connections`: Upper bound for the pool size.
    /// * `acquire_timeout`: How long an insert waits for a free connection before failing.
    pub fn new(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|error| StoreError::PoolCreationError { error })?
            .application_name("reinf");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a stored document back, mostly useful for checking what was written.
    pub async fn get(
        &self,
        event_type: EventType,
        key: &RecordKey,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        let document: Option<sqlx::types::Json<Map<String, Value>>> = sqlx::query_scalar(
            r#"
SELECT document FROM reinf_records
WHERE event_type = $1 AND id = $2
            "#,
        )
        .bind(event_type.as_str())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "SELECT".to_owned(),
            error,
        })?;

        Ok(document.map(|document| document.0))
    }
}

#[async_trait]
impl RecordStore for PgStore {
    #[instrument(skip_all, fields(event = %document.event_type, key = %document.key))]
    async fn insert_if_absent(&self, document: StoredDocument) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r#"
INSERT INTO reinf_records (event_type, id, document, created_at)
VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(document.event_type.as_str())
        .bind(document.key.as_str())
        .bind(sqlx::types::Json(&document.body))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                tracing::debug!("record already stored");
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(error) => Err(StoreError::QueryError {
                command: "INSERT".to_owned(),
                error,
            }),
        }
    }
}
