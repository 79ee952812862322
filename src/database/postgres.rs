use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::store::{DatabaseError, Store, StoreQuery, StoredRecord};
use crate::config::DatabaseConfig;

/// Schema for the single document table every entity kind lives in
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS records (
        kind            TEXT        NOT NULL,
        id              UUID        NOT NULL,
        organization_id UUID        NULL,
        unique_key      TEXT        NULL,
        data            JSONB       NOT NULL,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (kind, id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS records_kind_unique_key
        ON records (kind, unique_key)
        WHERE unique_key IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS records_kind_organization
        ON records (kind, organization_id)
    "#,
];

type RecordRow = (Uuid, Option<Uuid>, Option<String>, Value);

fn from_row((id, organization_id, unique_key, data): RecordRow) -> StoredRecord {
    StoredRecord { id, organization_id, unique_key, data }
}

/// Postgres unique_violation
fn map_unique_violation(err: sqlx::Error, kind: &str) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return DatabaseError::Conflict(format!("duplicate unique key in {}", kind));
        }
    }
    DatabaseError::Sqlx(err)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        info!("Connected Postgres pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the records table and indexes if missing
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, kind: &str, record: StoredRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO records (kind, id, organization_id, unique_key, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(kind)
        .bind(record.id)
        .bind(record.organization_id)
        .bind(&record.unique_key)
        .bind(&record.data)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, kind))?;
        Ok(())
    }

    async fn get(&self, kind: &str, id: Uuid) -> Result<Option<StoredRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT id, organization_id, unique_key, data FROM records WHERE kind = $1 AND id = $2",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn find_unique(&self, kind: &str, key: &str) -> Result<Option<StoredRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT id, organization_id, unique_key, data FROM records WHERE kind = $1 AND unique_key = $2",
        )
        .bind(kind)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn list(&self, kind: &str, query: &StoreQuery) -> Result<Vec<StoredRecord>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, organization_id, unique_key, data FROM records WHERE kind = ");
        builder.push_bind(kind);

        if let Some(ids) = &query.organization_ids {
            builder.push(" AND organization_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }

        for (field, value) in &query.filters {
            builder.push(" AND data ->> ");
            builder.push_bind(field.clone());
            builder.push(" = ");
            builder.push_bind(value.clone());
        }

        builder.push(" ORDER BY created_at, id");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }

        let rows = builder
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn replace(
        &self,
        kind: &str,
        record: StoredRecord,
        expected: Option<&Value>,
    ) -> Result<bool, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE records SET organization_id = ");
        builder.push_bind(record.organization_id);
        builder.push(", unique_key = ");
        builder.push_bind(record.unique_key.clone());
        builder.push(", data = ");
        builder.push_bind(record.data.clone());
        builder.push(", updated_at = now() WHERE kind = ");
        builder.push_bind(kind);
        builder.push(" AND id = ");
        builder.push_bind(record.id);

        if let Some(expected) = expected {
            builder.push(" AND data = ");
            builder.push_bind(expected.clone());
        }

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, kind))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, kind: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2")
            .bind(kind)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
