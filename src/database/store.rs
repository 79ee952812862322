use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One stored document. `organization_id` and `unique_key` are lifted out of
/// `data` so backends can index scope lookups and enforce uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub unique_key: Option<String>,
    pub data: Value,
}

/// Listing criteria shared by every backend
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    /// Restrict to these organizations; `None` means unrestricted
    pub organization_ids: Option<Vec<Uuid>>,
    /// Top-level field equality filters, compared as text
    pub filters: Vec<(String, String)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scoped(mut self, organization_ids: Option<Vec<Uuid>>) -> Self {
        self.organization_ids = organization_ids;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn page(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit.map(|l| l.max(0));
        self.offset = offset.map(|o| o.max(0));
        self
    }

    /// In-process evaluation of the scope and field filters
    pub fn matches(&self, record: &StoredRecord) -> bool {
        if let Some(ids) = &self.organization_ids {
            match record.organization_id {
                Some(org) if ids.contains(&org) => {}
                _ => return false,
            }
        }

        self.filters.iter().all(|(field, expected)| {
            match record.data.get(field) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

/// Document store keyed by (kind, id)
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new record; duplicate ids or unique keys are a `Conflict`
    async fn insert(&self, kind: &str, record: StoredRecord) -> Result<(), DatabaseError>;

    async fn get(&self, kind: &str, id: Uuid) -> Result<Option<StoredRecord>, DatabaseError>;

    async fn find_unique(&self, kind: &str, key: &str) -> Result<Option<StoredRecord>, DatabaseError>;

    /// Records in insertion order
    async fn list(&self, kind: &str, query: &StoreQuery) -> Result<Vec<StoredRecord>, DatabaseError>;

    /// Overwrite an existing record. With `expected`, the write only lands if the
    /// stored data still equals it (compare-and-swap). Returns false when nothing
    /// was written.
    async fn replace(
        &self,
        kind: &str,
        record: StoredRecord,
        expected: Option<&Value>,
    ) -> Result<bool, DatabaseError>;

    async fn delete(&self, kind: &str, id: Uuid) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    fn backend(&self) -> &'static str;
}
