use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{DatabaseError, Store, StoreQuery, StoredRecord};

/// Process-local store used in development and tests. Data lives only as
/// long as the process.
#[derive(Default)]
pub struct MemoryStore {
    kinds: RwLock<HashMap<String, Vec<StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unique_taken(records: &[StoredRecord], key: &Option<String>, except: Uuid) -> bool {
    match key {
        Some(key) => records
            .iter()
            .any(|r| r.id != except && r.unique_key.as_deref() == Some(key.as_str())),
        None => false,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, kind: &str, record: StoredRecord) -> Result<(), DatabaseError> {
        let mut kinds = self.kinds.write().await;
        let records = kinds.entry(kind.to_string()).or_default();

        if records.iter().any(|r| r.id == record.id) {
            return Err(DatabaseError::Conflict(format!("{} {} already exists", kind, record.id)));
        }
        if unique_taken(records, &record.unique_key, record.id) {
            return Err(DatabaseError::Conflict(format!("duplicate unique key in {}", kind)));
        }

        records.push(record);
        Ok(())
    }

    async fn get(&self, kind: &str, id: Uuid) -> Result<Option<StoredRecord>, DatabaseError> {
        let kinds = self.kinds.read().await;
        Ok(kinds
            .get(kind)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn find_unique(&self, kind: &str, key: &str) -> Result<Option<StoredRecord>, DatabaseError> {
        let kinds = self.kinds.read().await;
        Ok(kinds
            .get(kind)
            .and_then(|records| records.iter().find(|r| r.unique_key.as_deref() == Some(key)))
            .cloned())
    }

    async fn list(&self, kind: &str, query: &StoreQuery) -> Result<Vec<StoredRecord>, DatabaseError> {
        let kinds = self.kinds.read().await;
        let Some(records) = kinds.get(kind) else {
            return Ok(vec![]);
        };

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        Ok(records
            .iter()
            .filter(|r| query.matches(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn replace(
        &self,
        kind: &str,
        record: StoredRecord,
        expected: Option<&Value>,
    ) -> Result<bool, DatabaseError> {
        let mut kinds = self.kinds.write().await;
        let Some(records) = kinds.get_mut(kind) else {
            return Ok(false);
        };

        if unique_taken(records, &record.unique_key, record.id) {
            return Err(DatabaseError::Conflict(format!("duplicate unique key in {}", kind)));
        }

        let Some(slot) = records.iter_mut().find(|r| r.id == record.id) else {
            return Ok(false);
        };
        if let Some(expected) = expected {
            if &slot.data != expected {
                return Ok(false);
            }
        }

        *slot = record;
        Ok(true)
    }

    async fn delete(&self, kind: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let mut kinds = self.kinds.write().await;
        let Some(records) = kinds.get_mut(kind) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: Option<&str>, data: Value) -> StoredRecord {
        StoredRecord {
            id: Uuid::new_v4(),
            organization_id: None,
            unique_key: key.map(str::to_string),
            data,
        }
    }

    #[tokio::test]
    async fn unique_keys_are_enforced() {
        let store = MemoryStore::new();
        store.insert("users", record(Some("a@ecwa.org"), json!({}))).await.unwrap();
        let err = store
            .insert("users", record(Some("a@ecwa.org"), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        // Same key in a different kind is fine
        store.insert("invites", record(Some("a@ecwa.org"), json!({}))).await.unwrap();
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_stale_writes() {
        let store = MemoryStore::new();
        let original = record(None, json!({"consumed": false}));
        store.insert("invites", original.clone()).await.unwrap();

        let first = StoredRecord { data: json!({"consumed": true}), ..original.clone() };
        assert!(store.replace("invites", first, Some(&original.data)).await.unwrap());

        let second = StoredRecord { data: json!({"consumed": true, "by": "second"}), ..original.clone() };
        assert!(!store.replace("invites", second, Some(&original.data)).await.unwrap());

        let stored = store.get("invites", original.id).await.unwrap().unwrap();
        assert_eq!(stored.data, json!({"consumed": true}));
    }

    #[tokio::test]
    async fn list_preserves_insertion_order_and_pages() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store.insert("income", record(None, json!({"n": n}))).await.unwrap();
        }
        let page = store
            .list("income", &StoreQuery::new().page(Some(2), Some(1)))
            .await
            .unwrap();
        let ns: Vec<i64> = page.iter().map(|r| r.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![1, 2]);
    }

    #[tokio::test]
    async fn delete_reports_missing_records() {
        let store = MemoryStore::new();
        let rec = record(None, json!({}));
        store.insert("agencies", rec.clone()).await.unwrap();
        assert!(store.delete("agencies", rec.id).await.unwrap());
        assert!(!store.delete("agencies", rec.id).await.unwrap());
    }
}
