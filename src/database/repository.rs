use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::Entity;
use crate::database::store::{DatabaseError, Store, StoreQuery, StoredRecord};

/// Attempts `modify` makes before reporting a conflict
const MODIFY_ATTEMPTS: usize = 3;

/// Typed access to one entity kind on top of the document store
pub struct Repository<T> {
    store: Arc<dyn Store>,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    fn to_stored(entity: &T) -> Result<StoredRecord, DatabaseError> {
        Ok(StoredRecord {
            id: entity.id(),
            organization_id: entity.organization_id(),
            unique_key: entity.unique_key(),
            data: serde_json::to_value(entity)?,
        })
    }

    fn from_stored(record: StoredRecord) -> Result<T, DatabaseError> {
        Ok(serde_json::from_value(record.data)?)
    }

    fn conflict(err: DatabaseError) -> DatabaseError {
        match err {
            DatabaseError::Conflict(_) => DatabaseError::Conflict(T::CONFLICT_MESSAGE.to_string()),
            other => other,
        }
    }

    pub async fn create(&self, entity: &T) -> Result<(), DatabaseError> {
        self.store
            .insert(T::KIND, Self::to_stored(entity)?)
            .await
            .map_err(Self::conflict)
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        self.store
            .get(T::KIND, id)
            .await?
            .map(Self::from_stored)
            .transpose()
    }

    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    pub async fn select_unique(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        self.store
            .find_unique(T::KIND, key)
            .await?
            .map(Self::from_stored)
            .transpose()
    }

    pub async fn select_any(&self, query: &StoreQuery) -> Result<Vec<T>, DatabaseError> {
        self.store
            .list(T::KIND, query)
            .await?
            .into_iter()
            .map(Self::from_stored)
            .collect()
    }

    /// Overwrite an existing record
    pub async fn update(&self, entity: &T) -> Result<(), DatabaseError> {
        let written = self
            .store
            .replace(T::KIND, Self::to_stored(entity)?, None)
            .await
            .map_err(Self::conflict)?;
        if !written {
            return Err(DatabaseError::NotFound(format!("{} not found", T::LABEL)));
        }
        Ok(())
    }

    /// Write `after` only if the stored record still equals `before`.
    /// Returns false when another writer got there first.
    pub async fn update_if_unchanged(&self, before: &T, after: &T) -> Result<bool, DatabaseError> {
        let expected = serde_json::to_value(before)?;
        self.store
            .replace(T::KIND, Self::to_stored(after)?, Some(&expected))
            .await
            .map_err(Self::conflict)
    }

    /// Read-modify-write against the freshest stored copy. `change` is re-run
    /// on a new read when another writer lands in between.
    pub async fn modify<E, F>(&self, id: Uuid, mut change: F) -> Result<T, E>
    where
        E: From<DatabaseError>,
        F: FnMut(&mut T) -> Result<(), E>,
    {
        for _ in 0..MODIFY_ATTEMPTS {
            let before = self.select_404(id).await?;
            let mut after = before.clone();
            change(&mut after)?;
            if self.update_if_unchanged(&before, &after).await? {
                return Ok(after);
            }
            tracing::debug!("{} {} changed during update, retrying", T::LABEL, id);
        }
        Err(DatabaseError::Conflict(format!("{} was modified concurrently", T::LABEL)).into())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        if !self.store.delete(T::KIND, id).await? {
            return Err(DatabaseError::NotFound(format!("{} not found", T::LABEL)));
        }
        Ok(())
    }
}
