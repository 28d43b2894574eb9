//! Typed message persistence over [`SqliteStore`].

use uuid::Uuid;

use crate::core::error::StoreError;
use crate::core::store::records::MessageRecord;
use crate::core::store::{MESSAGE_TAG, SqliteStore};

#[derive(Clone)]
pub struct MessageStore {
    store: SqliteStore,
}

impl MessageStore {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    pub async fn save(&self, message: &MessageRecord) -> Result<(), StoreError> {
        let body = serde_json::to_value(message)?;
        self.store
            .put(
                MESSAGE_TAG,
                &message.id.to_string(),
                message.ref_id.as_deref(),
                &body,
            )
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<MessageRecord>, StoreError> {
        self.store
            .get(MESSAGE_TAG, &id.to_string())
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Messages sharing a run correlation id, oldest first.
    pub async fn query_by_ref(&self, ref_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let mut messages = Vec::new();
        for body in self.store.query_by_ref(MESSAGE_TAG, ref_id).await? {
            messages.push(serde_json::from_value(body)?);
        }
        Ok(messages)
    }

    pub async fn query_all(&self) -> Result<Vec<MessageRecord>, StoreError> {
        let mut messages = Vec::new();
        for body in self.store.query_all(MESSAGE_TAG).await? {
            messages.push(serde_json::from_value(body)?);
        }
        Ok(messages)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(MESSAGE_TAG, &id.to_string()).await
    }
}
