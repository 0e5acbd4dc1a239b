//! In-memory durable store fake

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::DurableStore;
use crate::error::Result;

/// HashMap-backed store for tests and embedding.
///
/// Implements the same contract as [`super::LibSqlStore`] minus actual
/// durability; "survives a crash" degrades to "survives until drop".
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, value: &Value) -> Result<()> {
        self.records
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .records
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.records
            .lock()
            .await
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        Ok(self
            .records
            .lock()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect())
    }
}
