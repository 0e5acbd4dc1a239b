//! Durable key/value persistence layer backing the operation queue

mod libsql_store;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use libsql_store::LibSqlStore;
pub use memory::MemoryStore;

/// Bucket holding pending queued operations
pub const PENDING_BUCKET: &str = "pending_operations";
/// Bucket holding dead-lettered operations that exhausted their retry budget
pub const DEAD_BUCKET: &str = "dead_operations";

/// Crash-surviving key/value persistence.
///
/// Pure storage with no business rules. A successful `put` return means the
/// record survives an immediate crash; callers rely on that for the queue's
/// durability contract. Buckets are independent keyspaces.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist a record synchronously before returning
    async fn put(&self, bucket: &str, key: &str, value: &Value) -> Result<()>;

    /// Fetch a record, or `None` when absent
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Value>>;

    /// Delete a record; deleting an absent key is a no-op
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// List all keys in a bucket, in no guaranteed order
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>>;
}
