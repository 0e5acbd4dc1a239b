//! Scriptable Remote Data Service double shared by core tests

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{RemoteDataService, RemoteError};
use crate::models::{Booking, BookingStatus};

/// One recorded apply call: (action, collection, record id)
pub type AppliedCall = (String, String, String);

#[derive(Default)]
pub struct StubRemote {
    offline: AtomicBool,
    latency: Mutex<Option<std::time::Duration>>,
    fail_record_ids: Mutex<HashSet<String>>,
    bookings: Mutex<Vec<Booking>>,
    applied: Mutex<Vec<AppliedCall>>,
}

impl StubRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a connectivity error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make applies targeting the given record id fail with an API error
    pub fn fail_on(&self, record_id: &str) {
        self.fail_record_ids
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_record_ids.lock().unwrap().clear();
    }

    /// Seed a booking the overlap query can find
    pub fn push_booking(&self, booking: Booking) {
        self.bookings.lock().unwrap().push(booking);
    }

    /// Applies recorded so far, in call order
    pub fn applied(&self) -> Vec<AppliedCall> {
        self.applied.lock().unwrap().clone()
    }

    /// Delay every call, to widen race windows in concurrency tests
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    async fn check_reachable(&self) -> Result<(), RemoteError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Connectivity("stub offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_scripted_failure(&self, record_id: &str) -> Result<(), RemoteError> {
        if self.fail_record_ids.lock().unwrap().contains(record_id) {
            Err(RemoteError::Api(format!("scripted failure for {record_id}")))
        } else {
            Ok(())
        }
    }

    fn record(&self, action: &str, collection: &str, record_id: &str) {
        self.applied.lock().unwrap().push((
            action.to_string(),
            collection.to_string(),
            record_id.to_string(),
        ));
    }
}

#[async_trait]
impl RemoteDataService for StubRemote {
    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, RemoteError> {
        self.check_reachable().await?;
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.check_scripted_failure(&id)?;
        self.record("insert", collection, &id);
        Ok(record.clone())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &Value,
    ) -> Result<Value, RemoteError> {
        self.check_reachable().await?;
        self.check_scripted_failure(id)?;
        self.record("update", collection, id);
        Ok(patch.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.check_reachable().await?;
        self.check_scripted_failure(id)?;
        self.record("delete", collection, id);
        Ok(())
    }

    async fn find_overlapping(
        &self,
        room_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_id: Option<&str>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RemoteError> {
        self.check_reachable().await?;
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.room_id == room_id)
            .filter(|b| statuses.contains(&b.status))
            .filter(|b| exclude_id != Some(b.id.as_str()))
            .filter(|b| b.overlaps(check_in, check_out))
            .cloned()
            .collect())
    }
}
