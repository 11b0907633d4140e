//! Session records kept in memory, bounded by size and dropped once idle.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use time::OffsetDateTime;
use tower_sessions::SessionStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;

/// Every visitor's session record. Records are weighed by the text they
/// hold, so a few large uploads push out idle sessions first.
#[derive(Clone)]
pub struct SessionCache {
    records: Cache<Id, Record>,
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCache")
            .field("entries", &self.records.entry_count())
            .field("weight", &self.records.weighted_size())
            .finish()
    }
}

impl SessionCache {
    /// Holds at most roughly `max_bytes` of session data; a record untouched
    /// for `idle` is evicted.
    pub fn new(max_bytes: u64, idle: Duration) -> Self {
        let records = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|_id: &Id, record: &Record| record_weight(record))
            .time_to_idle(idle)
            .build();
        Self { records }
    }

    /// The stored record, unless it has expired.
    pub async fn fetch(&self, id: &Id) -> Option<Record> {
        self.records
            .get(id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc())
    }
}

fn record_weight(record: &Record) -> u32 {
    let bytes: usize = record
        .data
        .iter()
        .map(|(key, value)| key.len() + value_weight(value))
        .sum();
    u32::try_from(bytes).unwrap_or(u32::MAX)
}

fn value_weight(value: &Value) -> usize {
    match value {
        Value::String(text) => text.len(),
        Value::Array(items) => items.iter().map(value_weight).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| key.len() + value_weight(value))
            .sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 8,
    }
}

#[async_trait]
impl SessionStore for SessionCache {
    async fn create(&self, record: &mut Record) -> Result<(), session_store::Error> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> Result<(), session_store::Error> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> Result<Option<Record>, session_store::Error> {
        Ok(self.fetch(session_id).await)
    }

    async fn delete(&self, session_id: &Id) -> Result<(), session_store::Error> {
        self.records.invalidate(session_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use std::collections::HashMap;

    fn record(expires_in: time::Duration, data: Value) -> Record {
        let mut map = HashMap::new();
        map.insert("imageverse".to_string(), data);
        Record {
            id: Id::default(),
            data: map,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    fn cache() -> SessionCache {
        SessionCache::new(1024 * 1024, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn saved_records_load_until_deleted() {
        let store = cache();
        let saved = record(time::Duration::minutes(5), json!({"stage": "empty"}));
        store.save(&saved).await.expect("save");
        let loaded = store.load(&saved.id).await.expect("load").expect("present");
        assert_eq!(loaded.data, saved.data);

        store.delete(&saved.id).await.expect("delete");
        assert!(store.load(&saved.id).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn expired_records_are_not_loaded() {
        let store = cache();
        let stale = record(time::Duration::minutes(-1), json!({"stage": "empty"}));
        store.save(&stale).await.expect("save");
        assert!(store.load(&stale.id).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn create_avoids_taken_ids() {
        let store = cache();
        let first = record(time::Duration::minutes(5), json!(1));
        store.save(&first).await.expect("save");
        let mut second = record(time::Duration::minutes(5), json!(2));
        second.id = first.id;
        store.create(&mut second).await.expect("create");
        assert_ne!(second.id, first.id);
        let kept = store.load(&first.id).await.expect("load").expect("present");
        assert_eq!(kept.data, first.data);
    }

    #[tokio::test]
    async fn large_records_are_evicted_past_capacity() {
        let store = SessionCache::new(1000, Duration::from_secs(60));
        let mut ids = Vec::new();
        for _ in 0..5 {
            let big = record(time::Duration::minutes(5), json!("x".repeat(400)));
            store.save(&big).await.expect("save");
            ids.push(big.id);
        }
        store.records.run_pending_tasks().await;
        assert!(store.records.weighted_size() <= 1000);
        let mut present = 0;
        for id in &ids {
            if store.load(id).await.expect("load").is_some() {
                present += 1;
            }
        }
        assert!(present < ids.len());
    }

    #[test]
    fn weight_counts_text() {
        let weighed = record(
            time::Duration::minutes(5),
            json!({"image": "abcd", "labels": ["ab", "c"], "size": 3}),
        );
        // key "imageverse" + "image" + 4 + "labels" + 3 + "size" + 8
        assert_eq!(record_weight(&weighed), 10 + 5 + 4 + 6 + 3 + 4 + 8);
    }
}
