// Copyright 2025 Argiope Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::db_health_check;
use crate::declare_column_families;
use crate::database::get_len;
use crate::frontier::errors::StoreError;
use crate::url::WorkItem;
use rocksdb::{IteratorMode, WriteBatch, DB};
use std::sync::Arc;

/// The durable set of items that were dequeued but not yet confirmed
/// complete, keyed by address. Only consulted on restart, a crash gives
/// no information whether an in-flight item was actually fetched, so the
/// replay treats all of them as not yet fetched.
#[derive(Debug, Clone)]
pub struct InFlightStore {
    db: Arc<DB>,
}

impl InFlightStore {
    declare_column_families! {
        self.db => cf_handle(IN_FLIGHT_DB_CF)
    }

    /// Panics if the needed CFs are not configured.
    pub fn new(db: Arc<DB>) -> Self {
        db_health_check!(db: [
            Self::IN_FLIGHT_DB_CF => (
                if test in_flight_cf_options
                else "The column family for the in-flight items was not properly configured."
            )
        ]);
        Self { db }
    }

    pub fn put(&self, item: &WorkItem) -> Result<(), StoreError> {
        let raw = bincode::serialize(item)?;
        self.db
            .put_cf(&self.cf_handle(), item.address.as_bytes(), raw)?;
        Ok(())
    }

    /// Removes the entry for `address`, returns false if there was none.
    pub fn remove_by_address(&self, address: &str) -> Result<bool, StoreError> {
        let handle = self.cf_handle();
        if self.db.get_pinned_cf(&handle, address.as_bytes())?.is_none() {
            return Ok(false);
        }
        self.db.delete_cf(&handle, address.as_bytes())?;
        Ok(true)
    }

    /// Reads and removes up to `max` items, for the restart replay.
    pub fn drain_batch(&self, max: usize) -> Result<Vec<WorkItem>, StoreError> {
        let handle = self.cf_handle();
        let mut items = Vec::new();
        let mut batch = WriteBatch::default();
        for entry in self
            .db
            .iterator_cf(&handle, IteratorMode::Start)
            .take(max)
        {
            let (key, value) = entry?;
            items.push(bincode::deserialize(&value)?);
            batch.delete_cf(&handle, key);
        }
        self.db.write(batch)?;
        Ok(items)
    }

    pub fn len(&self) -> usize {
        get_len(&self.db, self.cf_handle())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::InFlightStore;
    use crate::database::open_db;
    use crate::url::WorkItem;
    use std::sync::Arc;

    #[test]
    fn put_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = InFlightStore::new(Arc::new(open_db(dir.path()).unwrap()));
        store.put(&WorkItem::seed("http://a.example/")).unwrap();
        assert_eq!(1, store.len());
        assert!(store.remove_by_address("http://a.example/").unwrap());
        assert!(!store.remove_by_address("http://a.example/").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn drains_in_bounded_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = InFlightStore::new(Arc::new(open_db(dir.path()).unwrap()));
        for i in 0..5 {
            store
                .put(&WorkItem::seed(format!("http://a.example/{i}")))
                .unwrap();
        }
        let first = store.drain_batch(3).unwrap();
        assert_eq!(3, first.len());
        assert_eq!(2, store.len());
        let second = store.drain_batch(3).unwrap();
        assert_eq!(2, second.len());
        assert!(store.drain_batch(3).unwrap().is_empty());
    }
}
