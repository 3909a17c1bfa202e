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
use crate::frontier::errors::StoreError;
use rocksdb::DB;
use std::sync::{Arc, Mutex, PoisonError};
use strum::{Display, EnumString};

/// The reserved counters of a crawl.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, EnumString)]
pub enum CounterName {
    /// Items ever admitted into the pending queue.
    #[strum(serialize = "scheduled_pages")]
    ScheduledPages,
    /// Items a worker reported as completed.
    #[strum(serialize = "processed_pages")]
    ProcessedPages,
}

/// Durable named counters. Increments are atomic with respect to each
/// other, the read-modify-write happens under an internal lock.
#[derive(Debug, Clone)]
pub struct CounterStore {
    db: Arc<DB>,
    guard: Arc<Mutex<()>>,
}

impl CounterStore {
    declare_column_families! {
        self.db => cf_handle(COUNTER_DB_CF)
    }

    /// Panics if the needed CFs are not configured.
    pub fn new(db: Arc<DB>) -> Self {
        db_health_check!(db: [
            Self::COUNTER_DB_CF => (
                if test counter_cf_options
                else "The column family for the counters was not properly configured."
            )
        ]);
        Self {
            db,
            guard: Arc::new(Mutex::new(())),
        }
    }

    fn read(&self, name: CounterName) -> Result<u64, StoreError> {
        let found = self
            .db
            .get_pinned_cf(&self.cf_handle(), name.to_string().as_bytes())?;
        Ok(match found {
            Some(raw) => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&raw[..8]);
                u64::from_le_bytes(bytes)
            }
            None => 0,
        })
    }

    pub fn value(&self, name: CounterName) -> Result<u64, StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.read(name)
    }

    pub fn increment(&self, name: CounterName) -> Result<u64, StoreError> {
        self.increment_by(name, 1)
    }

    /// Adds `delta` and returns the new value.
    pub fn increment_by(&self, name: CounterName, delta: u64) -> Result<u64, StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let next = self.read(name)?.saturating_add(delta);
        self.db.put_cf(
            &self.cf_handle(),
            name.to_string().as_bytes(),
            next.to_le_bytes(),
        )?;
        Ok(next)
    }

    /// Takes `delta` back off a counter. Only the in-flight replay uses
    /// this, so that re-admitting previously counted items does not count
    /// them twice.
    pub(crate) fn decrement_by(&self, name: CounterName, delta: u64) -> Result<u64, StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let next = self.read(name)?.saturating_sub(delta);
        self.db.put_cf(
            &self.cf_handle(),
            name.to_string().as_bytes(),
            next.to_le_bytes(),
        )?;
        Ok(next)
    }
}

#[cfg(test)]
mod test {
    use super::{CounterName, CounterStore};
    use crate::database::open_db;
    use std::sync::Arc;

    #[test]
    fn counts_per_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = CounterStore::new(Arc::new(open_db(dir.path()).unwrap()));
        assert_eq!(0, store.value(CounterName::ScheduledPages).unwrap());
        assert_eq!(1, store.increment(CounterName::ScheduledPages).unwrap());
        assert_eq!(4, store.increment_by(CounterName::ScheduledPages, 3).unwrap());
        assert_eq!(0, store.value(CounterName::ProcessedPages).unwrap());
    }

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = CounterStore::new(Arc::new(open_db(dir.path()).unwrap()));
            store.increment_by(CounterName::ProcessedPages, 7).unwrap();
        }
        let store = CounterStore::new(Arc::new(open_db(dir.path()).unwrap()));
        assert_eq!(7, store.value(CounterName::ProcessedPages).unwrap());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = CounterStore::new(Arc::new(open_db(dir.path()).unwrap()));
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..100 {
                        store.increment(CounterName::ScheduledPages).unwrap();
                    }
                });
            }
        });
        assert_eq!(800, store.value(CounterName::ScheduledPages).unwrap());
    }
}
