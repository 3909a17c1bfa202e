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
use crate::frontier::errors::RegistryError;
use rocksdb::{WriteBatch, DB};
use std::sync::{Arc, Mutex, PoisonError};

/// The single source of truth for "seen before": assigns and remembers a
/// unique identifier per canonical address.
pub trait AddressRegistry: Send + Sync {
    /// Pure lookup without a side effect.
    fn id_of(&self, address: &str) -> Result<Option<i64>, RegistryError>;

    /// Allocates the next unused id for `address`, durably records the
    /// mapping and returns it. Calling it for an address that is already
    /// registered returns the recorded id instead of reallocating.
    fn assign_new_id(&self, address: &str) -> Result<i64, RegistryError>;

    /// Seeds a specific id for an address, used to replay a prior crawl's
    /// numbering. Replayed ids must arrive in increasing order.
    fn record_existing(&self, address: &str, id: i64) -> Result<(), RegistryError>;

    /// Number of addresses ever registered.
    fn count(&self) -> usize;
}

const NEXT_ID_KEY: &[u8] = b"next_id";

/// Append-only, durable address -> id registry on rocksdb. Ids start at 1
/// and are strictly increasing in allocation order, never reused, also
/// across restarts: the allocation cursor is persisted in the same write
/// batch as every assignment.
#[derive(Debug)]
pub struct IdentifierRegistry {
    db: Arc<DB>,
    /// The next id to hand out. Mirror of the durable cursor, all
    /// allocation happens while holding this lock.
    alloc: Mutex<i64>,
}

impl IdentifierRegistry {
    declare_column_families! {
        self.db => cf_handle(REGISTRY_DB_CF)
        self.db => cf_meta_handle(REGISTRY_META_DB_CF)
    }

    /// Panics if the needed CFs are not configured.
    pub fn new(db: Arc<DB>) -> Result<Self, RegistryError> {
        db_health_check!(db: [
            Self::REGISTRY_DB_CF => (
                if test registry_cf_options
                else "The column family for the identifier registry was not properly configured."
            )
            Self::REGISTRY_META_DB_CF => (
                if test registry_meta_cf_options
                else "The column family for the registry metadata was not properly configured."
            )
        ]);
        let registry = Self {
            db,
            alloc: Mutex::new(1),
        };
        let next = match registry
            .db
            .get_pinned_cf(&registry.cf_meta_handle(), NEXT_ID_KEY)?
        {
            Some(raw) => decode_id(&raw),
            None => 1,
        };
        *registry.lock_alloc() = next;
        Ok(registry)
    }

    fn lock_alloc(&self) -> std::sync::MutexGuard<'_, i64> {
        self.alloc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, address: &str) -> Result<Option<i64>, RegistryError> {
        let found = self.db.get_pinned_cf(&self.cf_handle(), address.as_bytes())?;
        Ok(found.map(|raw| decode_id(&raw)))
    }

    /// Writes the mapping and the moved cursor atomically.
    fn commit(&self, address: &str, id: i64, next: i64) -> Result<(), RegistryError> {
        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf_handle(), address.as_bytes(), id.to_le_bytes());
        batch.put_cf(&self.cf_meta_handle(), NEXT_ID_KEY, next.to_le_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

fn decode_id(raw: &[u8]) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[..8]);
    i64::from_le_bytes(bytes)
}

impl AddressRegistry for IdentifierRegistry {
    fn id_of(&self, address: &str) -> Result<Option<i64>, RegistryError> {
        self.lookup(address)
    }

    fn assign_new_id(&self, address: &str) -> Result<i64, RegistryError> {
        let mut alloc = self.lock_alloc();
        if let Some(existing) = self.lookup(address)? {
            return Ok(existing);
        }
        let id = *alloc;
        self.commit(address, id, id + 1)?;
        *alloc = id + 1;
        Ok(id)
    }

    fn record_existing(&self, address: &str, id: i64) -> Result<(), RegistryError> {
        let mut alloc = self.lock_alloc();
        match self.lookup(address)? {
            Some(existing) if existing == id => Ok(()),
            Some(_) => Err(RegistryError::DuplicateIdentifier {
                address: address.to_string(),
                requested: id,
            }),
            // Below the cursor the id may already belong to another
            // address, without a reverse index we cannot prove otherwise.
            None if id < *alloc => Err(RegistryError::DuplicateIdentifier {
                address: address.to_string(),
                requested: id,
            }),
            None => {
                let next = id + 1;
                self.commit(address, id, next)?;
                *alloc = next;
                Ok(())
            }
        }
    }

    fn count(&self) -> usize {
        get_len(&self.db, self.cf_handle())
    }
}

#[cfg(test)]
mod test {
    use super::{AddressRegistry, IdentifierRegistry};
    use crate::database::open_db;
    use crate::frontier::errors::RegistryError;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn open(dir: &std::path::Path) -> IdentifierRegistry {
        IdentifierRegistry::new(Arc::new(open_db(dir).unwrap())).unwrap()
    }

    #[test]
    fn assigns_increasing_ids_once_per_address() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path());
        assert_eq!(None, registry.id_of("http://a.example/").unwrap());
        let a = registry.assign_new_id("http://a.example/").unwrap();
        let b = registry.assign_new_id("http://b.example/").unwrap();
        assert_eq!(1, a);
        assert_eq!(2, b);
        // misuse guard: a second assignment must not reallocate
        assert_eq!(a, registry.assign_new_id("http://a.example/").unwrap());
        assert_eq!(Some(a), registry.id_of("http://a.example/").unwrap());
        assert_eq!(2, registry.count());
    }

    #[test]
    fn ids_are_never_reused_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = open(dir.path());
            assert_eq!(1, registry.assign_new_id("http://a.example/").unwrap());
            assert_eq!(2, registry.assign_new_id("http://b.example/").unwrap());
        }
        let registry = open(dir.path());
        assert_eq!(Some(2), registry.id_of("http://b.example/").unwrap());
        assert_eq!(3, registry.assign_new_id("http://c.example/").unwrap());
    }

    #[test]
    fn record_existing_replays_a_prior_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path());
        registry.record_existing("http://a.example/", 1).unwrap();
        registry.record_existing("http://b.example/", 2).unwrap();
        registry.record_existing("http://c.example/", 7).unwrap();
        // idempotent for the exact same binding
        registry.record_existing("http://c.example/", 7).unwrap();
        // the cursor continues after the highest replayed id
        assert_eq!(8, registry.assign_new_id("http://d.example/").unwrap());
        assert_eq!(4, registry.count());
    }

    #[test]
    fn record_existing_rejects_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path());
        registry.record_existing("http://a.example/", 3).unwrap();
        assert!(matches!(
            registry.record_existing("http://a.example/", 4),
            Err(RegistryError::DuplicateIdentifier { .. })
        ));
        // 2 is below the cursor, it may already be taken
        assert!(matches!(
            registry.record_existing("http://b.example/", 2),
            Err(RegistryError::DuplicateIdentifier { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_assignment_emits_unique_monotonic_ids() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(open(dir.path()));

        let addresses: Vec<String> = (0..50)
            .map(|i| format!("http://site{i}.example/"))
            .collect();

        let mut set = tokio::task::JoinSet::new();
        for round in 0..200 {
            for address in &addresses {
                let registry = registry.clone();
                let address = address.clone();
                let _ = round;
                set.spawn(async move {
                    let id = match registry.id_of(&address).unwrap() {
                        Some(id) => id,
                        None => registry.assign_new_id(&address).unwrap(),
                    };
                    (address, id)
                });
            }
        }

        let mut seen: HashMap<String, i64> = HashMap::new();
        while let Some(result) = set.join_next().await {
            let (address, id) = result.unwrap();
            // every address maps to exactly one id, over all 10_000 calls
            let prior = seen.entry(address).or_insert(id);
            assert_eq!(*prior, id);
        }

        assert_eq!(50, seen.len());
        let mut ids: Vec<i64> = seen.values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(50, ids.len(), "ids must be unique");
        assert!(*ids.first().unwrap() >= 1);
        assert!(*ids.last().unwrap() <= 50, "ids must be allocated densely");
        assert_eq!(50, registry.count());
    }
}
