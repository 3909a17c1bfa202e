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

use crate::frontier::errors::QueueError;
use crate::url::WorkItem;
use queue_file::QueueFile;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// An ordered, durable FIFO of pending work items. A flat queue, the
/// `priority` and `depth` fields of the items are advisory metadata and
/// never a reordering key.
///
/// `get` and `delete` work by position: a `get(max)` must always be paired
/// with a `delete` of exactly the number of items the caller consumed,
/// otherwise items are redelivered or silently lost.
pub trait WorkQueue: Send + Sync {
    /// Appends a single item to the tail, durable before returning.
    fn put(&self, item: &WorkItem) -> Result<(), QueueError>;

    /// Appends all items to the tail, preserving their order.
    fn put_all(&self, items: &[WorkItem]) -> Result<(), QueueError>;

    /// Reads up to `max` items from the head without removing them.
    fn get(&self, max: usize) -> Result<Vec<WorkItem>, QueueError>;

    /// Removes the first `count` items.
    fn delete(&self, count: usize) -> Result<(), QueueError>;

    /// Number of pending items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A mutexed [WorkQueue] on top of a tape file.
#[derive(Debug)]
pub struct WorkQueueFile {
    queue: Mutex<QueueFile>,
}

impl WorkQueueFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, queue_file::Error> {
        Ok(Self {
            queue: Mutex::new(QueueFile::open(path)?),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueFile> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkQueue for WorkQueueFile {
    fn put(&self, item: &WorkItem) -> Result<(), QueueError> {
        let encoded = bincode::serialize(item).map_err(QueueError::EncodingError)?;
        let mut lock = self.lock();
        log::trace!("Enqueue {}", item);
        lock.add(&encoded).map_err(QueueError::QueueFileError)?;
        Ok(())
    }

    fn put_all(&self, items: &[WorkItem]) -> Result<(), QueueError> {
        let encoded: Result<Vec<Vec<u8>>, QueueError> = items
            .iter()
            .map(|item| bincode::serialize(item).map_err(QueueError::EncodingError))
            .collect();
        let mut lock = self.lock();
        lock.add_n(encoded?).map_err(QueueError::QueueFileError)?;
        Ok(())
    }

    fn get(&self, max: usize) -> Result<Vec<WorkItem>, QueueError> {
        let mut lock = self.lock();
        lock.iter()
            .take(max)
            .map(|raw| bincode::deserialize(raw.as_ref()).map_err(QueueError::EncodingError))
            .collect()
    }

    fn delete(&self, count: usize) -> Result<(), QueueError> {
        if count == 0 {
            return Ok(());
        }
        let mut lock = self.lock();
        lock.remove_n(count).map_err(QueueError::QueueFileError)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().size()
    }
}
