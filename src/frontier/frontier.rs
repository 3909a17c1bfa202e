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

use crate::frontier::counters::{CounterName, CounterStore};
use crate::frontier::errors::FrontierError;
use crate::frontier::inflight::InFlightStore;
use crate::frontier::queue::WorkQueue;
use crate::url::WorkItem;
use rocksdb::DB;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

const REPLAY_BATCH_SIZE: usize = 100;

/// Sent on the wake channel after an admission and on [Frontier::finish].
#[derive(Debug, Copy, Clone)]
pub struct WorkAvailable;

/// How a [Frontier] behaves, independent of its stores.
#[derive(Debug, Copy, Clone)]
pub struct FrontierSettings {
    /// Track dequeued items durably and replay them after a restart.
    pub resumable: bool,
    /// Lifetime admission cap, 0 means unlimited. Items beyond the cap
    /// are silently dropped, never deferred.
    pub max_pages: u64,
    /// Propagate storage errors to the caller instead of degrading the
    /// failed call to a no-op.
    pub halt_on_error: bool,
}

impl Default for FrontierSettings {
    fn default() -> Self {
        Self {
            resumable: false,
            max_pages: 0,
            halt_on_error: false,
        }
    }
}

struct FrontierState<Q> {
    queue: Q,
    in_flight: Option<InFlightStore>,
    counters: CounterStore,
    /// In-memory mirror of the SCHEDULED counter for cap checks.
    scheduled_pages: u64,
    is_finished: bool,
}

/// The scheduling authority of a crawl: admission against the global page
/// cap, blocking batch dequeue, in-flight tracking and finish signaling.
///
/// All mutation of queue, counters and flags happens under one mutex that
/// is never held across an await. The "work available" signal lives on a
/// separate watch channel, waking is broadcast so that [Frontier::finish]
/// releases every parked dequeuer at once.
pub struct Frontier<Q: WorkQueue> {
    state: Mutex<FrontierState<Q>>,
    wake: watch::Sender<WorkAvailable>,
    db: Arc<DB>,
    settings: FrontierSettings,
}

impl<Q: WorkQueue> Frontier<Q> {
    /// Builds a frontier over an already opened queue and database. In
    /// resumable mode this replays every in-flight item of the previous
    /// run back into the pending queue before returning: a crash gives no
    /// information about whether such an item was fetched, so it is
    /// treated as not yet fetched.
    pub fn new(queue: Q, db: Arc<DB>, settings: FrontierSettings) -> Result<Self, FrontierError> {
        let counters = CounterStore::new(db.clone());
        let in_flight = settings.resumable.then(|| InFlightStore::new(db.clone()));
        let frontier = Self {
            state: Mutex::new(FrontierState {
                queue,
                in_flight,
                counters,
                scheduled_pages: 0,
                is_finished: false,
            }),
            wake: watch::Sender::new(WorkAvailable),
            db,
            settings,
        };
        if settings.resumable {
            frontier.replay_in_flight()?;
        }
        Ok(frontier)
    }

    fn lock_state(&self) -> MutexGuard<'_, FrontierState<Q>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        let _ = self.wake.send(WorkAvailable);
    }

    fn replay_in_flight(&self) -> Result<(), FrontierError> {
        let mut state = self.lock_state();
        state.scheduled_pages = state.counters.value(CounterName::ScheduledPages)?;
        let Some(in_flight) = state.in_flight.clone() else {
            return Ok(());
        };
        let pending = in_flight.len();
        if pending == 0 {
            return Ok(());
        }
        log::info!("Rescheduling {pending} addresses from the previous run.");
        loop {
            let batch = in_flight.drain_batch(REPLAY_BATCH_SIZE)?;
            if batch.is_empty() {
                break;
            }
            // The drained items were already counted as scheduled by the
            // previous run. Take them off both the mirror and the durable
            // counter first, so that re-admission does not count them twice.
            let drained = batch.len() as u64;
            state.scheduled_pages = state.scheduled_pages.saturating_sub(drained);
            state
                .counters
                .decrement_by(CounterName::ScheduledPages, drained)?;
            self.admit_all(&mut state, batch)?;
        }
        Ok(())
    }

    /// Admits items one at a time until the cap is hit, then stops
    /// admitting the rest of the batch. Returns the number admitted.
    fn admit_all<I>(
        &self,
        state: &mut FrontierState<Q>,
        items: I,
    ) -> Result<u64, FrontierError>
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let max_pages = self.settings.max_pages;
        let mut admitted = 0u64;
        let mut failure: Option<FrontierError> = None;
        for item in items {
            if max_pages > 0 && state.scheduled_pages + admitted >= max_pages {
                log::debug!("Dropping {item}, the page cap of {max_pages} is reached.");
                break;
            }
            match state.queue.put(&item) {
                Ok(_) => admitted += 1,
                Err(err) => {
                    if self.settings.halt_on_error {
                        failure = Some(err.into());
                        break;
                    }
                    log::error!("Failed to put {item} into the work queue: {err}");
                }
            }
        }
        if admitted > 0 {
            state.scheduled_pages += admitted;
            if let Err(err) = state
                .counters
                .increment_by(CounterName::ScheduledPages, admitted)
            {
                if self.settings.halt_on_error && failure.is_none() {
                    failure = Some(err.into());
                } else {
                    log::error!("Failed to increment the scheduled counter: {err}");
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(admitted),
        }
    }

    /// Appends the item to the pending queue unless the page cap is
    /// reached, in which case it is silently dropped.
    pub fn schedule(&self, item: WorkItem) -> Result<(), FrontierError> {
        let mut state = self.lock_state();
        let result = self.admit_all(&mut state, std::iter::once(item));
        drop(state);
        match result {
            Ok(admitted) => {
                if admitted > 0 {
                    self.notify();
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Schedules a whole batch; once the cap is hit the remaining items
    /// of the batch are dropped, not queued for later. Waiters are woken
    /// once after the whole batch.
    pub fn schedule_all(&self, items: Vec<WorkItem>) -> Result<(), FrontierError> {
        let mut state = self.lock_state();
        let result = self.admit_all(&mut state, items);
        drop(state);
        self.notify();
        result.map(|_| ())
    }

    fn pull(state: &mut FrontierState<Q>, max: usize) -> Result<Vec<WorkItem>, FrontierError> {
        let items = state.queue.get(max)?;
        state.queue.delete(items.len())?;
        if let Some(in_flight) = &state.in_flight {
            for item in &items {
                in_flight.put(item)?;
            }
        }
        Ok(items)
    }

    /// Blocking batch dequeue: returns a non-empty batch of up to `max`
    /// items whenever one is obtainable, parking on the wake signal while
    /// the queue is empty. Returns an empty batch only once
    /// [Frontier::finish] was called. The sole intentional blocking point
    /// of the crawl core.
    pub async fn get_next_urls(&self, max: usize) -> Result<Vec<WorkItem>, FrontierError> {
        loop {
            // Subscribe before checking the queue, an admission between
            // the check and the park is observed by `changed`.
            let mut wake = self.wake.subscribe();
            {
                let mut state = self.lock_state();
                if state.is_finished {
                    return Ok(Vec::new());
                }
                match Self::pull(&mut state, max) {
                    Ok(items) => {
                        if !items.is_empty() {
                            return Ok(items);
                        }
                    }
                    Err(err) => {
                        if self.settings.halt_on_error {
                            return Err(err);
                        }
                        log::error!("Failed to pull the next batch: {err}");
                    }
                }
            }
            if wake.changed().await.is_err() {
                // the frontier owns the sender, this is only reachable on teardown
                return Ok(Vec::new());
            }
        }
    }

    /// Marks an item as completed: bumps the processed counter and drops
    /// the in-flight entry. A missing entry is logged, it can legitimately
    /// happen when in-flight tracking was not enabled at dequeue time.
    pub fn set_processed(&self, item: &WorkItem) -> Result<(), FrontierError> {
        let state = self.lock_state();
        let result = (|| -> Result<(), FrontierError> {
            state.counters.increment(CounterName::ProcessedPages)?;
            if let Some(in_flight) = &state.in_flight {
                if !in_flight.remove_by_address(&item.address)? {
                    log::warn!("Could not remove {item} from the in-flight store.");
                }
            }
            Ok(())
        })();
        drop(state);
        match result {
            Ok(_) => Ok(()),
            Err(err) if !self.settings.halt_on_error => {
                log::error!("Failed to mark {item} as processed: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Irreversibly stops the frontier and wakes every parked dequeuer.
    pub fn finish(&self) {
        {
            let mut state = self.lock_state();
            state.is_finished = true;
        }
        self.notify();
    }

    pub fn is_finished(&self) -> bool {
        self.lock_state().is_finished
    }

    pub fn queue_length(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock_state()
            .in_flight
            .as_ref()
            .map(|store| store.len())
            .unwrap_or(0)
    }

    pub fn processed_count(&self) -> Result<u64, FrontierError> {
        Ok(self
            .lock_state()
            .counters
            .value(CounterName::ProcessedPages)?)
    }

    pub fn scheduled_count(&self) -> Result<u64, FrontierError> {
        Ok(self
            .lock_state()
            .counters
            .value(CounterName::ScheduledPages)?)
    }

    /// Flushes the underlying stores. Dropping the frontier releases them.
    pub fn close(&self) -> Result<(), FrontierError> {
        self.db.flush()?;
        Ok(())
    }
}
