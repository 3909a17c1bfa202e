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

use crate::config::CrawlConfig;
use crate::crawl::errors::ControllerError;
use crate::crawl::traits::{FetchTransport, LinkExtractor, RobotsPolicy};
use crate::crawl::worker::Worker;
use crate::database::{clear_crawl_state, open_db, OpenDBError};
use crate::frontier::{AddressRegistry, Frontier, IdentifierRegistry, WorkQueueFile};
use crate::runtime::{ShutdownController, ShutdownReceiver};
use crate::url::{canonicalize, WorkItem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::task::JoinSet;

/// What a finished crawl amounted to.
#[derive(Debug, Copy, Clone)]
pub struct CrawlSummary {
    pub processed_pages: u64,
    pub scheduled_pages: u64,
    pub started_at: OffsetDateTime,
    pub duration: Duration,
}

/// Owns the worker pool and the shared crawl state, feeds the workers
/// from the frontier and decides when the crawl is over. Collaborators
/// are supplied as capabilities, swapping storage or transport means
/// supplying another implementation of the respective trait.
pub struct CrawlController<T, X, R> {
    config: Arc<CrawlConfig>,
    frontier: Arc<Frontier<WorkQueueFile>>,
    registry: Arc<IdentifierRegistry>,
    transport: Arc<T>,
    extractor: Arc<X>,
    robots: Arc<R>,
    shutdown: ShutdownController,
    busy_workers: Arc<AtomicUsize>,
}

impl<T, X, R> CrawlController<T, X, R>
where
    T: FetchTransport,
    X: LinkExtractor,
    R: RobotsPolicy,
{
    /// Opens the durable state under the configured storage root. A
    /// non-resumable run wipes whatever a previous run left behind.
    pub fn open(
        config: CrawlConfig,
        transport: T,
        extractor: X,
        robots: R,
    ) -> Result<Self, ControllerError> {
        std::fs::create_dir_all(&config.storage_root)?;
        let queue_path = config.queue_file_path();
        if !config.resumable && queue_path.exists() {
            std::fs::remove_file(&queue_path)?;
        }
        let db = Arc::new(open_db(config.db_path())?);
        if !config.resumable {
            clear_crawl_state(&db).map_err(OpenDBError::from)?;
        }
        let queue = WorkQueueFile::open(queue_path)?;
        let frontier = Arc::new(Frontier::new(queue, db.clone(), config.frontier_settings())?);
        let registry = Arc::new(IdentifierRegistry::new(db)?);
        Ok(Self {
            config: Arc::new(config),
            frontier,
            registry,
            transport: Arc::new(transport),
            extractor: Arc::new(extractor),
            robots: Arc::new(robots),
            shutdown: ShutdownController::new(),
            busy_workers: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Admits a seed address: canonicalize, register, robots check,
    /// schedule. Returns whether the seed was actually scheduled, an
    /// already seen address is skipped silently.
    pub async fn add_seed(&self, raw: &str) -> Result<bool, ControllerError> {
        self.admit_seed(raw, None).await
    }

    /// Like [CrawlController::add_seed] but binds the given identifier,
    /// used to replay the numbering of a prior crawl.
    pub async fn add_seed_with_id(&self, raw: &str, id: i64) -> Result<bool, ControllerError> {
        self.admit_seed(raw, Some(id)).await
    }

    async fn admit_seed(&self, raw: &str, explicit_id: Option<i64>) -> Result<bool, ControllerError> {
        let address = canonicalize(raw)?;
        let id = match explicit_id {
            Some(id) => {
                if self.registry.id_of(&address)?.is_some() {
                    log::debug!("Skipping the already seen seed {address}.");
                    return Ok(false);
                }
                match self.registry.record_existing(&address, id) {
                    Ok(_) => id,
                    Err(err) if !self.config.halt_on_error => {
                        log::error!("Cannot bind {id} to the seed {address}: {err}");
                        return Ok(false);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            None => {
                if self.registry.id_of(&address)?.is_some() {
                    log::debug!("Skipping the already seen seed {address}.");
                    return Ok(false);
                }
                self.registry.assign_new_id(&address)?
            }
        };
        if self.config.respect_robots_txt && !self.robots.may_fetch(&address).await {
            log::warn!("Robots rules do not allow the seed {address}.");
            return Ok(false);
        }
        let mut seed = WorkItem::seed(address);
        seed.id = id;
        self.frontier.schedule(seed)?;
        Ok(true)
    }

    /// Records an address as already crawled without scheduling it, used
    /// to carry the identifier bindings of a prior crawl over.
    pub fn add_seen_url(&self, raw: &str, id: i64) -> Result<(), ControllerError> {
        let address = canonicalize(raw)?;
        match self.registry.record_existing(&address, id) {
            Ok(_) => Ok(()),
            Err(err) if !self.config.halt_on_error => {
                log::error!("Cannot record {address} as seen with id {id}: {err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Runs the crawl to completion: spawns the worker pool and the
    /// completion monitor, waits for all of them and closes the frontier.
    pub async fn run(&self) -> Result<CrawlSummary, ControllerError> {
        let started = Instant::now();
        let started_at = OffsetDateTime::now_utc();
        let worker_count = self.config.workers.max(1);
        log::info!("Starting the crawl with {worker_count} workers.");

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(
                Worker::new(
                    id,
                    self.config.clone(),
                    self.frontier.clone(),
                    self.registry.clone(),
                    self.transport.clone(),
                    self.extractor.clone(),
                    self.robots.clone(),
                    self.shutdown.handle(),
                    self.busy_workers.clone(),
                )
                .run(),
            );
        }
        let monitor = tokio::spawn(monitor_completion(
            self.frontier.clone(),
            self.busy_workers.clone(),
            self.shutdown.handle(),
            self.config.monitor_interval(),
            self.config.stabilization_window(),
        ));

        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                log::error!("A worker died unexpectedly: {err}");
            }
        }
        // With every worker gone the monitor either already finished the
        // frontier or observes the shutdown flag on its next sample.
        self.frontier.finish();
        if let Err(err) = monitor.await {
            log::error!("The completion monitor died unexpectedly: {err}");
        }
        self.frontier.close()?;

        let summary = CrawlSummary {
            processed_pages: self.frontier.processed_count()?,
            scheduled_pages: self.frontier.scheduled_count()?,
            started_at,
            duration: started.elapsed(),
        };
        log::info!(
            "Crawl done: {} of {} scheduled pages processed in {:?}.",
            summary.processed_pages,
            summary.scheduled_pages,
            summary.duration
        );
        Ok(summary)
    }

    /// Orderly shutdown: workers finish their current item but start no
    /// new one, the transport fails fast, parked dequeuers are released.
    pub fn shutdown(&self) {
        log::info!("Shutting the crawl down.");
        self.shutdown.shutdown();
        self.transport.shutdown();
        self.frontier.finish();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    pub fn frontier(&self) -> &Arc<Frontier<WorkQueueFile>> {
        &self.frontier
    }

    pub fn registry(&self) -> &Arc<IdentifierRegistry> {
        &self.registry
    }
}

/// Declares the crawl finished once the queue is empty and no worker is
/// busy for a full stabilization window. The window protects against the
/// moment where every worker is idle between a `set_processed` and the
/// `schedule_all` of the very same item's links.
async fn monitor_completion(
    frontier: Arc<Frontier<WorkQueueFile>>,
    busy_workers: Arc<AtomicUsize>,
    shutdown: crate::runtime::ShutdownHandle,
    interval: Duration,
    window: Duration,
) {
    let mut idle_since: Option<Instant> = None;
    loop {
        if frontier.is_finished() || shutdown.is_shutdown() {
            return;
        }
        tokio::time::sleep(interval).await;
        let idle = frontier.queue_length() == 0 && busy_workers.load(Ordering::SeqCst) == 0;
        if !idle {
            idle_since = None;
            continue;
        }
        match idle_since {
            None => idle_since = Some(Instant::now()),
            Some(since) if since.elapsed() >= window => {
                // sample once more right before the irreversible call
                if frontier.queue_length() == 0 && busy_workers.load(Ordering::SeqCst) == 0 {
                    log::info!("The crawl ran dry, finishing.");
                    frontier.finish();
                    return;
                }
                idle_since = None;
            }
            Some(_) => {}
        }
    }
}
