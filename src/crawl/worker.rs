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
use crate::crawl::traits::{FetchTransport, FetchedPage, LinkExtractor, RobotsPolicy};
use crate::frontier::{AddressRegistry, Frontier, IdentifierRegistry, WorkQueueFile};
use crate::runtime::{ShutdownHandle, ShutdownReceiver};
use crate::url::{canonicalize_with_base, WorkItem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One slot of the worker pool. Loops on the frontier until it hands out
/// an empty batch, which only happens once the crawl is finished.
pub(crate) struct Worker<T, X, R> {
    id: usize,
    config: Arc<CrawlConfig>,
    frontier: Arc<Frontier<WorkQueueFile>>,
    registry: Arc<IdentifierRegistry>,
    transport: Arc<T>,
    extractor: Arc<X>,
    robots: Arc<R>,
    shutdown: ShutdownHandle,
    /// Shared with the completion monitor, counts workers that hold an
    /// unfinished batch.
    busy: Arc<AtomicUsize>,
}

impl<T, X, R> Worker<T, X, R>
where
    T: FetchTransport,
    X: LinkExtractor,
    R: RobotsPolicy,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: usize,
        config: Arc<CrawlConfig>,
        frontier: Arc<Frontier<WorkQueueFile>>,
        registry: Arc<IdentifierRegistry>,
        transport: Arc<T>,
        extractor: Arc<X>,
        robots: Arc<R>,
        shutdown: ShutdownHandle,
        busy: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            id,
            config,
            frontier,
            registry,
            transport,
            extractor,
            robots,
            shutdown,
            busy,
        }
    }

    pub(crate) async fn run(self) {
        log::debug!("Worker {} starts.", self.id);
        loop {
            if self.shutdown.is_shutdown() {
                break;
            }
            let batch = match self.frontier.get_next_urls(self.config.batch_size).await {
                Ok(batch) => batch,
                Err(err) => {
                    log::error!("Worker {} cannot dequeue anymore: {err}", self.id);
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            self.busy.fetch_add(1, Ordering::SeqCst);
            let busy = self.busy.clone();
            // counts down even if processing panics
            scopeguard::defer! {
                busy.fetch_sub(1, Ordering::SeqCst);
            }
            for item in &batch {
                // Finish the current item, never start the next one.
                if self.shutdown.is_shutdown() {
                    break;
                }
                self.process(item).await;
                let delay = self.config.politeness_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
        log::debug!("Worker {} retires.", self.id);
    }

    /// Handles a single item end to end. Always reports the item as
    /// processed, a failed fetch is still a completed piece of work.
    async fn process(&self, item: &WorkItem) {
        if self.config.respect_robots_txt && !self.robots.may_fetch(&item.address).await {
            log::debug!("Robots rules forbid {item}.");
        } else {
            match self.transport.fetch(item).await {
                Ok(page) if page.is_success() => {
                    let discovered = self.discover_links(item, &page);
                    if !discovered.is_empty() {
                        if let Err(err) = self.frontier.schedule_all(discovered) {
                            log::error!("Failed to schedule the links of {item}: {err}");
                        }
                    }
                }
                Ok(page) => {
                    log::info!("Fetching {item} returned status {}.", page.status);
                    if let Some(redirected) = self.follow_redirect(item, &page) {
                        if let Err(err) = self.frontier.schedule(redirected) {
                            log::error!("Failed to schedule the redirect of {item}: {err}");
                        }
                    }
                }
                Err(err) => {
                    log::warn!("Failed to fetch {item}: {err}");
                }
            }
        }
        if let Err(err) = self.frontier.set_processed(item) {
            log::error!("Failed to mark {item} as processed: {err}");
        }
    }

    /// Canonicalizes the extracted links against the resolved address and
    /// keeps the never seen ones, registered and at `depth + 1`.
    fn discover_links(&self, parent: &WorkItem, page: &FetchedPage) -> Vec<WorkItem> {
        let max_depth = self.config.max_depth;
        if max_depth > 0 && parent.depth >= max_depth {
            return Vec::new();
        }
        let mut discovered = Vec::new();
        for link in self.extractor.extract(page) {
            let address = match canonicalize_with_base(&page.resolved_address, &link.href) {
                Ok(address) => address,
                Err(err) => {
                    log::trace!("Discarding the link {:?}: {err}", link.href);
                    continue;
                }
            };
            if let Some(mut item) = self.register_unseen(address, parent) {
                item.anchor = link.anchor;
                discovered.push(item);
            }
        }
        discovered
    }

    /// A redirect the transport did not follow becomes a candidate at the
    /// same depth as the item that redirected.
    fn follow_redirect(&self, item: &WorkItem, page: &FetchedPage) -> Option<WorkItem> {
        let target = page.redirect_target.as_deref()?;
        let address = match canonicalize_with_base(&page.resolved_address, target) {
            Ok(address) => address,
            Err(err) => {
                log::debug!("Discarding the redirect target {target:?}: {err}");
                return None;
            }
        };
        let mut redirected = self.register_unseen(address, item)?;
        redirected.depth = item.depth;
        Some(redirected)
    }

    /// Returns a registered item for `address` if it was never seen.
    fn register_unseen(&self, address: String, parent: &WorkItem) -> Option<WorkItem> {
        match self.registry.id_of(&address) {
            Ok(Some(_)) => None,
            Ok(None) => match self.registry.assign_new_id(&address) {
                Ok(id) => {
                    let mut item = WorkItem::discovered(address, parent, None);
                    item.id = id;
                    Some(item)
                }
                Err(err) => {
                    log::error!("Failed to register {address}: {err}");
                    None
                }
            },
            Err(err) => {
                log::error!("Failed to look up {address}: {err}");
                None
            }
        }
    }
}
