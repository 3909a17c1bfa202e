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

//! Deterministic in-memory collaborators for tests: a site graph instead
//! of the network, a line based extractor and an always-allow policy.

use crate::crawl::traits::{
    ExtractedLink, FetchTransport, FetchedPage, LinkExtractor, RobotsPolicy,
};
use crate::url::WorkItem;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("the transport is shut down")]
pub struct SiteGraphShutDown;

const URI_LIST: &str = "text/uri-list";

/// A fixed web: every known address resolves to a newline separated list
/// of outgoing links, everything else is a 404.
#[derive(Debug, Default)]
pub struct SiteGraph {
    pages: HashMap<String, Vec<String>>,
    fetches: AtomicUsize,
    shut_down: AtomicBool,
}

impl SiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, address: &str, links: &[&str]) -> Self {
        self.pages.insert(
            address.to_string(),
            links.iter().map(|link| link.to_string()).collect(),
        );
        self
    }

    /// How many fetches were answered so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FetchTransport for SiteGraph {
    type Error = SiteGraphShutDown;

    async fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, SiteGraphShutDown> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SiteGraphShutDown);
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(match self.pages.get(&item.address) {
            Some(links) => FetchedPage {
                status: 200,
                body: Some(links.join("\n")),
                content_type: Some(URI_LIST.to_string()),
                resolved_address: item.address.clone(),
                redirect_target: None,
            },
            None => FetchedPage {
                status: 404,
                body: None,
                content_type: None,
                resolved_address: item.address.clone(),
                redirect_target: None,
            },
        })
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// Treats every non-empty body line of a uri-list page as a link.
#[derive(Debug, Default, Copy, Clone)]
pub struct LineExtractor;

impl LinkExtractor for LineExtractor {
    fn extract(&self, page: &FetchedPage) -> Vec<ExtractedLink> {
        if page.content_type.as_deref() != Some(URI_LIST) {
            return Vec::new();
        }
        let Some(body) = page.body.as_deref() else {
            return Vec::new();
        };
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ExtractedLink::new)
            .collect()
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct AllowAllRobots;

impl RobotsPolicy for AllowAllRobots {
    async fn may_fetch(&self, _address: &str) -> bool {
        true
    }
}
