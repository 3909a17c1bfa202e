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

use crate::url::WorkItem;

/// What one fetch produced.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    /// The decoded body, `None` for bodyless responses.
    pub body: Option<String>,
    pub content_type: Option<String>,
    /// The address the response actually came from, after redirects.
    pub resolved_address: String,
    /// Set when the transport did not follow a redirect itself.
    pub redirect_target: Option<String>,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(false)
    }
}

/// Retrieves the content behind a work item.
pub trait FetchTransport: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(
        &self,
        item: &WorkItem,
    ) -> impl std::future::Future<Output = Result<FetchedPage, Self::Error>> + Send;

    /// After this call every fetch fails fast. Used by the shutdown
    /// protocol so workers drain instead of waiting on the network.
    fn shutdown(&self);
}

/// A link as found in a page, before canonicalization.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExtractedLink {
    /// Raw, possibly relative reference.
    pub href: String,
    pub anchor: Option<String>,
}

impl ExtractedLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            anchor: None,
        }
    }
}

/// Pulls candidate links out of a fetched page. The results are raw,
/// canonicalization is the caller's job.
pub trait LinkExtractor: Send + Sync + 'static {
    fn extract(&self, page: &FetchedPage) -> Vec<ExtractedLink>;
}

/// Decides whether an address may be fetched at all.
pub trait RobotsPolicy: Send + Sync + 'static {
    fn may_fetch(&self, address: &str) -> impl std::future::Future<Output = bool> + Send;
}
