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

//! Argiope is a crash-resumable web crawler built around a durable crawl
//! frontier: a persistent FIFO of pending work, a registry of every
//! address ever seen, durable counters and an in-flight store that lets
//! an interrupted crawl pick up exactly where it stopped.

pub mod app;
pub mod client;
pub mod config;
pub mod crawl;
pub mod database;
pub mod extraction;
pub mod frontier;
pub mod robots;
pub mod runtime;
pub mod test_impls;
pub mod url;

pub use config::CrawlConfig;
pub use crawl::{CrawlController, CrawlSummary};
pub use frontier::{Frontier, FrontierSettings};
pub use url::WorkItem;
