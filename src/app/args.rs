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

use crate::config::{ConfigError, CrawlConfig};
use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "argiope", version, about = "A crash-resumable web crawler.")]
pub struct Args {
    /// Seed addresses to start from.
    #[arg(required = true)]
    pub seeds: Vec<String>,

    /// Path to a YAML configuration file.
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Directory for the durable crawl state.
    #[arg(short, long)]
    pub storage_root: Option<Utf8PathBuf>,

    /// Keep the state across runs and replay unfinished work.
    #[arg(long)]
    pub resume: bool,

    /// Stop scheduling after this many pages.
    #[arg(long)]
    pub max_pages: Option<u64>,

    /// Number of concurrent workers.
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl Args {
    /// Loads the configuration file (or the defaults) and applies the
    /// command line overrides on top.
    pub fn into_config(self) -> Result<(CrawlConfig, Vec<String>), ConfigError> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::load(path)?,
            None => CrawlConfig::default(),
        };
        if let Some(storage_root) = self.storage_root {
            config.storage_root = storage_root;
        }
        if self.resume {
            config.resumable = true;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        Ok((config, self.seeds))
    }
}
