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

use crate::frontier::FrontierSettings;
use camino::{Utf8Path, Utf8PathBuf};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// The complete configuration of a crawl, loadable from a YAML file.
/// Every field has a default, an empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Root directory for all durable state of this crawl.
    pub storage_root: Utf8PathBuf,
    /// Keep the durable state across runs and replay unfinished work on
    /// startup. When off, the previous state is wiped at startup.
    pub resumable: bool,
    /// Lifetime cap on scheduled pages, 0 means unlimited.
    pub max_pages: u64,
    /// Stop following links below this depth, 0 means unlimited.
    pub max_depth: u16,
    /// Number of concurrent workers.
    pub workers: usize,
    /// How many items a worker asks for per dequeue.
    pub batch_size: usize,
    /// How often the completion monitor samples the crawl state.
    pub monitor_interval_ms: u64,
    /// How long queue and workers must stay idle before the crawl is
    /// declared finished.
    pub stabilization_window_ms: u64,
    /// Propagate storage errors instead of degrading them to no-ops.
    pub halt_on_error: bool,
    /// Pause between items on one worker.
    pub politeness_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub respect_robots_txt: bool,
    /// Skip links marked rel="nofollow" during extraction.
    pub respect_nofollow: bool,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub log_level: LevelFilter,
    pub log_to_file: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            storage_root: Utf8PathBuf::from("./argiope_data"),
            resumable: false,
            max_pages: 0,
            max_depth: 0,
            workers: num_cpus::get(),
            batch_size: 50,
            monitor_interval_ms: 2_000,
            stabilization_window_ms: 10_000,
            halt_on_error: false,
            politeness_delay_ms: 200,
            request_timeout_ms: 30_000,
            user_agent: concat!("argiope/", env!("CARGO_PKG_VERSION")).to_string(),
            respect_robots_txt: true,
            respect_nofollow: true,
            follow_redirects: true,
            max_redirects: 5,
            log_level: LevelFilter::Info,
            log_to_file: false,
        }
    }
}

impl CrawlConfig {
    pub fn load<P: AsRef<Utf8Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// The tape file of the pending queue.
    pub fn queue_file_path(&self) -> Utf8PathBuf {
        self.storage_root.join("pending.q")
    }

    /// The rocksdb directory shared by registry, in-flight and counters.
    pub fn db_path(&self) -> Utf8PathBuf {
        self.storage_root.join("frontier")
    }

    pub fn log_file_path(&self) -> Utf8PathBuf {
        self.storage_root.join("argiope.log")
    }

    pub fn frontier_settings(&self) -> FrontierSettings {
        FrontierSettings {
            resumable: self.resumable,
            max_pages: self.max_pages,
            halt_on_error: self.halt_on_error,
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn stabilization_window(&self) -> Duration {
        Duration::from_millis(self.stabilization_window_ms)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use super::CrawlConfig;

    #[test]
    fn an_empty_file_yields_the_defaults() {
        let parsed: CrawlConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(0, parsed.max_pages);
        assert!(!parsed.resumable);
        assert_eq!(50, parsed.batch_size);
    }

    #[test]
    fn partial_files_override_selectively() {
        let parsed: CrawlConfig = serde_yaml::from_str(
            "max_pages: 100\nresumable: true\nstorage_root: /tmp/crawl\nlog_level: DEBUG\n",
        )
        .unwrap();
        assert_eq!(100, parsed.max_pages);
        assert!(parsed.resumable);
        assert_eq!("/tmp/crawl/pending.q", parsed.queue_file_path());
        assert_eq!(log::LevelFilter::Debug, parsed.log_level);
    }
}
