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
use crate::crawl::traits::RobotsPolicy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use texting_robots::{get_robots_url, Robot};

/// The cached verdict for one robots.txt location. `None` stands for
/// "no usable robots.txt", which is permissive.
type CachedRobot = Option<Arc<Robot>>;

/// Fetches and caches robots.txt per robots location and answers the
/// may-fetch predicate. Deliberately permissive: an unreachable or
/// unparsable robots.txt allows everything.
pub struct RobotsEvaluator {
    client: reqwest::Client,
    user_agent: String,
    cache: Mutex<HashMap<String, CachedRobot>>,
}

impl RobotsEvaluator {
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cached(&self, robots_url: &str) -> Option<CachedRobot> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(robots_url)
            .cloned()
    }

    fn store(&self, robots_url: String, robot: CachedRobot) -> CachedRobot {
        // A concurrent retrieval of the same file may have won the race,
        // the first stored verdict stays authoritative.
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(robots_url)
            .or_insert(robot)
            .clone()
    }

    async fn retrieve(&self, robots_url: &str) -> CachedRobot {
        let response = match self.client.get(robots_url).send().await {
            Ok(response) => response,
            Err(err) => {
                log::debug!("Could not retrieve {robots_url}: {err}");
                return None;
            }
        };
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return None;
        }
        let raw = match response.bytes().await {
            Ok(raw) => raw,
            Err(err) => {
                log::debug!("Could not read {robots_url}: {err}");
                return None;
            }
        };
        match Robot::new(&self.user_agent, raw.as_ref()) {
            Ok(robot) => Some(Arc::new(robot)),
            Err(err) => {
                log::debug!("Unparsable robots.txt at {robots_url}: {err}");
                None
            }
        }
    }

    async fn verdict(&self, address: &str) -> bool {
        let robots_url = match get_robots_url(address) {
            Ok(robots_url) => robots_url,
            Err(err) => {
                log::debug!("No robots location for {address}: {err}");
                return true;
            }
        };
        let robot = match self.cached(&robots_url) {
            Some(cached) => cached,
            None => {
                let retrieved = self.retrieve(&robots_url).await;
                self.store(robots_url, retrieved)
            }
        };
        robot.map(|robot| robot.allowed(address)).unwrap_or(true)
    }
}

impl RobotsPolicy for RobotsEvaluator {
    async fn may_fetch(&self, address: &str) -> bool {
        self.verdict(address).await
    }
}
