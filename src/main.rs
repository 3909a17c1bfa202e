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

use anyhow::Context;
use argiope::app::{configure_logging, Args};
use argiope::client::HttpTransport;
use argiope::crawl::CrawlController;
use argiope::extraction::HrefExtractor;
use argiope::robots::RobotsEvaluator;
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, seeds) = Args::parse()
        .into_config()
        .context("Failed to load the configuration.")?;
    configure_logging(&config);

    let transport = HttpTransport::new(&config).context("Failed to build the HTTP client.")?;
    let robots = RobotsEvaluator::new(&config).context("Failed to build the robots client.")?;
    let extractor = HrefExtractor::new(config.respect_nofollow);
    let controller = Arc::new(
        CrawlController::open(config, transport, extractor, robots)
            .context("Failed to open the crawl state.")?,
    );

    for seed in seeds {
        if !controller.add_seed(&seed).await? {
            log::warn!("The seed {seed} was not scheduled.");
        }
    }

    {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.shutdown();
            }
        });
    }

    let summary = controller.run().await?;
    println!(
        "Processed {} of {} scheduled pages in {:.1?}.",
        summary.processed_pages, summary.scheduled_pages, summary.duration
    );
    Ok(())
}
