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

use argiope::crawl::CrawlController;
use argiope::frontier::AddressRegistry;
use argiope::test_impls::{AllowAllRobots, LineExtractor, SiteGraph};
use argiope::CrawlConfig;
use camino::Utf8PathBuf;
use std::time::Duration;

fn test_config(dir: &tempfile::TempDir) -> CrawlConfig {
    CrawlConfig {
        storage_root: Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
        workers: 2,
        batch_size: 3,
        monitor_interval_ms: 20,
        stabilization_window_ms: 100,
        politeness_delay_ms: 0,
        ..Default::default()
    }
}

fn small_site() -> SiteGraph {
    SiteGraph::new()
        .page(
            "http://site.example/",
            &["http://site.example/a", "http://site.example/b"],
        )
        .page(
            "http://site.example/a",
            &["http://site.example/b", "http://site.example/c"],
        )
        .page("http://site.example/b", &["http://site.example/"])
        .page("http://site.example/c", &["http://site.example/dead"])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_small_site_is_crawled_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let controller = CrawlController::open(
        test_config(&dir),
        small_site(),
        LineExtractor,
        AllowAllRobots,
    )
    .unwrap();

    assert!(controller.add_seed("http://site.example/").await.unwrap());
    // the same seed again is a silent skip
    assert!(!controller.add_seed("http://site.example/").await.unwrap());

    let summary = tokio::time::timeout(Duration::from_secs(30), controller.run())
        .await
        .unwrap()
        .unwrap();

    // /, /a, /b, /c and the dead link
    assert_eq!(5, summary.scheduled_pages);
    assert_eq!(5, summary.processed_pages);
    assert_eq!(5, controller.registry().count());
    assert_eq!(0, controller.frontier().queue_length());
    assert!(controller.frontier().is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn the_page_cap_bounds_the_whole_crawl() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.max_pages = 2;
    let controller =
        CrawlController::open(config, small_site(), LineExtractor, AllowAllRobots).unwrap();

    assert!(controller.add_seed("http://site.example/").await.unwrap());
    let summary = tokio::time::timeout(Duration::from_secs(30), controller.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(2, summary.scheduled_pages);
    assert_eq!(2, summary.processed_pages);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn max_depth_stops_link_following() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.max_depth = 1;
    let controller =
        CrawlController::open(config, small_site(), LineExtractor, AllowAllRobots).unwrap();

    assert!(controller.add_seed("http://site.example/").await.unwrap());
    let summary = tokio::time::timeout(Duration::from_secs(30), controller.run())
        .await
        .unwrap()
        .unwrap();

    // the seed plus its direct links, nothing from depth 1 pages
    assert_eq!(3, summary.scheduled_pages);
    assert_eq!(3, summary.processed_pages);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn seen_urls_are_not_fetched_again() {
    let dir = tempfile::tempdir().unwrap();
    let controller = CrawlController::open(
        test_config(&dir),
        small_site(),
        LineExtractor,
        AllowAllRobots,
    )
    .unwrap();

    // replay a prior crawl's bindings: /a is known and must not be fetched
    controller.add_seen_url("http://site.example/a", 1).unwrap();
    assert!(controller.add_seed("http://site.example/").await.unwrap());

    let summary = tokio::time::timeout(Duration::from_secs(30), controller.run())
        .await
        .unwrap()
        .unwrap();

    // only / and /b run, and without /a its exclusive child /c is
    // never discovered
    assert_eq!(2, summary.processed_pages);
    assert_eq!(Some(1), controller.registry().id_of("http://site.example/a").unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalid_seeds_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let controller = CrawlController::open(
        test_config(&dir),
        SiteGraph::new(),
        LineExtractor,
        AllowAllRobots,
    )
    .unwrap();

    assert!(controller.add_seed("not a url").await.is_err());
    assert!(controller.add_seed("ftp://example.com/").await.is_err());
    assert_eq!(0, controller.frontier().queue_length());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_ends_the_crawl_early() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    // keep the monitor from declaring completion first and slow the
    // workers down enough that the ring outlives the stop request
    config.stabilization_window_ms = 60_000;
    config.politeness_delay_ms = 10;
    let mut site = SiteGraph::new();
    // a large fully connected ring so the crawl would run for a while
    let addresses: Vec<String> = (0..500)
        .map(|i| format!("http://ring.example/{i}"))
        .collect();
    for (i, address) in addresses.iter().enumerate() {
        let next = &addresses[(i + 1) % addresses.len()];
        site = site.page(address, &[next.as_str()]);
    }
    let controller = std::sync::Arc::new(
        CrawlController::open(config, site, LineExtractor, AllowAllRobots).unwrap(),
    );

    assert!(controller.add_seed(&addresses[0]).await.unwrap());
    let stopper = {
        let controller = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            controller.shutdown();
        })
    };

    let summary = tokio::time::timeout(Duration::from_secs(30), controller.run())
        .await
        .unwrap()
        .unwrap();
    stopper.await.unwrap();

    assert!(controller.is_shutting_down());
    // the crawl stopped before exhausting the ring
    assert!(summary.processed_pages < 500);
}
