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

use crate::crawl::traits::{ExtractedLink, FetchedPage, LinkExtractor};
use scraper::Html;
use std::collections::HashSet;

/// Extracts `href` targets from HTML bodies. Non-HTML content yields no
/// links. Parsing is fully synchronous, the parsed tree never crosses an
/// await point.
#[derive(Debug, Clone)]
pub struct HrefExtractor {
    respect_nofollow: bool,
}

impl HrefExtractor {
    pub fn new(respect_nofollow: bool) -> Self {
        Self { respect_nofollow }
    }
}

impl LinkExtractor for HrefExtractor {
    fn extract(&self, page: &FetchedPage) -> Vec<ExtractedLink> {
        if !page.is_html() {
            return Vec::new();
        }
        let Some(body) = page.body.as_deref() else {
            return Vec::new();
        };
        extract_hrefs(body, self.respect_nofollow)
    }
}

fn extract_hrefs(raw: &str, respect_nofollow: bool) -> Vec<ExtractedLink> {
    let html = Html::parse_document(raw);
    if respect_nofollow && robots_meta_forbids_following(&html) {
        log::debug!("Respecting the no-follow metatag.");
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in html.select(&selectors::HREF_HOLDER) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }
        if respect_nofollow && has_nofollow_rel(element.value().attr("rel")) {
            continue;
        }
        // dedup within the page, first occurrence wins
        if !seen.insert(href.to_string()) {
            continue;
        }
        let text = element.text().collect::<String>();
        let anchor = {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        links.push(ExtractedLink {
            href: href.to_string(),
            anchor,
        });
    }
    links
}

fn has_nofollow_rel(rel: Option<&str>) -> bool {
    rel.map(|value| {
        value
            .split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("nofollow"))
    })
    .unwrap_or(false)
}

/// The content attribute is a comma separated directive list, e.g.
/// `noindex, nofollow`, so an exact attribute match is not enough.
fn robots_meta_forbids_following(html: &Html) -> bool {
    html.select(&selectors::META_ROBOTS).any(|meta| {
        meta.value()
            .attr("content")
            .map(|content| {
                content
                    .split(',')
                    .any(|directive| directive.trim().eq_ignore_ascii_case("nofollow"))
            })
            .unwrap_or(false)
    })
}

mod selectors {
    use std::sync::LazyLock as Lazy;

    macro_rules! static_selectors {
        ($($name: ident = $selector: literal)+) => {
            $(
                pub static $name: Lazy<scraper::Selector> =
                    Lazy::new(|| scraper::Selector::parse($selector).unwrap());
            )+
        };
    }

    // Ignore [ping] of area/a
    static_selectors! {
        HREF_HOLDER = "a,area,link"
        META_ROBOTS = "meta[name=\"robots\"]"
    }
}

#[cfg(test)]
mod test {
    use super::{HrefExtractor, LinkExtractor};
    use crate::crawl::traits::FetchedPage;
    use itertools::Itertools;

    fn html_page(body: &str) -> FetchedPage {
        FetchedPage {
            status: 200,
            body: Some(body.to_string()),
            content_type: Some("text/html; charset=utf-8".to_string()),
            resolved_address: "http://example.com/".to_string(),
            redirect_target: None,
        }
    }

    #[test]
    fn extracts_hrefs_with_anchors() {
        let page = html_page(
            r##"<html><body>
                <a href="/a">First</a>
                <a href="http://other.org/b"> Second </a>
                <area href="/map"/>
                <a href="#section">Skip</a>
                <a href="javascript:void(0)">Skip</a>
                <a href="/a">Duplicate</a>
            </body></html>"##,
        );
        let links = HrefExtractor::new(true).extract(&page);
        assert_eq!(
            vec!["/a", "http://other.org/b", "/map"],
            links.iter().map(|l| l.href.as_str()).collect_vec()
        );
        assert_eq!(Some("First"), links[0].anchor.as_deref());
        assert_eq!(Some("Second"), links[1].anchor.as_deref());
        assert_eq!(None, links[2].anchor);
    }

    #[test]
    fn respects_nofollow() {
        let page = html_page(r#"<a href="/a" rel="external NOFOLLOW">x</a><a href="/b">y</a>"#);
        let links = HrefExtractor::new(true).extract(&page);
        assert_eq!(
            vec!["/b"],
            links.iter().map(|l| l.href.as_str()).collect_vec()
        );
        // with the flag off the link is kept
        assert_eq!(2, HrefExtractor::new(false).extract(&page).len());
    }

    #[test]
    fn a_nofollow_metatag_disables_the_whole_page() {
        let page = html_page(
            r#"<html><head><meta name="robots" content="nofollow"></head>
               <body><a href="/a">x</a></body></html>"#,
        );
        assert!(HrefExtractor::new(true).extract(&page).is_empty());
    }

    #[test]
    fn nofollow_is_found_inside_a_directive_list() {
        let page = html_page(
            r#"<html><head><meta name="robots" content="noindex, NoFollow"></head>
               <body><a href="/a">x</a></body></html>"#,
        );
        assert!(HrefExtractor::new(true).extract(&page).is_empty());

        // a robots metatag without the directive does not disable anything
        let page = html_page(
            r#"<html><head><meta name="robots" content="noindex, noarchive"></head>
               <body><a href="/a">x</a></body></html>"#,
        );
        assert_eq!(1, HrefExtractor::new(true).extract(&page).len());
    }

    #[test]
    fn non_html_yields_nothing() {
        let mut page = html_page(r#"<a href="/a">x</a>"#);
        page.content_type = Some("application/json".to_string());
        assert!(HrefExtractor::new(true).extract(&page).is_empty());
    }
}
