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

use thiserror::Error;
use url::Url;

/// Errors of [canonicalize] and [canonicalize_with_base].
#[derive(Debug, Error)]
pub enum CanonicalizationError {
    #[error("the address is empty")]
    Empty,
    #[error("the scheme {0:?} is not crawlable")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Parse(#[from] url::ParseError),
}

fn normalize(mut url: Url) -> Result<String, CanonicalizationError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(CanonicalizationError::UnsupportedScheme(other.to_string())),
    }
    url.set_fragment(None);
    Ok(url.into())
}

/// Brings a raw address into its canonical form. The parser already
/// lowercases the host and drops default ports, we additionally strip
/// fragments and refuse anything that is not http(s).
pub fn canonicalize(raw: &str) -> Result<String, CanonicalizationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CanonicalizationError::Empty);
    }
    normalize(Url::parse(raw)?)
}

/// Like [canonicalize] but resolves relative references against `base`.
pub fn canonicalize_with_base(base: &str, raw: &str) -> Result<String, CanonicalizationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CanonicalizationError::Empty);
    }
    let base = Url::parse(base)?;
    normalize(base.join(raw)?)
}

#[cfg(test)]
mod test {
    use super::{canonicalize, canonicalize_with_base, CanonicalizationError};

    #[test]
    fn normalizes_host_port_and_fragment() {
        assert_eq!(
            "http://example.com/a?b=c",
            canonicalize("HTTP://EXAMPLE.com:80/a?b=c#frag").unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            canonicalize(""),
            Err(CanonicalizationError::Empty)
        ));
        assert!(matches!(
            canonicalize("mailto:someone@example.com"),
            Err(CanonicalizationError::UnsupportedScheme(_))
        ));
        assert!(canonicalize("ht tp://broken").is_err());
    }

    #[test]
    fn resolves_relative_references() {
        assert_eq!(
            "https://example.com/sub/page.html",
            canonicalize_with_base("https://example.com/sub/", "page.html").unwrap()
        );
        assert_eq!(
            "https://other.org/",
            canonicalize_with_base("https://example.com/", "https://other.org/").unwrap()
        );
    }
}
