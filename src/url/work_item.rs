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

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Separates the address from the form fields in the encoded string form.
pub const FORM_SEPARATOR: &str = "<<<POST_DATA>>>";
/// Separates two form fields from each other.
pub const PAIR_SEPARATOR: &str = "``--``";
/// Separates a form field name from its value.
pub const VALUE_SEPARATOR: char = '=';

/// The id of a [WorkItem] before the registry assigned one.
pub const UNASSIGNED_ID: i64 = -1;

/// A single crawl candidate. Identity is defined solely by [WorkItem::address],
/// everything else is provenance or an execution directive for the fetch
/// transport. Immutable once scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// The canonical address of the target. Never empty.
    pub address: String,
    /// The unique identifier assigned by the registry, [UNASSIGNED_ID] until then.
    pub id: i64,
    /// The id of the page this address was first observed on.
    pub parent_id: i64,
    /// The address of the page this address was first observed on.
    pub parent_address: Option<String>,
    /// Seeds are at depth 0, links extracted from them at 1, etc.
    pub depth: u16,
    /// Ordering hint for downstream consumers, lower is more urgent.
    pub priority: i8,
    /// The anchor text of the link that discovered this address.
    pub anchor: Option<String>,
    /// How often fetching this address already failed.
    pub failed_fetch_count: u16,
    pub follow_redirects_immediately: bool,
    pub max_immediate_redirects: u16,
    /// Extra headers the transport sends with the request.
    pub headers: Vec<(String, String)>,
    /// Submit as a form instead of a plain GET.
    pub is_form_submission: bool,
    pub form_params: Vec<(String, String)>,
    /// Ask the transport to use a browser automation driver.
    pub use_browser_automation: bool,
}

impl WorkItem {
    /// Creates a seed item at depth 0.
    pub fn seed(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: UNASSIGNED_ID,
            parent_id: UNASSIGNED_ID,
            parent_address: None,
            depth: 0,
            priority: 0,
            anchor: None,
            failed_fetch_count: 0,
            follow_redirects_immediately: true,
            max_immediate_redirects: 0,
            headers: Vec::new(),
            is_form_submission: false,
            form_params: Vec::new(),
            use_browser_automation: false,
        }
    }

    /// Creates an item for an address discovered on `parent`, one level deeper.
    /// Execution directives are not inherited, a discovered link is a plain fetch.
    pub fn discovered(
        address: impl Into<String>,
        parent: &WorkItem,
        anchor: Option<String>,
    ) -> Self {
        Self {
            address: address.into(),
            id: UNASSIGNED_ID,
            parent_id: parent.id,
            parent_address: Some(parent.address.clone()),
            depth: parent.depth.saturating_add(1),
            priority: parent.priority,
            anchor,
            failed_fetch_count: 0,
            follow_redirects_immediately: true,
            max_immediate_redirects: 0,
            headers: Vec::new(),
            is_form_submission: false,
            form_params: Vec::new(),
            use_browser_automation: false,
        }
    }

    /// Turns a seed into a form submission with the given fields.
    pub fn into_form_submission(mut self, params: Vec<(String, String)>) -> Self {
        self.is_form_submission = true;
        self.form_params = params;
        self
    }

    /// The string form under which this item is persisted for interop: the
    /// plain address, or `address<<<POST_DATA>>>k=v``--``k=v` for form
    /// submissions.
    pub fn encode(&self) -> String {
        if !self.is_form_submission {
            return self.address.clone();
        }
        let mut encoded = String::with_capacity(self.address.len() + FORM_SEPARATOR.len());
        encoded.push_str(&self.address);
        encoded.push_str(FORM_SEPARATOR);
        let mut first = true;
        for (name, value) in &self.form_params {
            if !first {
                encoded.push_str(PAIR_SEPARATOR);
            }
            first = false;
            encoded.push_str(name);
            encoded.push(VALUE_SEPARATOR);
            encoded.push_str(value);
        }
        encoded
    }

    /// Parses the string form produced by [WorkItem::encode] back into an item.
    /// Fields that are not part of the string form keep their defaults.
    pub fn decode_str(encoded: &str) -> Self {
        match encoded.split_once(FORM_SEPARATOR) {
            None => Self::seed(encoded),
            Some((address, params)) => {
                let params = if params.is_empty() {
                    Vec::new()
                } else {
                    params
                        .split(PAIR_SEPARATOR)
                        .map(|pair| match pair.split_once(VALUE_SEPARATOR) {
                            Some((name, value)) => (name.to_string(), value.to_string()),
                            None => (pair.to_string(), String::new()),
                        })
                        .collect()
                };
                Self::seed(address).into_form_submission(params)
            }
        }
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for WorkItem {}

impl Hash for WorkItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state)
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl AsRef<str> for WorkItem {
    fn as_ref(&self) -> &str {
        &self.address
    }
}
