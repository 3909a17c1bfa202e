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
use crate::crawl::traits::{FetchTransport, FetchedPage};
use crate::url::WorkItem;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("the transport is shut down")]
    ShutDown,
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// The HTTP fetch transport of the binary: GET for regular items, form
/// POST for form submissions, per-item headers applied on top of the
/// client defaults.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    shut_down: AtomicBool,
}

impl HttpTransport {
    pub fn new(config: &CrawlConfig) -> Result<Self, FetchError> {
        let redirects = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .redirect(redirects)
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;
        Ok(Self {
            client,
            shut_down: AtomicBool::new(false),
        })
    }
}

impl FetchTransport for HttpTransport {
    type Error = FetchError;

    async fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, FetchError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(FetchError::ShutDown);
        }
        let mut request = if item.is_form_submission {
            self.client.post(&item.address).form(&item.form_params)
        } else {
            self.client.get(&item.address)
        };
        for (name, value) in &item.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let resolved_address = response.url().to_string();
        let redirect_target = if status.is_redirection() {
            response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        } else {
            None
        };
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.ok();
        Ok(FetchedPage {
            status: status.as_u16(),
            body,
            content_type,
            resolved_address,
            redirect_target,
        })
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}
