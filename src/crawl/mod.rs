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

//! The dispatch layer: a worker pool fed from the frontier, completion
//! detection, and the seed admission surface.

mod controller;
pub mod errors;
pub mod traits;
mod worker;

pub use controller::{CrawlController, CrawlSummary};
pub use errors::ControllerError;
pub use traits::{ExtractedLink, FetchTransport, FetchedPage, LinkExtractor, RobotsPolicy};
