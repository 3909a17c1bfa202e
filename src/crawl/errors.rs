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

use crate::database::OpenDBError;
use crate::frontier::errors::{FrontierError, RegistryError};
use crate::url::CanonicalizationError;
use thiserror::Error;

/// Errors raised by the crawl controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("The seed address is not usable: {0}")]
    InvalidSeed(#[from] CanonicalizationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Frontier(#[from] FrontierError),
    #[error(transparent)]
    OpenDatabase(#[from] OpenDBError),
    #[error("Failed to open the pending queue: {0}")]
    OpenQueue(#[from] queue_file::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
}
