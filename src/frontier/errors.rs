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

/// Error of the pending work queue file.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    QueueFileError(#[from] queue_file::Error),
    #[error(transparent)]
    EncodingError(#[from] bincode::Error),
}

/// Error of the rocksdb backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] rocksdb::Error),
    #[error(transparent)]
    Encoding(#[from] bincode::Error),
}

/// Error of the identifier registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Database(#[from] rocksdb::Error),
    #[error("identifier {requested} cannot be bound to {address:?}, it collides with an existing assignment")]
    DuplicateIdentifier { address: String, requested: i64 },
}

/// Error of the frontier. Only surfaces to callers when the crawl is
/// configured to halt on storage errors.
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Database(#[from] rocksdb::Error),
}
