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

//! The crash-resumable scheduling core: a durable FIFO of pending work,
//! a registry of already seen addresses, in-flight tracking for restarts
//! and the [Frontier] tying them together.

pub mod counters;
pub mod errors;
mod frontier;
pub mod inflight;
pub mod queue;
pub mod registry;

pub use counters::{CounterName, CounterStore};
pub use frontier::{Frontier, FrontierSettings, WorkAvailable};
pub use inflight::InFlightStore;
pub use queue::{WorkQueue, WorkQueueFile};
pub use registry::{AddressRegistry, IdentifierRegistry};
