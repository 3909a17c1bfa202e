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

use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Observes a shutdown request without being able to trigger one.
pub trait ShutdownReceiver: Clone + Send + Sync {
    /// Returns `true` once shutdown was requested.
    fn is_shutdown(&self) -> bool;
}

/// The owning side of the shutdown signal. The last clone going out of
/// scope triggers the shutdown as well, so an early return or panic in
/// the controller still releases everything waiting on a handle.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    handle: ShutdownHandle,
    guard: Arc<DropGuard>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let handle = ShutdownHandle {
            token: CancellationToken::new(),
        };
        let guard = Arc::new(handle.token.clone().drop_guard());
        Self { handle, guard }
    }

    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    pub fn shutdown(&self) {
        self.handle.token.cancel();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownReceiver for ShutdownController {
    fn is_shutdown(&self) -> bool {
        self.handle.is_shutdown()
    }
}

/// A cheaply clonable view on the shutdown state, one per worker.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub async fn wait(&self) {
        self.token.clone().cancelled_owned().await
    }
}

impl ShutdownReceiver for ShutdownHandle {
    fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod test {
    use super::{ShutdownController, ShutdownReceiver};
    use std::time::Duration;

    #[tokio::test]
    async fn handles_observe_the_controller() {
        let controller = ShutdownController::new();
        let handle = controller.handle();
        assert!(!handle.is_shutdown());
        controller.shutdown();
        assert!(handle.is_shutdown());
        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_the_last_controller_triggers_shutdown() {
        let controller = ShutdownController::new();
        let handle = controller.handle();
        drop(controller);
        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .unwrap();
        assert!(handle.is_shutdown());
    }
}
