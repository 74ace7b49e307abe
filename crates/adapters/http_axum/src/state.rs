//! Shared application state for the dispatcher.

use std::sync::Arc;

use tokio::sync::watch;

use rfhub_app::ports::DeviceLibrary;
use rfhub_app::services::device_service::DeviceService;
use rfhub_app::services::group_service::GroupService;

/// Cooperative shutdown signal shared by the server and its handlers.
///
/// Triggering is idempotent; every waiter, including ones that start waiting
/// after the trigger, is released.
#[derive(Clone, Debug)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Ask the server to stop accepting connections and drain.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // the sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

/// Application state shared across all handlers.
///
/// `Clone` is implemented manually so `L` itself does not need to be
/// `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<L> {
    /// Single-device use-cases.
    pub device_service: Arc<DeviceService<L>>,
    /// Group table and fan-out.
    pub group_service: Arc<GroupService<L>>,
    /// Triggered by `POST /shutdown`.
    pub shutdown: Shutdown,
}

impl<L> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            device_service: Arc::clone(&self.device_service),
            group_service: Arc::clone(&self.group_service),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<L: DeviceLibrary + 'static> AppState<L> {
    /// Build both services over one shared backend.
    pub fn new(library: Arc<L>) -> Self {
        Self {
            device_service: Arc::new(DeviceService::new(Arc::clone(&library))),
            group_service: Arc::new(GroupService::new(library)),
            shutdown: Shutdown::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_release_waiter_after_trigger() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        shutdown.wait().await;
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn should_release_waiter_started_before_trigger() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };
        shutdown.trigger();
        waiter.await.unwrap();
    }
}
