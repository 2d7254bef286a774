//! Platform services the worker depends on besides caches, queue and network.

#[cfg(target_arch = "wasm32")]
mod browser;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserHost;

use crate::error::WorkerError;
use crate::messages::ClientMessage;
use crate::worker::notification::Notification;
use futures_util::future::LocalBoxFuture;
use std::future::Future;

/// The worker's view of its runtime: registration, clients and task spawning.
pub trait Host: Clone + 'static {
    /// Origin the worker serves (`https://host:port/`).
    fn origin(&self) -> &url::Url;

    /// Activates this worker version without waiting for old clients to close.
    fn skip_waiting(&self) -> impl Future<Output = Result<(), WorkerError>>;

    /// Takes control of every open client page.
    fn claim_clients(&self) -> impl Future<Output = Result<(), WorkerError>>;

    /// Posts `message` to every connected window client; returns how many
    /// clients received it.
    fn broadcast(
        &self,
        message: &ClientMessage,
    ) -> impl Future<Output = Result<usize, WorkerError>>;

    fn show_notification(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), WorkerError>>;

    /// Focuses an open window already showing `url`, or opens a new one.
    fn open_or_focus(&self, url: &str) -> impl Future<Output = Result<(), WorkerError>>;

    /// Runs `task` detached from the current event.
    ///
    /// Nothing awaits the task and it cannot report errors; callers must
    /// handle (or discard) failures inside the future.
    fn spawn_detached(&self, task: LocalBoxFuture<'static, ()>);
}
