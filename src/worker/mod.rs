//! The worker's event handlers.
//!
//! [`ServiceWorker`] exposes one method per event the platform delivers:
//!
//! | Event | Handler |
//! |---|---|
//! | `install` | [`ServiceWorker::on_install`] |
//! | `activate` | [`ServiceWorker::on_activate`] |
//! | `fetch` | [`ServiceWorker::on_fetch`] |
//! | `sync` | [`ServiceWorker::on_sync`] |
//! | `message` | [`ServiceWorker::on_message`] |
//! | `push` | [`ServiceWorker::on_push`] |
//! | `notificationclick` | [`ServiceWorker::on_notification_click`] |
//!
//! Handlers only touch the backends they are given, so the same code runs
//! against the browser APIs and against in-memory fakes.

pub mod fetch;
pub mod lifecycle;
pub mod notification;
pub mod sync;

use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::host::Host;
use crate::network::Network;
use crate::queue::QueueStore;
use std::rc::Rc;

/// Worker state shared by every event: configuration plus backends.
///
/// Cloning is cheap; all fields are shared handles.
#[derive(Clone)]
pub struct ServiceWorker<C, N, Q, H> {
    config: Rc<WorkerConfig>,
    caches: C,
    network: N,
    queue: Q,
    host: H,
}

impl<C, N, Q, H> ServiceWorker<C, N, Q, H>
where
    C: CacheStorage,
    N: Network,
    Q: QueueStore,
    H: Host,
{
    /// Validates `config` and wires it to the backends.
    pub fn new(
        config: WorkerConfig,
        caches: C,
        network: N,
        queue: Q,
        host: H,
    ) -> Result<Self, WorkerError> {
        config.validate()?;
        log::debug!(
            "Worker {} serving {} (partitions: {:?})",
            config.version,
            host.origin(),
            config.current_caches()
        );
        Ok(Self {
            config: Rc::new(config),
            caches,
            network,
            queue,
            host,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Resolves a possibly relative URL against the worker's origin.
    fn resolve(&self, url: &str) -> Result<url::Url, url::ParseError> {
        self.host.origin().join(url)
    }
}
