//! Fakes shared by the unit tests.

use crate::cache::MemoryCacheStorage;
use crate::config::WorkerConfig;
use crate::error::{NetworkError, WorkerError};
use crate::host::Host;
use crate::http::{RequestSnapshot, ResponseSnapshot};
use crate::messages::ClientMessage;
use crate::network::Network;
use crate::queue::MemoryQueueStore;
use crate::worker::notification::Notification;
use crate::worker::ServiceWorker;
use futures_util::future::LocalBoxFuture;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const ORIGIN: &str = "https://flowforge.test";

/// Absolute URL for `path` on the test origin.
pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

/// Network whose answers are scripted per URL. Unscripted URLs fail as if
/// offline.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    routes: Rc<RefCell<HashMap<String, Option<ResponseSnapshot>>>>,
    calls: Rc<RefCell<Vec<RequestSnapshot>>>,
}

impl ScriptedNetwork {
    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.routes.borrow_mut().insert(url.to_string(), Some(response));
    }

    pub fn fail(&self, url: &str) {
        self.routes.borrow_mut().insert(url.to_string(), None);
    }

    pub fn calls(&self) -> Vec<RequestSnapshot> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|r| r.url == url).count()
    }
}

impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &RequestSnapshot) -> Result<ResponseSnapshot, NetworkError> {
        self.calls.borrow_mut().push(request.clone());
        match self.routes.borrow().get(&request.url) {
            Some(Some(response)) => Ok(response.clone()),
            _ => Err(NetworkError::FetchFailed {
                url: request.url.clone(),
                message: "Failed to fetch".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct HostLog {
    skip_waiting: usize,
    claims: usize,
    broadcasts: Vec<ClientMessage>,
    notifications: Vec<Notification>,
    opened: Vec<String>,
    tasks: Vec<LocalBoxFuture<'static, ()>>,
}

/// Host that records every call. Detached tasks are held until
/// [`RecordingHost::run_pending`].
#[derive(Clone)]
pub struct RecordingHost {
    origin: url::Url,
    log: Rc<RefCell<HostLog>>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            origin: url::Url::parse(ORIGIN).expect("valid test origin"),
            log: Rc::default(),
        }
    }
}

impl RecordingHost {
    pub fn skip_waiting_calls(&self) -> usize {
        self.log.borrow().skip_waiting
    }

    pub fn claim_calls(&self) -> usize {
        self.log.borrow().claims
    }

    pub fn broadcasts(&self) -> Vec<ClientMessage> {
        self.log.borrow().broadcasts.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log.borrow().notifications.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.log.borrow().opened.clone()
    }

    pub fn pending_tasks(&self) -> usize {
        self.log.borrow().tasks.len()
    }

    /// Runs every detached task to completion; returns how many ran.
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut self.log.borrow_mut().tasks);
        let count = tasks.len();
        for task in tasks {
            pollster::block_on(task);
        }
        count
    }
}

impl Host for RecordingHost {
    fn origin(&self) -> &url::Url {
        &self.origin
    }

    async fn skip_waiting(&self) -> Result<(), WorkerError> {
        self.log.borrow_mut().skip_waiting += 1;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), WorkerError> {
        self.log.borrow_mut().claims += 1;
        Ok(())
    }

    async fn broadcast(&self, message: &ClientMessage) -> Result<usize, WorkerError> {
        self.log.borrow_mut().broadcasts.push(message.clone());
        Ok(1)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), WorkerError> {
        self.log
            .borrow_mut()
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn open_or_focus(&self, url: &str) -> Result<(), WorkerError> {
        self.log.borrow_mut().opened.push(url.to_string());
        Ok(())
    }

    fn spawn_detached(&self, task: LocalBoxFuture<'static, ()>) {
        self.log.borrow_mut().tasks.push(task);
    }
}

pub type TestServiceWorker =
    ServiceWorker<MemoryCacheStorage, ScriptedNetwork, MemoryQueueStore, RecordingHost>;

/// A worker wired to fakes, with handles to inspect each one.
pub struct TestWorker {
    pub worker: TestServiceWorker,
    pub caches: MemoryCacheStorage,
    pub network: ScriptedNetwork,
    pub queue: MemoryQueueStore,
    pub host: RecordingHost,
}

impl TestWorker {
    pub fn new() -> Self {
        Self::with_config(WorkerConfig::default())
    }

    pub fn with_config(config: WorkerConfig) -> Self {
        let caches = MemoryCacheStorage::new();
        let network = ScriptedNetwork::default();
        let queue = MemoryQueueStore::new();
        let host = RecordingHost::default();
        let worker = ServiceWorker::new(
            config,
            caches.clone(),
            network.clone(),
            queue.clone(),
            host.clone(),
        )
        .expect("valid test config");
        Self {
            worker,
            caches,
            network,
            queue,
            host,
        }
    }
}
