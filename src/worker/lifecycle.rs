//! Install, activate and page-driven control messages.

use super::ServiceWorker;
use crate::cache::CacheStorage;
use crate::error::WorkerError;
use crate::host::Host;
use crate::http::{RequestSnapshot, ResponseSnapshot};
use crate::messages::{ControlMessage, ControlReply};
use crate::network::Network;
use crate::queue::QueueStore;
use futures_util::future::try_join_all;

impl<C, N, Q, H> ServiceWorker<C, N, Q, H>
where
    C: CacheStorage,
    N: Network,
    Q: QueueStore,
    H: Host,
{
    /// Precaches the static assets, then skips waiting.
    ///
    /// Fails without writing anything if any asset can't be fetched.
    pub async fn on_install(&self) -> Result<usize, WorkerError> {
        log::info!("Installing {}", self.config.version);
        let assets = self.config.assets_cache();
        let count = self.add_all(&assets, &self.config.precache_urls).await?;
        log::info!("Precached {} assets into {}", count, assets);

        self.host.skip_waiting().await?;
        Ok(count)
    }

    /// Deletes partitions left by older versions, then claims open pages.
    ///
    /// Returns the deleted partition names. A failed deletion is logged and
    /// the remaining partitions are still processed.
    pub async fn on_activate(&self) -> Result<Vec<String>, WorkerError> {
        log::info!("Activating {}", self.config.version);
        let mut deleted = Vec::new();
        for name in self.caches.partition_names().await? {
            if !self.config.is_stale_cache(&name) {
                continue;
            }
            match self.caches.delete_partition(&name).await {
                Ok(_) => {
                    log::info!("Deleted old cache {}", name);
                    deleted.push(name);
                }
                Err(e) => log::warn!("Failed to delete old cache {}: {}", name, e),
            }
        }

        self.host.claim_clients().await?;
        Ok(deleted)
    }

    /// Handles a control message from a page.
    ///
    /// Returns the reply to post on the message's port, if the command has one.
    pub async fn on_message(
        &self,
        message: ControlMessage,
    ) -> Result<Option<ControlReply>, WorkerError> {
        match message {
            ControlMessage::SkipWaiting => {
                log::info!("Skip waiting requested");
                self.host.skip_waiting().await?;
                Ok(None)
            }
            ControlMessage::CacheUrls { urls } => {
                let runtime = self.config.runtime_cache();
                let count = self.add_all(&runtime, &urls).await?;
                log::info!("Cached {} URLs into {}", count, runtime);
                Ok(None)
            }
            ControlMessage::ClearCache => {
                let names = self.caches.partition_names().await?;
                for name in &names {
                    self.caches.delete_partition(name).await?;
                }
                log::info!("Cleared {} caches", names.len());
                Ok(Some(ControlReply::success()))
            }
            ControlMessage::QueueRequest(record) => {
                let id = self.queue.add(&record).await?;
                log::info!("Queued {} {} as #{}", record.method, record.url, id);
                Ok(Some(ControlReply {
                    success: true,
                    id: Some(id),
                    ..Default::default()
                }))
            }
            ControlMessage::GetVersion => Ok(Some(ControlReply {
                success: true,
                version: Some(self.config.version.clone()),
                ..Default::default()
            })),
        }
    }

    /// Fetches every URL, then writes all responses into `partition`.
    ///
    /// Nothing is written unless every fetch returns an ok response.
    async fn add_all(&self, partition: &str, urls: &[String]) -> Result<usize, WorkerError> {
        let fetched = try_join_all(urls.iter().map(|url| self.fetch_for_cache(url))).await?;
        for (request, response) in &fetched {
            self.caches
                .put(partition, request.cache_key(), response)
                .await?;
        }
        Ok(fetched.len())
    }

    async fn fetch_for_cache(
        &self,
        url: &str,
    ) -> Result<(RequestSnapshot, ResponseSnapshot), WorkerError> {
        let precache_error = |reason: String| WorkerError::Precache {
            url: url.to_string(),
            reason,
        };
        let absolute = self.resolve(url).map_err(|e| precache_error(e.to_string()))?;
        let request = RequestSnapshot::get(absolute.as_str());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| precache_error(e.to_string()))?;
        if !response.ok() {
            return Err(precache_error(format!("HTTP {}", response.status)));
        }
        Ok((request, response))
    }
}
