//! Background sync: replays deferred requests from the queue store.
//!
//! Records are replayed one at a time in key order. A record is deleted only
//! after its replay succeeded, so a crash in between replays it again on the
//! next sync (at-least-once). An entry that can't be decoded is counted as
//! attempted and failed, and stays in the store.

use super::ServiceWorker;
use crate::cache::CacheStorage;
use crate::error::{NetworkError, WorkerError};
use crate::host::Host;
use crate::messages::ClientMessage;
use crate::network::Network;
use crate::queue::{QueueRecord, QueueStore};

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Records read from the queue at the start of the pass.
    pub attempted: usize,
    /// Records replayed and deleted.
    pub synced: usize,
    /// Records left in the queue for the next sync.
    pub failed: usize,
}

impl<C, N, Q, H> ServiceWorker<C, N, Q, H>
where
    C: CacheStorage,
    N: Network,
    Q: QueueStore,
    H: Host,
{
    /// Handles a background sync event.
    ///
    /// Tags other than the configured sync tag are ignored (`Ok(None)`).
    /// Fails only if the queue can't be read; individual replay failures are
    /// logged and leave the record queued.
    pub async fn on_sync(&self, tag: &str) -> Result<Option<SyncReport>, WorkerError> {
        if tag != self.config.sync_tag {
            log::debug!("Ignoring sync tag {}", tag);
            return Ok(None);
        }

        let entries = self.queue.get_all().await?;
        log::info!("Syncing {} queued request(s)", entries.len());

        let mut report = SyncReport {
            attempted: entries.len(),
            ..Default::default()
        };
        for entry in &entries {
            let record = match entry {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Cannot replay queued request: {}", e);
                    report.failed += 1;
                    continue;
                }
            };
            match self.replay(record).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    log::warn!(
                        "Sync failed for #{} ({} {}): {}",
                        record.id,
                        record.request.method,
                        record.request.url,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        // `count` stays the number attempted; `synced` carries the successes.
        let message = ClientMessage::SyncComplete {
            count: report.attempted,
            synced: report.synced,
        };
        match self.host.broadcast(&message).await {
            Ok(clients) => log::debug!("Notified {} client(s) of sync completion", clients),
            Err(e) => log::warn!("Failed to notify clients: {}", e),
        }

        log::info!(
            "Sync complete: {} synced, {} remaining",
            report.synced,
            report.failed
        );
        Ok(Some(report))
    }

    async fn replay(&self, record: &QueueRecord) -> Result<(), WorkerError> {
        let request = record.to_request(self.host.origin())?;
        let response = self.network.fetch(&request).await?;
        if !response.ok() {
            return Err(NetworkError::Status {
                url: request.url,
                status: response.status,
            }
            .into());
        }
        self.queue.delete(record.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseSnapshot;
    use crate::queue::{NewQueueRecord, RecordBody};
    use crate::test_support::{url, TestWorker};
    use pollster::block_on;

    fn queue(t: &TestWorker, path: &str) -> u64 {
        block_on(t.queue.add(
            &NewQueueRecord::new("POST", path)
                .with_header("Content-Type", "application/json")
                .with_body(RecordBody::Text(r#"{"draft":true}"#.to_string())),
        ))
        .unwrap()
    }

    #[test]
    fn test_partial_failure_keeps_failed_record() {
        let t = TestWorker::new();
        let first = queue(&t, "/api/flows/1");
        let second = queue(&t, "/api/flows/2");
        assert_eq!((first, second), (1, 2));
        t.network.respond(&url("/api/flows/1"), ResponseSnapshot::new(201, ""));
        t.network.fail(&url("/api/flows/2"));

        let report = block_on(t.worker.on_sync("sync-data")).unwrap().unwrap();

        assert_eq!(
            report,
            SyncReport {
                attempted: 2,
                synced: 1,
                failed: 1
            }
        );
        assert_eq!(t.queue.ids(), vec![2]);
        assert_eq!(
            t.host.broadcasts(),
            vec![ClientMessage::SyncComplete { count: 2, synced: 1 }]
        );
    }

    #[test]
    fn test_replays_stored_request() {
        let t = TestWorker::new();
        queue(&t, "/api/flows");
        t.network.respond(&url("/api/flows"), ResponseSnapshot::new(200, ""));

        block_on(t.worker.on_sync("sync-data")).unwrap();

        let calls = t.network.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].url, url("/api/flows"));
        assert_eq!(calls[0].body.as_deref(), Some(br#"{"draft":true}"#.as_slice()));
        assert_eq!(calls[0].headers.get("content-type").unwrap(), "application/json");
        assert!(t.queue.is_empty());
    }

    #[test]
    fn test_http_error_keeps_record() {
        let t = TestWorker::new();
        queue(&t, "/api/flows");
        t.network.respond(&url("/api/flows"), ResponseSnapshot::new(500, ""));

        let report = block_on(t.worker.on_sync("sync-data")).unwrap().unwrap();

        assert_eq!(report.synced, 0);
        assert_eq!(t.queue.len(), 1);
    }

    #[test]
    fn test_replays_in_order_and_retries_next_time() {
        let t = TestWorker::new();
        for path in ["/api/a", "/api/b", "/api/c"] {
            queue(&t, path);
        }
        t.network.respond(&url("/api/a"), ResponseSnapshot::new(200, ""));
        t.network.fail(&url("/api/b"));
        t.network.respond(&url("/api/c"), ResponseSnapshot::new(200, ""));

        block_on(t.worker.on_sync("sync-data")).unwrap();
        let order: Vec<_> = t.network.calls().into_iter().map(|r| r.url).collect();
        assert_eq!(order, vec![url("/api/a"), url("/api/b"), url("/api/c")]);
        assert_eq!(t.queue.ids(), vec![2]);

        t.network.respond(&url("/api/b"), ResponseSnapshot::new(200, ""));
        let report = block_on(t.worker.on_sync("sync-data")).unwrap().unwrap();
        assert_eq!(report.attempted, 1);
        assert!(t.queue.is_empty());
    }

    #[test]
    fn test_unreadable_record_counts_as_failed() {
        let t = TestWorker::new();
        queue(&t, "/api/flows/1");
        t.queue.add_unreadable("unsupported body");
        t.network.respond(&url("/api/flows/1"), ResponseSnapshot::new(200, ""));

        let report = block_on(t.worker.on_sync("sync-data")).unwrap().unwrap();

        assert_eq!(
            report,
            SyncReport {
                attempted: 2,
                synced: 1,
                failed: 1
            }
        );
        assert_eq!(t.queue.ids(), vec![2]);
        assert_eq!(t.network.calls().len(), 1);
        assert_eq!(
            t.host.broadcasts(),
            vec![ClientMessage::SyncComplete { count: 2, synced: 1 }]
        );
    }

    #[test]
    fn test_byte_body_is_replayed_verbatim() {
        let t = TestWorker::new();
        let record = NewQueueRecord::new("PUT", "/api/upload")
            .with_body(RecordBody::Bytes(vec![0, 159, 146, 150]));
        block_on(t.queue.add(&record)).unwrap();
        t.network.respond(&url("/api/upload"), ResponseSnapshot::new(204, ""));

        block_on(t.worker.on_sync("sync-data")).unwrap();

        let calls = t.network.calls();
        assert_eq!(calls[0].method, "PUT");
        assert_eq!(calls[0].body.as_deref(), Some([0u8, 159, 146, 150].as_slice()));
        assert!(t.queue.is_empty());
    }

    #[test]
    fn test_empty_queue_still_notifies() {
        let t = TestWorker::new();
        let report = block_on(t.worker.on_sync("sync-data")).unwrap().unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(
            t.host.broadcasts(),
            vec![ClientMessage::SyncComplete { count: 0, synced: 0 }]
        );
    }

    #[test]
    fn test_other_tags_ignored() {
        let t = TestWorker::new();
        queue(&t, "/api/flows");
        assert_eq!(block_on(t.worker.on_sync("periodic-refresh")).unwrap(), None);
        assert_eq!(t.queue.len(), 1);
        assert!(t.network.calls().is_empty());
        assert!(t.host.broadcasts().is_empty());
    }
}
