//! Run owner: one pipeline, one consumer, one task per download.
//!
//! A [`DownloadRun`] creates the event pipeline, starts the consumer over
//! the caller's sink, spawns an engine invocation per request and waits
//! for all of them. It holds the only original [`crate::events::EventSender`]
//! and drops it once every invocation has returned, which is what ends the
//! consumer.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::download::{DEFAULT_EVENT_BUFFER, DownloadError, DownloadRequest, DownloadedFile, Downloader};
use crate::events::{DownloadId, EventSink, pipeline, spawn_consumer};

/// Per-download results plus the sink handed back by the consumer.
#[derive(Debug)]
pub struct RunOutcome<S> {
    /// One entry per request, in request order.
    pub results: Vec<(DownloadId, Result<DownloadedFile, DownloadError>)>,
    pub sink: S,
}

impl<S> RunOutcome<S> {
    #[must_use]
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.completed()
    }
}

/// Drives any number of concurrent downloads into one event consumer.
#[derive(Debug, Clone)]
pub struct DownloadRun {
    downloader: Arc<Downloader>,
    capacity: usize,
}

impl DownloadRun {
    #[must_use]
    pub fn new(downloader: Downloader) -> Self {
        Self {
            downloader: Arc::new(downloader),
            capacity: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Sets the event channel capacity (at least 1).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Runs every request concurrently and waits for all of them.
    ///
    /// Each request is registered with `sink` before any event is sent.
    /// Cancelling `cancel` stops every in-flight download.
    ///
    /// # Errors
    ///
    /// Returns a [`JoinError`] if a download task or the consumer panicked.
    pub async fn run<S>(
        &self,
        requests: Vec<DownloadRequest>,
        cancel: &CancellationToken,
        mut sink: S,
    ) -> Result<RunOutcome<S>, JoinError>
    where
        S: EventSink + 'static,
    {
        for request in &requests {
            sink.register(request.id(), request.url());
        }
        let (events, receiver) = pipeline(self.capacity);
        let consumer = spawn_consumer(receiver, sink);

        info!(downloads = requests.len(), capacity = self.capacity, "starting run");
        let order: Vec<DownloadId> = requests.iter().map(DownloadRequest::id).collect();
        let mut tasks = JoinSet::new();
        for request in requests {
            let downloader = Arc::clone(&self.downloader);
            let events = events.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let result = downloader.download(&cancel, &request, &events).await;
                (request.id(), result)
            });
        }

        let mut finished = Vec::with_capacity(order.len());
        while let Some(joined) = tasks.join_next().await {
            finished.push(joined?);
        }
        // Every invocation has returned; closing the channel ends the consumer.
        drop(events);
        let sink = consumer.await?;

        finished.sort_by_key(|(id, _)| order.iter().position(|o| o == id));
        let outcome = RunOutcome {
            results: finished,
            sink,
        };
        debug!(
            completed = outcome.completed(),
            failed = outcome.failed(),
            "run finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::download::HttpClient;
    use crate::events::LifecycleEvent;

    #[tokio::test]
    async fn test_empty_run_closes_consumer() {
        let run = DownloadRun::new(Downloader::new(HttpClient::new()));
        let outcome = run
            .run(Vec::new(), &CancellationToken::new(), Vec::<LifecycleEvent>::new())
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.sink.is_empty());
    }

    #[tokio::test]
    async fn test_results_keep_request_order_and_one_terminal_each() {
        let dir = TempDir::new().unwrap();
        let requests = vec![
            DownloadRequest::new(DownloadId(3), "bad url", dir.path()),
            DownloadRequest::new(DownloadId(1), "ftp://example.com/x", dir.path()),
            DownloadRequest::new(DownloadId(2), "also bad", dir.path()),
        ];

        let run = DownloadRun::new(Downloader::new(HttpClient::new())).with_capacity(1);
        let outcome = run
            .run(requests, &CancellationToken::new(), Vec::new())
            .await
            .unwrap();

        let ids: Vec<u64> = outcome.results.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(outcome.failed(), 3);
        assert_eq!(outcome.completed(), 0);
        for id in [1, 2, 3] {
            let terminal = outcome
                .sink
                .iter()
                .filter(|e| e.id() == DownloadId(id) && e.is_terminal())
                .count();
            assert_eq!(terminal, 1, "download {id}");
        }
    }
}
