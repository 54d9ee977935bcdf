//! Background re-delivery of requests that failed at the connection level.
//!
//! At most one worker task runs per client. It is started by the first enqueue, re-sends
//! every queued request once per interval and exits as soon as the queue is empty. The
//! start and exit decisions are taken under the same lock, so an enqueue racing with an
//! exiting worker always ends up with a running worker.
//!
//! The queue holds at most `max_queued` entries. A full queue drops its oldest entry to make
//! room, publishing [`RestEvent::RetryAbandoned`] for it.
use super::{
    client::Shared,
    sender::HttpRequest,
    types::{RestEvent, ThrownPolicy, TransportError},
};
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
    time::Duration,
};
use tracing::{debug, info, warn};

pub(super) struct RetrySettings {
    pub enabled: bool,
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_queued: usize,
}

struct RetryEntry {
    request_id: u64,
    request: HttpRequest,
    attempts: u32,
}

#[derive(Default)]
pub(super) struct RetryQueue {
    entries: Mutex<VecDeque<RetryEntry>>,
    running: Mutex<bool>,
}

impl RetryQueue {
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    fn contains(&self, request_id: u64) -> bool {
        self.entries.lock().iter().any(|e| e.request_id == request_id)
    }

    /// Queues a request unless its id is already queued, evicting the oldest entries while
    /// the queue holds `capacity` or more.
    ///
    /// # Returns
    ///
    /// * `None` - The id was already queued. Nothing changed.
    /// * `Some(evicted)` - The request was queued. `evicted` lists the dropped entries.
    fn push(
        &self,
        request_id: u64,
        request: HttpRequest,
        capacity: usize,
    ) -> Option<Vec<RetryEntry>> {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.request_id == request_id) {
            return None;
        }

        let mut evicted = Vec::new();
        while !entries.is_empty() && entries.len() >= capacity {
            evicted.extend(entries.pop_front());
        }

        entries.push_back(RetryEntry {
            request_id,
            request,
            attempts: 0,
        });
        Some(evicted)
    }

    fn snapshot(&self) -> Vec<(u64, HttpRequest)> {
        self.entries
            .lock()
            .iter()
            .map(|e| (e.request_id, e.request.clone()))
            .collect()
    }

    fn remove(&self, request_id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.request_id != request_id);
        entries.len() != before
    }

    /// Counts a failed attempt.
    ///
    /// Returns the attempt count when the entry reached `max_attempts` and was removed.
    fn record_failure(&self, request_id: u64, max_attempts: Option<u32>) -> Option<u32> {
        let mut entries = self.entries.lock();
        let position = entries.iter().position(|e| e.request_id == request_id)?;

        let entry = &mut entries[position];
        entry.attempts += 1;
        let attempts = entry.attempts;

        match max_attempts {
            Some(max) if attempts >= max => {
                entries.remove(position);
                Some(attempts)
            }
            _ => None,
        }
    }
}

/// Queues `request` and makes sure a worker is running.
///
/// A `max_queued` of zero disables queueing.
pub(super) fn enqueue(shared: &Arc<Shared>, request_id: u64, request: HttpRequest) {
    if shared.retry.max_queued == 0 {
        return;
    }

    let url = request.url.to_string();
    let Some(evicted) = shared.queue.push(request_id, request, shared.retry.max_queued) else {
        return;
    };
    debug!(request_id, url = %url, "Request queued for retry");

    for entry in evicted {
        warn!(
            request_id = entry.request_id,
            url = %entry.request.url,
            "Retry queue full, dropping oldest request"
        );
        shared.publish(RestEvent::RetryAbandoned {
            request_id: entry.request_id,
            url: entry.request.url.to_string(),
            attempts: entry.attempts,
        });
    }

    let mut running = shared.queue.running.lock();
    if !*running {
        *running = true;
        tokio::spawn(run(
            Arc::downgrade(shared),
            shared.retry.interval,
            shared.retry.max_attempts,
        ));
        info!(interval_ms = shared.retry.interval.as_millis() as u64, "Retry worker started");
    }
}

async fn run(client: Weak<Shared>, interval: Duration, max_attempts: Option<u32>) {
    loop {
        tokio::time::sleep(interval).await;

        let Some(shared) = client.upgrade() else {
            info!("Client dropped, retry worker stopped");
            return;
        };

        for (request_id, request) in shared.queue.snapshot() {
            // Cleared or evicted since the snapshot was taken.
            if !shared.queue.contains(request_id) {
                continue;
            }

            match shared.dispatch(request_id, &request, ThrownPolicy::All).await {
                Ok(_) => {
                    if shared.queue.remove(request_id) {
                        info!(request_id, url = %request.url, "Queued request delivered");
                    }
                }
                Err(TransportError::ConnectionFailure { .. }) => {
                    if let Some(attempts) = shared.queue.record_failure(request_id, max_attempts) {
                        info!(request_id, attempts, url = %request.url, "Queued request abandoned");
                        shared.publish(RestEvent::RetryAbandoned {
                            request_id,
                            url: request.url.to_string(),
                            attempts,
                        });
                    }
                }
                Err(err) => {
                    shared.queue.remove(request_id);
                    warn!(request_id, error = %err, "Queued request failed, dropping it");
                }
            }
        }

        let mut running = shared.queue.running.lock();
        if shared.queue.is_empty() {
            *running = false;
            info!("Retry queue drained, retry worker stopped");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method};

    fn request(path: &str) -> HttpRequest {
        HttpRequest {
            method: Method::GET,
            url: url::Url::parse("http://localhost/")
                .unwrap()
                .join(path)
                .unwrap(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[test]
    fn request_ids_are_queued_once() {
        let queue = RetryQueue::default();

        assert!(queue.push(1, request("a"), 10).is_some());
        assert!(queue.push(1, request("a"), 10).is_none());
        assert!(queue.push(2, request("b"), 10).is_some());
        assert_eq!(queue.len(), 2);
        assert!(queue.contains(2));
        assert!(!queue.contains(3));

        let ids: Vec<_> = queue.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn full_queues_evict_the_oldest_entries() {
        let queue = RetryQueue::default();
        queue.push(1, request("a"), 2);
        queue.push(2, request("b"), 2);
        queue.record_failure(1, None);

        let evicted = queue.push(3, request("c"), 2).unwrap();

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].request_id, 1);
        assert_eq!(evicted[0].attempts, 1);
        assert_eq!(evicted[0].request.url.path(), "/a");

        let ids: Vec<_> = queue.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn failures_are_counted_until_the_limit() {
        let queue = RetryQueue::default();
        queue.push(1, request("a"), 10);

        assert_eq!(queue.record_failure(1, Some(3)), None);
        assert_eq!(queue.record_failure(1, Some(3)), None);
        assert_eq!(queue.record_failure(1, Some(3)), Some(3));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.record_failure(1, Some(3)), None);
    }

    #[test]
    fn unbounded_entries_are_never_abandoned() {
        let queue = RetryQueue::default();
        queue.push(1, request("a"), 10);

        for _ in 0..100 {
            assert_eq!(queue.record_failure(1, None), None);
        }
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let queue = RetryQueue::default();
        queue.push(1, request("a"), 10);
        queue.push(2, request("b"), 10);
        queue.push(3, request("c"), 10);

        assert!(queue.remove(2));
        assert!(!queue.remove(2));
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.len(), 0);
    }
}
