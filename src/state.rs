use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as channel;
use dashmap::DashMap;

use crate::sampler::SpeedSample;

pub struct Subscribers {
    // concurrent map to avoid a global mutex during broadcast
    senders: DashMap<u64, channel::Sender<SpeedSample>>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn insert(&self, capacity: usize) -> (u64, channel::Receiver<SpeedSample>) {
        let (tx, rx) = channel::bounded(capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.senders.insert(id, tx);
        (id, rx)
    }

    pub fn remove(&self, id: u64) {
        self.senders.remove(&id);
    }

    pub fn dispose(&self) {
        self.senders.clear();
    }

    pub fn broadcast(&self, sample: SpeedSample) {
        // Clone senders without holding any global lock; DashMap provides
        // per-bucket locking which is brief during iteration.
        let snapshot: Vec<(u64, channel::Sender<SpeedSample>)> =
            self.senders.iter().map(|e| (*e.key(), e.value().clone())).collect();

        let mut to_remove: Vec<u64> = Vec::new();
        for (id, tx) in snapshot.into_iter() {
            match tx.try_send(sample) {
                Ok(()) => {}
                Err(channel::TrySendError::Full(_)) => {
                    // Slow subscriber: the stream is periodic, so it just
                    // misses this sample and stays registered.
                }
                Err(channel::TrySendError::Disconnected(_)) => {
                    to_remove.push(id);
                }
            }
        }

        for id in to_remove {
            self.remove(id);
        }
    }
}

/// Receiving end of one broadcast registration. Dropping it detaches the
/// subscriber without touching the others.
pub struct Subscription {
    id: u64,
    registry: Arc<Subscribers>,
    rx: channel::Receiver<SpeedSample>,
}

impl Subscription {
    pub(crate) fn register(registry: Arc<Subscribers>, capacity: usize) -> Self {
        let (id, rx) = registry.insert(capacity);
        Self { id, registry, rx }
    }

    pub fn try_recv(&self) -> Result<SpeedSample, channel::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<SpeedSample, channel::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn detach(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
