use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Default)]
pub struct FetchMetrics {
    in_flight:     AtomicUsize,
    peak:          AtomicUsize,
    attempts:      AtomicU64,
    completed:     AtomicU64,
    failed:        AtomicU64,
    cache_hits:    AtomicU64,
    bytes_fetched: AtomicU64,
}

/// Point-in-time copy of [`FetchMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub in_flight:     usize,
    pub peak:          usize,
    pub attempts:      u64,
    pub completed:     u64,
    pub failed:        u64,
    pub cache_hits:    u64,
    pub bytes_fetched: u64,
}

impl FetchMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            in_flight:     self.in_flight.load(Ordering::Acquire),
            peak:          self.peak.load(Ordering::Acquire),
            attempts:      self.attempts.load(Ordering::Relaxed),
            completed:     self.completed.load(Ordering::Relaxed),
            failed:        self.failed.load(Ordering::Relaxed),
            cache_hits:    self.cache_hits.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
        }
    }

    /// Count one HTTP attempt as active until the guard drops.
    pub(crate) fn start_attempt(&self) -> AttemptGuard<'_> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        AttemptGuard { metrics: self }
    }

    pub(crate) fn record_completed(&self, bytes: u64) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) { self.failed.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn record_hit(&self) { self.cache_hits.fetch_add(1, Ordering::Relaxed); }
}

pub(crate) struct AttemptGuard<'a> {
    metrics: &'a FetchMetrics,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) { self.metrics.in_flight.fetch_sub(1, Ordering::AcqRel); }
}
