use std::sync::atomic::AtomicU64;

/// Daemon-wide event fabric counters. Plain atomics, no lock: the only
/// metrics this system needs are the four counted here, so there is no
/// tag/hashmap machinery to guard with a `RwLock`.
#[derive(Debug, Default)]
pub struct Metrics {
    pub delivered: AtomicU64,
    pub dropped: AtomicU64,
    pub received: AtomicU64,
    pub reconnections: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub dropped: u64,
    pub received: u64,
    pub reconnections: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        use std::sync::atomic::Ordering::Relaxed;
        MetricsSnapshot {
            delivered: self.delivered.load(Relaxed),
            dropped: self.dropped.load(Relaxed),
            received: self.received.load(Relaxed),
            reconnections: self.reconnections.load(Relaxed),
        }
    }
}
