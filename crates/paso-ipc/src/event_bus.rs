use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use paso_core::types::ChangeDescriptor;

use crate::metrics::Metrics;
use crate::protocol::EventEnvelope;

pub type ClientId = Uuid;

/// A bounded, per-subscriber fan-out bus. Each subscriber gets its own
/// bounded `flume` channel; a slow consumer's full channel is a drop, not a
/// block on the rest of the broadcast — this is what keeps one stuck reader
/// from stalling delivery to every other client.
pub struct EventBus {
    subscribers: RwLock<Vec<(ClientId, flume::Sender<EventEnvelope>)>>,
    sequence: AtomicU64,
    metrics: Arc<Metrics>,
}

impl EventBus {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        EventBus { subscribers: RwLock::new(Vec::new()), sequence: AtomicU64::new(0), metrics }
    }

    pub async fn subscribe(&self, capacity: usize) -> (ClientId, flume::Receiver<EventEnvelope>) {
        let id = Uuid::new_v4();
        let (tx, rx) = flume::bounded(capacity);
        self.subscribers.write().await.push((id, tx));
        (id, rx)
    }

    pub async fn unsubscribe(&self, id: ClientId) {
        self.subscribers.write().await.retain(|(cid, _)| *cid != id);
    }

    /// Assigns the next global sequence id and fans the event out to every
    /// subscriber. Collects the current subscriber list under the read
    /// lock, then releases it before sending, so a slow client's `try_send`
    /// never holds up registration of a new subscriber.
    pub async fn publish(&self, change: ChangeDescriptor) -> u64 {
        let sequence_id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::database_changed(sequence_id, change);

        let targets: Vec<(ClientId, flume::Sender<EventEnvelope>)> =
            self.subscribers.read().await.iter().cloned().collect();

        for (_, tx) in targets {
            match tx.try_send(envelope.clone()) {
                Ok(()) => self.metrics.delivered.fetch_add(1, Ordering::Relaxed),
                Err(_) => self.metrics.dropped.fetch_add(1, Ordering::Relaxed),
            };
        }

        sequence_id
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paso_core::types::{ChangeKind, EntityKind, ProjectId};

    fn sample_change() -> ChangeDescriptor {
        ChangeDescriptor { project_id: ProjectId(1), entity_kind: EntityKind::Task, entity_id: Some(1), kind: ChangeKind::Created }
    }

    #[tokio::test]
    async fn publish_delivers_to_all_subscribers() {
        let bus = EventBus::new(Arc::new(Metrics::default()));
        let (_id1, rx1) = bus.subscribe(4).await;
        let (_id2, rx2) = bus.subscribe(4).await;

        bus.publish(sample_change()).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn sequence_ids_are_monotonic() {
        let bus = EventBus::new(Arc::new(Metrics::default()));
        let seq1 = bus.publish(sample_change()).await;
        let seq2 = bus.publish(sample_change()).await;
        assert!(seq2 > seq1);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking_other_subscribers() {
        let metrics = Arc::new(Metrics::default());
        let bus = EventBus::new(metrics.clone());
        let (_slow_id, slow_rx) = bus.subscribe(1).await;
        let (_fast_id, fast_rx) = bus.subscribe(4).await;

        bus.publish(sample_change()).await;
        // slow_rx's queue is now full (capacity 1, unread); publish again.
        bus.publish(sample_change()).await;

        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_ok());
        assert_eq!(metrics.dropped.load(Ordering::Relaxed), 1);
        drop(slow_rx);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new(Arc::new(Metrics::default()));
        let (id, rx) = bus.subscribe(4).await;
        bus.unsubscribe(id).await;
        bus.publish(sample_change()).await;
        assert!(rx.try_recv().is_err());
    }
}
