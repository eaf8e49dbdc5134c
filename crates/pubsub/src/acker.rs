use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

/// Backend hook invoked exactly once when a delivery is settled.
#[async_trait]
pub trait Acknowledge: Debug + Send + Sync + 'static {
    /// Marks the delivery as processed; the broker will not redeliver it.
    async fn ack(&self);

    /// Rejects the delivery; the broker's retry policy governs redelivery.
    async fn nack(&self);
}

/// Settle-once acknowledgment control handed to message handlers.
///
/// The first call to [`ack`](Self::ack) or [`nack`](Self::nack) wins; later
/// calls are no-ops. This lets a listening loop ack on normal handler return
/// without clobbering an explicit nack made inside the handler.
#[derive(Clone, Debug)]
pub struct Acker {
    inner: Arc<dyn Acknowledge>,
    settled: Arc<AtomicBool>,
}

impl Acker {
    /// Wraps a backend acknowledgment hook.
    #[must_use]
    pub fn new(inner: Arc<dyn Acknowledge>) -> Self {
        Self {
            inner,
            settled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Acknowledges the delivery if it has not been settled yet.
    pub async fn ack(&self) {
        if !self.settled.swap(true, Ordering::SeqCst) {
            self.inner.ack().await;
        }
    }

    /// Rejects the delivery if it has not been settled yet.
    pub async fn nack(&self) {
        if !self.settled.swap(true, Ordering::SeqCst) {
            self.inner.nack().await;
        }
    }

    /// Whether the delivery has already been acked or nacked.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;

    #[derive(Debug, Default)]
    struct CountingAcknowledge {
        acks: AtomicU32,
        nacks: AtomicU32,
    }

    #[async_trait]
    impl Acknowledge for CountingAcknowledge {
        async fn ack(&self) {
            self.acks.fetch_add(1, Ordering::SeqCst);
        }

        async fn nack(&self) {
            self.nacks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn first_settlement_wins() {
        let counter = Arc::new(CountingAcknowledge::default());
        let acker = Acker::new(counter.clone());

        assert!(!acker.is_settled());
        acker.nack().await;
        acker.ack().await;
        acker.nack().await;

        assert!(acker.is_settled());
        assert_eq!(counter.acks.load(Ordering::SeqCst), 0);
        assert_eq!(counter.nacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clones_share_settlement() {
        let counter = Arc::new(CountingAcknowledge::default());
        let acker = Acker::new(counter.clone());

        acker.clone().ack().await;
        acker.ack().await;

        assert_eq!(counter.acks.load(Ordering::SeqCst), 1);
    }
}
