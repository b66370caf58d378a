//! Advisory progress reporting.
//!
//! Progress is best effort: the producer never blocks, and updates may be
//! dropped under backpressure. Only the final fetch result is delivered
//! reliably (see the coordinator).

use tokio::sync::mpsc;

/// Bound of the progress channel between the fetch task and the UI.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 128;

/// One advisory progress event. `batches` is 1 for a regular per-batch
/// update; the consumer accumulates the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Optional phase label, e.g. a date-seek notice.
    pub phase: Option<String>,
    /// Messages accepted in this batch.
    pub accepted: usize,
    /// Messages scanned in this batch.
    pub scanned: usize,
    /// Batches this update accounts for.
    pub batches: u32,
}

/// Non-blocking producer side of the progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<ProgressUpdate>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards everything, for callers without a UI.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send an update, dropping it if the channel is full or closed.
    pub fn send(&self, update: ProgressUpdate) {
        if let Some(tx) = &self.tx {
            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(update) {
                tracing::trace!("progress channel full, update dropped");
            }
        }
    }

    /// Report a phase transition with no message counters.
    pub fn phase(&self, phase: impl Into<String>) {
        self.send(ProgressUpdate {
            phase: Some(phase.into()),
            ..ProgressUpdate::default()
        });
    }

    /// Report one processed batch.
    pub fn batch(&self, accepted: usize, scanned: usize) {
        self.send(ProgressUpdate {
            phase: None,
            accepted,
            scanned,
            batches: 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ProgressSink::new(tx);

        sink.phase("seeking");
        sink.batch(3, 10);
        sink.batch(1, 10);
        drop(sink);

        assert_eq!(rx.recv().await.unwrap().phase.as_deref(), Some("seeking"));
        let first = rx.recv().await.unwrap();
        assert_eq!((first.accepted, first.scanned, first.batches), (3, 10, 1));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.accepted, 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn drops_on_backpressure_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ProgressSink::new(tx);

        sink.batch(1, 1);
        sink.batch(2, 2); // channel full, dropped
        drop(sink);

        assert_eq!(rx.recv().await.unwrap().accepted, 1);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn disabled_sink_is_inert() {
        ProgressSink::disabled().batch(5, 5);
    }
}
