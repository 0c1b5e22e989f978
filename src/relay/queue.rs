//! FIFO hand-off between packetization and transmission.
//!
//! The queue is unbounded: producers never wait. Its depth is tracked so a
//! backlog can be observed; crossing the high-watermark logs a warning and
//! calls the optional alert hook once per crossing.

use bytes::Bytes;
use log::warn;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{RelayError, Result};

/// Called with the current depth when the high-watermark is crossed.
pub type AlertHook = Arc<dyn Fn(usize) + Send + Sync>;

struct QueueState {
    depth: AtomicUsize,
    peak: AtomicUsize,
    enqueued: AtomicU64,
    high_watermark: usize,
    alerted: AtomicBool,
    hook: Option<AlertHook>,
}

impl QueueState {
    /// Reserves a slot in the depth gauge before the packet is handed off.
    fn reserve(&self) -> usize {
        self.depth.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn release(&self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }

    /// Records a packet that is now in the channel.
    fn on_enqueued(&self, depth: usize) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.peak.fetch_max(depth, Ordering::Relaxed);

        if depth >= self.high_watermark && !self.alerted.swap(true, Ordering::AcqRel) {
            warn!(
                "dispatch queue backlog: {} packets waiting (high-watermark {})",
                depth, self.high_watermark
            );
            if let Some(hook) = &self.hook {
                hook(depth);
            }
        }
    }

    fn on_dequeue(&self) {
        let depth = self.depth.fetch_sub(1, Ordering::AcqRel) - 1;
        if depth < self.high_watermark {
            self.alerted.store(false, Ordering::Release);
        }
    }
}

/// Builder for a dispatch queue.
pub struct DispatchQueue {
    high_watermark: usize,
    hook: Option<AlertHook>,
}

impl DispatchQueue {
    /// `high_watermark` is clamped to at least one packet.
    pub fn new(high_watermark: usize) -> Self {
        Self {
            high_watermark: high_watermark.max(1),
            hook: None,
        }
    }

    /// Calls `hook` each time the depth crosses the high-watermark.
    pub fn on_high_watermark<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Creates the producer and consumer ends.
    pub fn split(self) -> (DispatchSender, DispatchReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState {
            depth: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            enqueued: AtomicU64::new(0),
            high_watermark: self.high_watermark,
            alerted: AtomicBool::new(false),
            hook: self.hook,
        });

        (
            DispatchSender {
                tx,
                state: state.clone(),
            },
            DispatchReceiver { rx, state },
        )
    }
}

/// Producer end. Cloning yields another producer on the same queue.
#[derive(Clone)]
pub struct DispatchSender {
    tx: mpsc::UnboundedSender<Bytes>,
    state: Arc<QueueState>,
}

impl DispatchSender {
    /// Appends a packet without waiting.
    ///
    /// A packet refused by a closed queue leaves the counters untouched.
    pub fn send(&self, packet: Bytes) -> Result<()> {
        // The gauge goes up first so the consumer never sees an uncounted packet.
        let depth = self.state.reserve();
        match self.tx.send(packet) {
            Ok(()) => {
                self.state.on_enqueued(depth);
                Ok(())
            }
            Err(_) => {
                self.state.release();
                Err(RelayError::QueueClosed)
            }
        }
    }

    /// Packets currently waiting
    pub fn depth(&self) -> usize {
        self.state.depth.load(Ordering::Acquire)
    }

    /// True once the receiver is closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for DispatchSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSender")
            .field("depth", &self.depth())
            .field("high_watermark", &self.state.high_watermark)
            .finish()
    }
}

/// Consumer end.
pub struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<Bytes>,
    state: Arc<QueueState>,
}

impl DispatchReceiver {
    /// Waits for the next packet. Returns `None` once every sender is gone
    /// and the queue has drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let packet = self.rx.recv().await?;
        self.state.on_dequeue();
        Some(packet)
    }

    /// Stops accepting packets; already queued packets can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Packets currently waiting
    pub fn depth(&self) -> usize {
        self.state.depth.load(Ordering::Acquire)
    }

    /// Deepest backlog seen so far
    pub fn peak_depth(&self) -> usize {
        self.state.peak.load(Ordering::Relaxed)
    }

    /// Packets accepted since the queue was created
    pub fn total_enqueued(&self) -> u64 {
        self.state.enqueued.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for DispatchReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchReceiver")
            .field("depth", &self.depth())
            .field("peak_depth", &self.peak_depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tokio_test::{assert_pending, assert_ready};

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = DispatchQueue::new(1024).split();
        for i in 0..100u8 {
            tx.send(Bytes::from(vec![i])).unwrap();
        }
        assert_eq!(tx.depth(), 100);

        for i in 0..100u8 {
            assert_eq!(rx.recv().await.unwrap()[0], i);
        }
        assert_eq!(rx.depth(), 0);
        assert_eq!(rx.peak_depth(), 100);
        assert_eq!(rx.total_enqueued(), 100);
    }

    #[tokio::test]
    async fn test_receiver_ends_after_senders_drop() {
        let (tx, mut rx) = DispatchQueue::new(8).split();
        tx.send(Bytes::from_static(b"last")).unwrap();
        drop(tx);

        assert_eq!(&rx.recv().await.unwrap()[..], b"last");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_send_after_close_fails() {
        let alerts = Arc::new(Mutex::new(Vec::new()));
        let hook_alerts = alerts.clone();
        let (tx, mut rx) = DispatchQueue::new(1)
            .on_high_watermark(move |depth| hook_alerts.lock().unwrap().push(depth))
            .split();
        rx.close();

        assert!(tx.is_closed());
        assert!(matches!(tx.send(Bytes::new()), Err(RelayError::QueueClosed)));
        assert_eq!(tx.depth(), 0);
        assert_eq!(rx.total_enqueued(), 0);
        assert_eq!(rx.peak_depth(), 0);
        assert!(alerts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_consumer_suspends_until_packet() {
        let (tx, mut rx) = DispatchQueue::new(8).split();
        let mut recv = tokio_test::task::spawn(rx.recv());

        assert_pending!(recv.poll());
        tx.send(Bytes::from_static(&[1, 2, 3])).unwrap();
        assert!(recv.is_woken());

        let packet = assert_ready!(recv.poll());
        assert_eq!(packet.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_high_watermark_alerts_once_per_crossing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook_seen = seen.clone();
        let (tx, mut rx) = DispatchQueue::new(3)
            .on_high_watermark(move |depth| hook_seen.lock().unwrap().push(depth))
            .split();

        for _ in 0..5 {
            tx.send(Bytes::new()).unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), vec![3]);

        // Drain below the watermark, then cross it again
        for _ in 0..4 {
            rx.recv().await.unwrap();
        }
        for _ in 0..2 {
            tx.send(Bytes::new()).unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), vec![3, 3]);
    }
}
