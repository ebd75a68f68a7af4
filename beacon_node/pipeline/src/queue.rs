use crate::events::PipelineEvent;
use crate::metrics;
use parking_lot::Mutex;
use slog::{warn, Logger};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

struct Inner {
    buf: Mutex<VecDeque<PipelineEvent>>,
    notify: Notify,
    capacity: usize,
    log: Logger,
}

/// A single-producer/single-consumer event queue with a bounded buffer.
///
/// Publication never blocks: on overflow the oldest non-critical event is dropped and counted.
/// `NewSlot` is never dropped, even if that temporarily grows the buffer past its bound.
pub fn channel(capacity: usize, log: Logger) -> (EventSender, EventReceiver) {
    let inner = Arc::new(Inner {
        buf: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity,
        log,
    });
    (
        EventSender {
            inner: inner.clone(),
        },
        EventReceiver { inner },
    )
}

#[derive(Clone)]
pub struct EventSender {
    inner: Arc<Inner>,
}

impl EventSender {
    pub fn send(&self, event: PipelineEvent) {
        let mut buf = self.inner.buf.lock();

        if buf.len() >= self.inner.capacity {
            if let Some(i) = buf.iter().position(|e| !e.is_critical()) {
                let dropped = buf.remove(i);
                warn!(
                    self.inner.log,
                    "Actor queue full, dropping oldest event";
                    "dropped" => ?dropped,
                );
                metrics::inc_counter(&metrics::EVENTS_DROPPED);
            }
        }

        buf.push_back(event);
        drop(buf);
        self.inner.notify.notify_one();
    }
}

pub struct EventReceiver {
    inner: Arc<Inner>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> PipelineEvent {
        loop {
            if let Some(event) = self.inner.buf.lock().pop_front() {
                return event;
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        self.inner.buf.lock().pop_front()
    }
}
