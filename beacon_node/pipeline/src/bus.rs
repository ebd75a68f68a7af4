use crate::events::{EventHandler, PipelineEvent};
use crate::queue::{channel, EventReceiver, EventSender};
use slog::{trace, Logger};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default per-actor queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct Publisher {
    actor_queues: Vec<EventSender>,
    /// Every event also flows to the tap, for external observers.
    tap: mpsc::UnboundedSender<PipelineEvent>,
}

impl Publisher {
    fn publish(&self, event: PipelineEvent) {
        for queue in &self.actor_queues {
            queue.send(event.clone());
        }
        let _ = self.tap.send(event);
    }
}

/// Wires actors together before spawning them.
pub struct PipelineBuilder {
    actors: Vec<(Box<dyn EventHandler>, EventSender, EventReceiver)>,
    log: Logger,
}

impl PipelineBuilder {
    pub fn new(log: Logger) -> Self {
        Self {
            actors: vec![],
            log,
        }
    }

    pub fn actor<H: EventHandler + 'static>(self, handler: H) -> Self {
        self.actor_with_capacity(handler, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn actor_with_capacity<H: EventHandler + 'static>(
        mut self,
        handler: H,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = channel(capacity, self.log.clone());
        self.actors.push((Box::new(handler), tx, rx));
        self
    }

    /// Spawn one task per actor. Returns the running mesh and the tap carrying every event
    /// published on the bus.
    pub fn spawn(self) -> (Pipeline, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tap_tx, tap_rx) = mpsc::unbounded_channel();

        let publisher = Arc::new(Publisher {
            actor_queues: self.actors.iter().map(|(_, tx, _)| tx.clone()).collect(),
            tap: tap_tx,
        });

        let mut handles = vec![];
        for (mut handler, _, mut rx) in self.actors {
            let publisher = publisher.clone();
            let log = self.log.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let event = rx.recv().await;
                    for derived in handler.handle(event) {
                        trace!(
                            log,
                            "Actor published event";
                            "actor" => handler.name(),
                            "event" => ?derived,
                        );
                        publisher.publish(derived);
                    }
                }
            }));
        }

        (
            Pipeline {
                publisher,
                handles,
            },
            tap_rx,
        )
    }
}

/// A running actor mesh.
///
/// Ordering guarantees: each actor consumes its queue in FIFO order, and a `NewSlot` published
/// before any derived event of that slot is delivered before them to every actor. Dropping the
/// pipeline aborts the actor tasks.
pub struct Pipeline {
    publisher: Arc<Publisher>,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Non-blocking publication to every actor (and the tap).
    pub fn publish(&self, event: PipelineEvent) {
        self.publisher.publish(event);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
