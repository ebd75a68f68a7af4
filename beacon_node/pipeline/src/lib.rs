//! Slot-tick driven actor mesh producing attestations over typed event channels.

mod attester;
mod bus;
mod delayed_attestations;
mod events;
mod metrics;
mod queue;

pub use attester::BeaconAttester;
pub use bus::{Pipeline, PipelineBuilder, DEFAULT_QUEUE_CAPACITY};
pub use delayed_attestations::DelayedAttestationsProcessor;
pub use events::{EventHandler, PipelineEvent};
pub use queue::{channel, EventReceiver, EventSender};
