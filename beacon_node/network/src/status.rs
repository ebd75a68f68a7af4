use crate::rpc::StatusMessage;
use slot_clock::SlotClock;
use store::ChainDataClient;
use types::EthSpec;

/// Trait to produce a `StatusMessage` representing the state of our chain.
///
/// NOTE: The purpose of this is simply to obtain a `StatusMessage` from the chain without
/// polluting/coupling the chain types with RPC concepts.
pub trait ToStatusMessage {
    fn status_message(&self) -> StatusMessage;
}

impl<S: SlotClock, E: EthSpec> ToStatusMessage for ChainDataClient<S, E> {
    fn status_message(&self) -> StatusMessage {
        let head = self.head();
        let finalized = self.finalized_checkpoint();

        StatusMessage {
            fork_digest: self.fork_digest(),
            finalized_root: finalized.root,
            finalized_epoch: finalized.epoch,
            head_root: head.block_root,
            head_slot: head.slot,
        }
    }
}
