use crate::metrics;
use crate::peer::Eth2Peer;
use crate::rpc::{GoodbyeReason, RpcError, StatusMessage};
use slog::{debug, trace, warn, Logger};
use slot_clock::SlotClock;
use std::time::Duration;
use store::ChainDataClient;
use types::{ChainSpec, Checkpoint, Epoch, EthSpec, Hash256, SignedBeaconBlock};

/// A lookup failure while deciding on a peer. These never escape `validate`; they reduce to a
/// rejection with `UNABLE_TO_VERIFY_NETWORK`.
#[derive(Debug)]
enum LookupError {
    /// The peer's response did not arrive within the configured deadline.
    RpcTimeout,
    Rpc(RpcError),
    /// A canonical local block that must exist is missing; store corruption.
    Store(store::Error),
}

impl From<store::Error> for LookupError {
    fn from(e: store::Error) -> Self {
        LookupError::Store(e)
    }
}

/// Decides whether a remote peer follows a chain compatible with ours, from its advertised
/// status summary plus targeted historical block lookups.
pub struct PeerChainValidator<S, E: EthSpec> {
    chain: ChainDataClient<S, E>,
    spec: ChainSpec,
    rpc_timeout: Duration,
    log: Logger,
}

impl<S: SlotClock, E: EthSpec> PeerChainValidator<S, E> {
    pub fn new(
        chain: ChainDataClient<S, E>,
        spec: ChainSpec,
        rpc_timeout: Duration,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            spec,
            rpc_timeout,
            log,
        }
    }

    /// Resolves `true` iff the peer's chain is compatible with ours and the peer may remain
    /// connected. On `false` the peer has been sent a clean disconnect: `IRRELEVANT_NETWORK`
    /// for definitive incompatibility, `UNABLE_TO_VERIFY_NETWORK` when a lookup failed.
    ///
    /// Exactly one of the `valid`/`invalid`/`error` counter labels is incremented per call.
    /// Dropping the returned future leaves the peer connected.
    pub async fn validate<P: Eth2Peer>(&self, peer: &P, status: &StatusMessage) -> bool {
        trace!(self.log, "Validate chain of peer"; "peer" => %peer.peer_id());
        metrics::inc_counter_vec(
            &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
            metrics::VALIDATION_STARTED,
        );

        match self.check_remote_chain(peer, status).await {
            Ok(true) => {
                trace!(self.log, "Validated peer's chain"; "peer" => %peer.peer_id());
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    metrics::VALIDATION_VALID,
                );
                true
            }
            Ok(false) => {
                // We are not on the same chain.
                trace!(
                    self.log,
                    "Disconnecting peer on different chain";
                    "peer" => %peer.peer_id(),
                );
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    metrics::VALIDATION_INVALID,
                );
                peer.disconnect_cleanly(GoodbyeReason::IrrelevantNetwork);
                false
            }
            Err(e) => {
                debug!(
                    self.log,
                    "Unable to validate peer's chain, disconnecting";
                    "peer" => %peer.peer_id(),
                    "error" => ?e,
                );
                metrics::inc_counter_vec(
                    &metrics::PEER_CHAIN_VALIDATION_ATTEMPTS,
                    metrics::VALIDATION_ERROR,
                );
                peer.disconnect_cleanly(GoodbyeReason::UnableToVerifyNetwork);
                false
            }
        }
    }

    async fn check_remote_chain<P: Eth2Peer>(
        &self,
        peer: &P,
        status: &StatusMessage,
    ) -> Result<bool, LookupError> {
        // Check fork compatibility.
        let local_fork_digest = self.chain.fork_digest();
        if status.fork_digest != local_fork_digest {
            trace!(
                self.log,
                "Peer is on a different fork";
                "peer" => %peer.peer_id(),
                "our_fork" => hex::encode(local_fork_digest),
                "their_fork" => hex::encode(status.fork_digest),
            );
            return Ok(false);
        }

        // Only require the fork digest to match if only the genesis is finalized remotely.
        if status.finalized_epoch == self.spec.genesis_epoch {
            return Ok(true);
        }

        let local_finalized = self.chain.finalized_checkpoint();
        let current_epoch = self.chain.current_epoch();

        // Make sure the remote finalized epoch is reasonable.
        if self.remote_epoch_is_invalid(current_epoch, status.finalized_epoch) {
            debug!(
                self.log,
                "Peer is advertising a finalized epoch at or ahead of our current epoch";
                "peer" => %peer.peer_id(),
                "remote_finalized_epoch" => %status.finalized_epoch,
                "current_epoch" => %current_epoch,
            );
            return Ok(false);
        }

        // Check whether the finalized checkpoints are compatible.
        if local_finalized.epoch == status.finalized_epoch {
            Ok(local_finalized.root == status.finalized_root)
        } else if local_finalized.epoch > status.finalized_epoch {
            // We're ahead of our peer: check that we consider the peer's finalized block to be
            // canonical.
            self.verify_peers_finalized_checkpoint_is_canonical(peer, status)
        } else {
            // Our peer is ahead of us: check that it considers our latest finalized block to
            // be canonical.
            self.verify_peer_agrees_with_our_finalized_checkpoint(peer, local_finalized)
                .await
        }
    }

    fn remote_epoch_is_invalid(&self, current_epoch: Epoch, remote_finalized_epoch: Epoch) -> bool {
        // The remote finalized epoch is invalid if it is from the future, or from the current
        // epoch (unless we're at genesis).
        remote_finalized_epoch > current_epoch
            || (remote_finalized_epoch == current_epoch
                && remote_finalized_epoch != self.spec.genesis_epoch)
    }

    fn verify_peers_finalized_checkpoint_is_canonical<P: Eth2Peer>(
        &self,
        peer: &P,
        status: &StatusMessage,
    ) -> Result<bool, LookupError> {
        let remote_finalized_slot = status.finalized_epoch.start_slot(E::slots_per_epoch());
        let block = self.chain.block_in_effect_at_slot(remote_finalized_slot)?;
        Ok(self.block_roots_match(peer, &block, status.finalized_root))
    }

    async fn verify_peer_agrees_with_our_finalized_checkpoint<P: Eth2Peer>(
        &self,
        peer: &P,
        local_finalized: Checkpoint,
    ) -> Result<bool, LookupError> {
        let finalized_epoch_slot = local_finalized.epoch.start_slot(E::slots_per_epoch());
        if finalized_epoch_slot == self.spec.genesis_slot {
            // Assume that our genesis blocks match because we've already verified the fork
            // digest.
            return Ok(true);
        }

        let block_slot = self
            .chain
            .block_in_effect_at_slot(finalized_epoch_slot)?
            .slot();
        if block_slot == self.spec.genesis_slot {
            // Need to repeat the genesis check in case we finalized a later epoch without
            // producing blocks (eg the genesis block is still the one in effect at epoch 2).
            return Ok(true);
        }

        let block = match tokio::time::timeout(
            self.rpc_timeout,
            peer.request_block_by_slot(block_slot),
        )
        .await
        {
            Err(_) => return Err(LookupError::RpcTimeout),
            // An empty response to a request for a slot we know is non-empty is a protocol
            // violation, not a transient failure.
            Ok(Err(RpcError::NoBlockReturned)) => {
                warn!(
                    self.log,
                    "Peer returned no block for a non-empty slot";
                    "peer" => %peer.peer_id(),
                    "slot" => %block_slot,
                );
                return Ok(false);
            }
            Ok(Err(e)) => return Err(LookupError::Rpc(e)),
            Ok(Ok(block)) => block,
        };

        if block.slot() != block_slot {
            warn!(
                self.log,
                "Peer returned a block from the wrong slot";
                "peer" => %peer.peer_id(),
                "requested_slot" => %block_slot,
                "returned_slot" => %block.slot(),
            );
            return Ok(false);
        }

        Ok(self.block_roots_match(peer, &block, local_finalized.root))
    }

    fn block_roots_match<P: Eth2Peer>(
        &self,
        peer: &P,
        block: &SignedBeaconBlock,
        root: Hash256,
    ) -> bool {
        let block_root = block.canonical_root();
        let roots_match = block_root == root;
        if roots_match {
            trace!(
                self.log,
                "Verified finalized blocks match for peer";
                "peer" => %peer.peer_id(),
            );
        } else {
            warn!(
                self.log,
                "Detected peer with inconsistent finalized block";
                "peer" => %peer.peer_id(),
                "slot" => %block.slot(),
                "block_root" => ?block_root,
                "expected_root" => ?root,
            );
        }
        roots_match
    }
}
