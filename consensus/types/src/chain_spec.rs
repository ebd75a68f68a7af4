use crate::{Epoch, ForkDigest, Slot};

/// Runtime protocol parameters.
///
/// Each chain spec is a network-specific instantiation; the values which differ between presets
/// live on `EthSpec` instead so they are available at compile time.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainSpec {
    pub genesis_slot: Slot,
    pub genesis_epoch: Epoch,
    pub seconds_per_slot: u64,

    /// The fork digest in force at genesis. Peers advertising any other digest are on an
    /// incompatible network.
    pub genesis_fork_digest: ForkDigest,

    pub max_effective_balance: u64,
    pub effective_balance_increment: u64,
    pub far_future_epoch: Epoch,
}

impl ChainSpec {
    pub fn mainnet() -> Self {
        Self {
            genesis_slot: Slot::new(0),
            genesis_epoch: Epoch::new(0),
            seconds_per_slot: 12,
            genesis_fork_digest: [0, 0, 0, 0],
            max_effective_balance: 32_000_000_000,
            effective_balance_increment: 1_000_000_000,
            far_future_epoch: Epoch::max_value(),
        }
    }

    pub fn minimal() -> Self {
        Self {
            seconds_per_slot: 6,
            ..Self::mainnet()
        }
    }
}
