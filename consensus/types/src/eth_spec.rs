use crate::ChainSpec;
use std::fmt::Debug;

/// Compile-time protocol constants.
///
/// Implemented as a trait so consensus code can be written (and tested) against the minimal
/// preset while production uses mainnet values.
pub trait EthSpec:
    'static + Default + Clone + Copy + Debug + PartialEq + Eq + Send + Sync
{
    fn slots_per_epoch() -> u64;

    /// Length of the block-roots history ring kept in every state.
    fn slots_per_historical_root() -> usize;

    fn default_spec() -> ChainSpec;
}

/// Ethereum Foundation mainnet constants.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MainnetEthSpec;

impl EthSpec for MainnetEthSpec {
    fn slots_per_epoch() -> u64 {
        32
    }

    fn slots_per_historical_root() -> usize {
        8_192
    }

    fn default_spec() -> ChainSpec {
        ChainSpec::mainnet()
    }
}

/// Reduced constants for testing.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MinimalEthSpec;

impl EthSpec for MinimalEthSpec {
    fn slots_per_epoch() -> u64 {
        8
    }

    fn slots_per_historical_root() -> usize {
        64
    }

    fn default_spec() -> ChainSpec {
        ChainSpec::minimal()
    }
}
