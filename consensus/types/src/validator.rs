use crate::Epoch;

/// Information about a `BeaconChain` validator.
///
/// Key material is handled by the signing layer; the consensus core only needs the balance and
/// activation data required for fork choice weights and finality accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }
}
