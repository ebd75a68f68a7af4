use crate::{Checkpoint, Hash256, Slot};
use ethereum_hashing::hash;

/// The data upon which an attestation is based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,

    // LMD GHOST vote
    pub beacon_block_root: Hash256,

    // FFG vote
    pub source: Checkpoint,
    pub target: Checkpoint,
}

impl AttestationData {
    /// Digest standing in for the hash-tree-root of the data.
    pub fn canonical_root(&self) -> Hash256 {
        let mut buf = Vec::with_capacity(112);
        buf.extend_from_slice(&self.slot.as_u64().to_le_bytes());
        buf.extend_from_slice(&self.index.to_le_bytes());
        buf.extend_from_slice(self.beacon_block_root.as_bytes());
        buf.extend_from_slice(&self.source.epoch.as_u64().to_le_bytes());
        buf.extend_from_slice(self.source.root.as_bytes());
        buf.extend_from_slice(&self.target.epoch.as_u64().to_le_bytes());
        buf.extend_from_slice(self.target.root.as_bytes());
        Hash256::from_slice(&hash(&buf))
    }
}

/// An attestation with the attesting validator indices already resolved.
///
/// Committee resolution and BLS aggregate verification happen upstream; the consensus core only
/// ever consumes attestations in this form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexedAttestation {
    /// Strictly increasing validator indices.
    pub attesting_indices: Vec<u64>,
    pub data: AttestationData,
}

impl IndexedAttestation {
    pub fn is_empty(&self) -> bool {
        self.attesting_indices.is_empty()
    }
}

/// An attestation staged in a state, pending epoch processing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PendingAttestation {
    pub attesting_indices: Vec<u64>,
    pub data: AttestationData,
    pub inclusion_slot: Slot,
}
