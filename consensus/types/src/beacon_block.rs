use crate::{Hash256, IndexedAttestation, Slot};
use ethereum_hashing::hash;

/// The body of a `BeaconBlock`.
///
/// Operations the consensus core does not process (deposits, exits, slashings) are handled by
/// external collaborators and omitted here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeaconBlockBody {
    pub randao_reveal: Signature,
    pub graffiti: [u8; 32],
    pub attestations: Vec<IndexedAttestation>,
}

impl BeaconBlockBody {
    /// Digest standing in for the hash-tree-root of the body.
    pub fn canonical_root(&self) -> Hash256 {
        let mut buf = Vec::with_capacity(32 + 32 * self.attestations.len());
        buf.extend_from_slice(&self.graffiti);
        for attestation in &self.attestations {
            buf.extend_from_slice(attestation.data.canonical_root().as_bytes());
            for index in &attestation.attesting_indices {
                buf.extend_from_slice(&index.to_le_bytes());
            }
        }
        Hash256::from_slice(&hash(&buf))
    }
}

/// A block of the `BeaconChain`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
}

impl BeaconBlock {
    /// Digest standing in for the hash-tree-root of the block.
    ///
    /// Computed over the same five fields as `BeaconBlockHeader::canonical_root` so a block and
    /// its header resolve to the same identity.
    pub fn canonical_root(&self) -> Hash256 {
        header_root(
            self.slot,
            self.proposer_index,
            self.parent_root,
            self.state_root,
            self.body.canonical_root(),
        )
    }

    /// The header corresponding to this block.
    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body.canonical_root(),
        }
    }
}

/// A `BeaconBlock` with its body replaced by the body's root.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body_root: Hash256,
}

impl BeaconBlockHeader {
    pub fn canonical_root(&self) -> Hash256 {
        header_root(
            self.slot,
            self.proposer_index,
            self.parent_root,
            self.state_root,
            self.body_root,
        )
    }
}

fn header_root(
    slot: Slot,
    proposer_index: u64,
    parent_root: Hash256,
    state_root: Hash256,
    body_root: Hash256,
) -> Hash256 {
    let mut buf = Vec::with_capacity(112);
    buf.extend_from_slice(&slot.as_u64().to_le_bytes());
    buf.extend_from_slice(&proposer_index.to_le_bytes());
    buf.extend_from_slice(parent_root.as_bytes());
    buf.extend_from_slice(state_root.as_bytes());
    buf.extend_from_slice(body_root.as_bytes());
    Hash256::from_slice(&hash(&buf))
}

/// An opaque BLS signature. Verification is an external collaborator concern.
#[derive(Clone, Copy)]
pub struct Signature(pub [u8; 96]);

impl Signature {
    pub fn empty() -> Self {
        Signature([0; 96])
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::empty()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}…", hex_prefix(&self.0))
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(4)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// A `BeaconBlock` and the signature of its proposer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: Signature,
}

impl SignedBeaconBlock {
    pub fn from_block(message: BeaconBlock, signature: Signature) -> Self {
        Self { message, signature }
    }

    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    pub fn parent_root(&self) -> Hash256 {
        self.message.parent_root
    }

    pub fn state_root(&self) -> Hash256 {
        self.message.state_root
    }

    /// The identity of the inner block; the signature is not part of it.
    pub fn canonical_root(&self) -> Hash256 {
        self.message.canonical_root()
    }
}
