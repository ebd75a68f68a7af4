use crate::block_tree::BlockTreeError;
use types::{BeaconStateError, Hash256, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A canonical historical block that must exist could not be found. This indicates store
    /// corruption; the caller must treat it as unrecoverable.
    MissingHistoricalBlock { slot: Slot },
    /// A staged block's parent is neither a hot block nor the finalized block.
    UnknownParent { block_root: Hash256, parent_root: Hash256 },
    /// The staged justified checkpoint does not point at a hot block.
    JustifiedBlockMissingFromHotSet(Hash256),
    /// A staged finalized block is not part of the hot tree.
    UnknownFinalizedBlock(Hash256),
    /// A hot block is missing its cached post-state.
    MissingHotState(Hash256),
    BlockTreeError(BlockTreeError),
    BeaconStateError(BeaconStateError),
}

impl From<BlockTreeError> for Error {
    fn from(e: BlockTreeError) -> Self {
        Error::BlockTreeError(e)
    }
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Self {
        Error::BeaconStateError(e)
    }
}
