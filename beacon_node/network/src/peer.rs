use crate::rpc::{GoodbyeReason, RpcError};
use futures::future::BoxFuture;
use types::{SignedBeaconBlock, Slot};

/// Transport-level identity of a connected peer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 32]);

impl PeerId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for byte in self.0.iter().take(8) {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PeerId({})", self)
    }
}

/// The operations the consensus core needs from a connected peer.
///
/// The transport layer implements this over its RPC machinery; futures are boxed at this seam
/// so the core stays independent of the transport's concrete types. Dropping a returned future
/// cancels the request without affecting the connection.
pub trait Eth2Peer: Send + Sync {
    fn peer_id(&self) -> PeerId;

    /// Request the peer's canonical block at exactly `slot`.
    fn request_block_by_slot(
        &self,
        slot: Slot,
    ) -> BoxFuture<'static, Result<SignedBeaconBlock, RpcError>>;

    /// Send a Goodbye carrying `reason` and close the connection.
    fn disconnect_cleanly(&self, reason: GoodbyeReason);
}
