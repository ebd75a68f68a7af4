//! The request/response vocabulary the consensus core exchanges with peers.
//!
//! Wire framing and SSZ encoding live in the transport layer; these are the decoded shapes the
//! core consumes.

use types::{Epoch, ForkDigest, Hash256, Slot};

/// The STATUS request/response handshake message.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusMessage {
    /// The fork version of the chain we are broadcasting.
    pub fork_digest: ForkDigest,

    /// Latest finalized root.
    pub finalized_root: Hash256,

    /// Latest finalized epoch.
    pub finalized_epoch: Epoch,

    /// The latest block root.
    pub head_root: Hash256,

    /// The slot associated with the latest block root.
    pub head_slot: Slot,
}

/// The reason given for a `Goodbye` message.
///
/// Note: any unknown `u64::into(n)` will resolve to `GoodbyeReason::Unknown` for any unknown
/// `n`, however `GoodbyeReason::Unknown.into()` will go into `0_u64`. Therefore de-serializing
/// then re-serializing may not return the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodbyeReason {
    /// This node has shutdown.
    ClientShutdown = 1,

    /// Incompatible networks.
    IrrelevantNetwork = 2,

    /// Error/fault in the RPC.
    Fault = 3,

    /// Unable to verify the peer's chain, e.g. a lookup timed out.
    UnableToVerifyNetwork = 128,

    /// The node has too many connected peers.
    TooManyPeers = 129,

    /// Unknown reason.
    Unknown = 0,
}

impl From<u64> for GoodbyeReason {
    fn from(id: u64) -> GoodbyeReason {
        match id {
            1 => GoodbyeReason::ClientShutdown,
            2 => GoodbyeReason::IrrelevantNetwork,
            3 => GoodbyeReason::Fault,
            128 => GoodbyeReason::UnableToVerifyNetwork,
            129 => GoodbyeReason::TooManyPeers,
            _ => GoodbyeReason::Unknown,
        }
    }
}

impl From<GoodbyeReason> for u64 {
    fn from(reason: GoodbyeReason) -> u64 {
        reason as u64
    }
}

impl std::fmt::Display for GoodbyeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            GoodbyeReason::ClientShutdown => write!(f, "Client Shutdown"),
            GoodbyeReason::IrrelevantNetwork => write!(f, "Irrelevant Network"),
            GoodbyeReason::Fault => write!(f, "Fault"),
            GoodbyeReason::UnableToVerifyNetwork => write!(f, "Unable to Verify Network"),
            GoodbyeReason::TooManyPeers => write!(f, "Too Many Peers"),
            GoodbyeReason::Unknown => write!(f, "Unknown Reason"),
        }
    }
}

/// A failed request to a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The peer answered with the defined "no block" response.
    NoBlockReturned,
    /// The peer answered with an error response.
    RemoteError(String),
    /// The connection dropped mid-request.
    Disconnected,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RpcError::NoBlockReturned => write!(f, "no block returned"),
            RpcError::RemoteError(msg) => write!(f, "remote error: {}", msg),
            RpcError::Disconnected => write!(f, "disconnected"),
        }
    }
}
