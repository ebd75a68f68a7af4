//! Peer-facing consensus logic: the status handshake vocabulary and the peer chain validator.

mod metrics;
mod peer;
mod peer_chain_validator;
mod rpc;
mod status;

pub use peer::{Eth2Peer, PeerId};
pub use peer_chain_validator::PeerChainValidator;
pub use rpc::{GoodbyeReason, RpcError, StatusMessage};
pub use status::ToStatusMessage;
