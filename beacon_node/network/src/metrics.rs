pub use foghorn_metrics::*;
use lazy_static::lazy_static;

pub const VALIDATION_STARTED: &str = "started";
pub const VALIDATION_VALID: &str = "valid";
pub const VALIDATION_INVALID: &str = "invalid";
pub const VALIDATION_ERROR: &str = "error";

lazy_static! {
    pub static ref PEER_CHAIN_VALIDATION_ATTEMPTS: Result<IntCounterVec> =
        try_create_int_counter_vec(
            "peer_chain_validation_attempts",
            "Number of peers chain verification has been performed on",
            &["status"]
        );
}
