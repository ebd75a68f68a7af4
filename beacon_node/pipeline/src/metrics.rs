pub use foghorn_metrics::*;
use lazy_static::lazy_static;

pub const DUTY_PRODUCED: &str = "produced";
pub const DUTY_MISSED: &str = "missed";

lazy_static! {
    pub static ref EVENTS_DROPPED: Result<IntCounter> = try_create_int_counter(
        "pipeline_events_dropped_total",
        "Count of events dropped due to actor queue overflow"
    );
    pub static ref ATTESTATION_DUTIES: Result<IntCounterVec> = try_create_int_counter_vec(
        "pipeline_attestation_duties_total",
        "Attestation duty outcomes per slot",
        &["result"]
    );
}
