pub use foghorn_metrics::*;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref BLOCK_IMPORTS: Result<IntCounter> = try_create_int_counter(
        "fork_choice_block_imports_total",
        "Count of blocks successfully imported by fork choice"
    );
    pub static ref REORGS: Result<IntCounter> = try_create_int_counter(
        "fork_choice_reorgs_total",
        "Count of head changes that were not descendant extensions"
    );
    pub static ref PROCESS_HEAD_RUNS: Result<IntCounter> = try_create_int_counter(
        "fork_choice_process_head_total",
        "Count of full head-selection runs"
    );
}
