//! Periodic maintenance policies over the suspicion and block stores.

mod auto_block;
mod retention;

pub use auto_block::{auto_block_repeat_offenders, auto_block_repeat_offenders_at};
pub use retention::{sweep_resolved, sweep_resolved_at};
