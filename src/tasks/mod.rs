//! Background Tasks Module
//!
//! # Tasks
//! - Expiration Sweep: moves expired cache entries to the stale store at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
