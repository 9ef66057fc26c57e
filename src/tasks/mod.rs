//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: purges expired entries from every category at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
