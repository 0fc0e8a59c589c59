//! Task Scheduler module
//!
//! Runs one task per simulated node, sequentially or on Rayon's thread pool.

pub mod local_scheduler;

pub use local_scheduler::*;
