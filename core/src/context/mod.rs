//! Context module for rddviz
//!
//! This module provides the session that drives a dataset stage by stage.

pub mod session;

pub use session::*;
