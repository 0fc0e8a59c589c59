//! Common utilities and abstractions for the rddviz project.
//!
//! This module provides the shared error type and the simulation
//! configuration layer used by the engine crate.

pub mod config;
pub mod error;

pub use config::{SimulationConfig, SimulationConfigBuilder};
pub use error::{CommonError, Result};
