//! Integration layer for the SUMO traffic-simulation engine.
//!
//! This crate owns everything that touches the engine toolchain directly:
//! invoking the `netgenerate` network tool, launching `sumo` bound to a TraCI
//! control port, and a typed client for the TraCI wire protocol. Services
//! above this crate marshal inputs and relay outputs; they never speak the
//! wire format themselves.

pub mod engine;
pub mod error;
pub mod netgen;
pub mod traci;

pub use error::ControlError;
