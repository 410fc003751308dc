//! Scenario Builder service.
//!
//! Accepts a bounding-box request, drives the external grid-generation tool,
//! synthesizes route and detector files, assembles a SUMO run configuration,
//! and uploads it to the object store. The request boundary never fails hard:
//! every outcome is a soft `sucesso`/`erro` payload on HTTP 200.

pub mod audit;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod scenario;
pub mod storage;
