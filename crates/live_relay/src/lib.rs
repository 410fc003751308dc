//! Live Simulation Relay.
//!
//! Each client connection gets its own SUMO engine subprocess on an
//! OS-assigned control port. The relay steps the engine over TraCI, queries
//! every active vehicle, and streams paced snapshot frames back over the
//! socket until the engine expects no more vehicles, then tears everything
//! down whether the run finished or the client vanished.

pub mod config;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod registry;
pub mod session;
