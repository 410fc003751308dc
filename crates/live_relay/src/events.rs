//! Wire events streamed to the client.

use serde::Serialize;

/// One vehicle's state at the current step, in network coordinates.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleSnapshot {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Heading in degrees, 0 pointing north, clockwise.
    pub angle: f64,
    pub vehicle_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    SimulationUpdate { vehicles: Vec<VehicleSnapshot> },
    SimulationEnd,
}
