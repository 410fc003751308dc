//! Scenario constants and artifact synthesis.
//!
//! The scenario itself is fixed: a 3×3 block grid, 300 vehicles departing
//! uniformly over one simulated hour on a single origin/destination pair, and
//! one detector pair on the `J2` intersection's incoming lanes. The bounding
//! box from the request scales the grid's block length so the generated
//! network spans roughly the requested extent.

use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use sumo_control::netgen::GridSpec;

pub const GRID_X: u32 = 3;
pub const GRID_Y: u32 = 3;
pub const VEHICLE_COUNT: usize = 300;
/// Simulation horizon in seconds; departures are sampled from [0, horizon).
pub const SIMULATION_DURATION_S: u32 = 3600;

pub const SCENARIO_DIR_NAME: &str = "unified_grid";
pub const NETWORK_FILE_NAME: &str = "grid.net.xml";
pub const ROUTE_FILE_NAME: &str = "grid.rou.xml";
pub const ADDITIONAL_FILE_NAME: &str = "grid.add.xml";
pub const RUN_CONFIG_FILE_NAME: &str = "unified.sumocfg";

/// Every trip runs the same fixed pair: first edge to the edge past the grid.
const TRIP_FROM_EDGE: &str = "E0";
const DETECTOR_JUNCTION: &str = "J2";

/// Grid block length bounds in meters; netgenerate defaults to 100 m.
const MIN_BLOCK_LENGTH_M: f64 = 50.0;
const MAX_BLOCK_LENGTH_M: f64 = 500.0;

const METERS_PER_DEGREE_LAT: f64 = 110_540.0;
const METERS_PER_DEGREE_LNG_AT_EQUATOR: f64 = 111_320.0;

/// Geographic extent requested by the client (west, south, east, north).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Approximate extent in meters along each axis.
    fn extent_m(&self) -> (f64, f64) {
        let mid_lat = ((self.south + self.north) / 2.0).to_radians();
        let width_m =
            (self.east - self.west).abs() * METERS_PER_DEGREE_LNG_AT_EQUATOR * mid_lat.cos();
        let height_m = (self.north - self.south).abs() * METERS_PER_DEGREE_LAT;
        (width_m, height_m)
    }
}

/// Derive the grid spec for a requested extent.
///
/// The block length is the mean bbox extent divided by the block count,
/// clamped so degenerate or continent-sized boxes still produce a usable
/// network.
pub fn grid_spec_for(bbox: &BoundingBox) -> GridSpec {
    let (width_m, height_m) = bbox.extent_m();
    let mean_extent_m = (width_m + height_m) / 2.0;
    let blocks = GRID_X.max(GRID_Y) as f64;
    let block_length_m = (mean_extent_m / blocks).clamp(MIN_BLOCK_LENGTH_M, MAX_BLOCK_LENGTH_M);

    GridSpec {
        x_blocks: GRID_X,
        y_blocks: GRID_Y,
        block_length_m,
        guess_traffic_lights: true,
    }
}

/// On-disk locations of one scenario's artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPaths {
    pub dir: PathBuf,
    pub network: PathBuf,
    pub routes: PathBuf,
    pub additional: PathBuf,
    pub run_config: PathBuf,
}

impl ScenarioPaths {
    pub fn under(output_dir: &Path) -> Self {
        let dir = output_dir.join(SCENARIO_DIR_NAME);
        Self {
            network: dir.join(NETWORK_FILE_NAME),
            routes: dir.join(ROUTE_FILE_NAME),
            additional: dir.join(ADDITIONAL_FILE_NAME),
            run_config: dir.join(RUN_CONFIG_FILE_NAME),
            dir,
        }
    }
}

/// The destination edge sits one past the grid's edge count.
fn trip_to_edge() -> String {
    format!("E{}", GRID_X * GRID_Y)
}

/// Route document: two vehicle type profiles plus one trip per vehicle with a
/// uniformly random departure over the horizon.
pub fn route_document(rng: &mut impl Rng) -> String {
    let mut doc = String::with_capacity(VEHICLE_COUNT * 80);
    doc.push_str("<routes>\n");
    doc.push_str(
        "<vType id=\"car\" accel=\"2.0\" decel=\"4.5\" sigma=\"0.5\" length=\"5\" maxSpeed=\"70\" color=\"1,1,0\"/>\n",
    );
    doc.push_str(
        "<vType id=\"priority_car\" accel=\"3.5\" decel=\"6.0\" sigma=\"0.8\" length=\"5\" maxSpeed=\"100\" color=\"1,0,0\"/>\n",
    );

    let to_edge = trip_to_edge();
    for index in 0..VEHICLE_COUNT {
        let depart = rng.gen_range(0..SIMULATION_DURATION_S);
        doc.push_str(&format!(
            "<trip id=\"veh{index}\" type=\"car\" depart=\"{depart}\" from=\"{TRIP_FROM_EDGE}\" to=\"{to_edge}\" />\n"
        ));
    }

    doc.push_str("</routes>");
    doc
}

/// Additional-features document: one induction-loop detector per incoming
/// lane of the hardcoded intersection.
pub fn additional_document() -> String {
    let mut doc = String::new();
    doc.push_str("<additional>\n");
    for lane_index in 0..2 {
        doc.push_str(&format!(
            "<e1Detector id=\"det_{DETECTOR_JUNCTION}_in_{lane_index}\" lane=\"E1_{lane_index}\" pos=\"-5\" freq=\"1\" file=\"detectors.xml\"/>\n"
        ));
    }
    doc.push_str("</additional>");
    doc
}

/// Run-configuration document cross-referencing the three artifacts by name.
pub fn run_config_document() -> String {
    format!(
        "<configuration>\n  <input>\n    <net-file value=\"{NETWORK_FILE_NAME}\"/>\n    <route-files value=\"{ROUTE_FILE_NAME}\"/>\n    <additional-files value=\"{ADDITIONAL_FILE_NAME}\"/>\n  </input>\n  <time>\n    <begin value=\"0\"/>\n    <end value=\"{SIMULATION_DURATION_S}\"/>\n  </time>\n</configuration>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn route_document_has_one_trip_per_vehicle() {
        let mut rng = StdRng::seed_from_u64(7);
        let doc = route_document(&mut rng);

        assert_eq!(doc.matches("<trip ").count(), VEHICLE_COUNT);
        assert_eq!(doc.matches("<vType ").count(), 2);
        assert!(doc.contains("id=\"veh0\""));
        assert!(doc.contains(&format!("id=\"veh{}\"", VEHICLE_COUNT - 1)));
        assert!(doc.contains("to=\"E9\""));
    }

    #[test]
    fn departures_stay_inside_the_horizon() {
        let mut rng = StdRng::seed_from_u64(11);
        let doc = route_document(&mut rng);

        for line in doc.lines().filter(|line| line.starts_with("<trip ")) {
            let depart = line
                .split("depart=\"")
                .nth(1)
                .and_then(|rest| rest.split('"').next())
                .and_then(|raw| raw.parse::<u32>().ok())
                .expect("trip line should carry a numeric departure");
            assert!(depart < SIMULATION_DURATION_S);
        }
    }

    #[test]
    fn additional_document_declares_exactly_two_detectors() {
        let doc = additional_document();

        assert_eq!(doc.matches("<e1Detector ").count(), 2);
        assert!(doc.contains("lane=\"E1_0\""));
        assert!(doc.contains("lane=\"E1_1\""));
    }

    #[test]
    fn run_config_references_all_three_artifacts() {
        let doc = run_config_document();

        assert!(doc.contains(NETWORK_FILE_NAME));
        assert!(doc.contains(ROUTE_FILE_NAME));
        assert!(doc.contains(ADDITIONAL_FILE_NAME));
        assert!(doc.contains("<end value=\"3600\"/>"));
    }

    #[test]
    fn grid_spec_scales_block_length_with_the_bbox() {
        let small = grid_spec_for(&BoundingBox {
            west: -46.660,
            south: -23.560,
            east: -46.659,
            north: -23.559,
        });
        let large = grid_spec_for(&BoundingBox {
            west: -46.8,
            south: -23.7,
            east: -46.4,
            north: -23.3,
        });

        assert_eq!(small.x_blocks, GRID_X);
        assert_eq!(small.y_blocks, GRID_Y);
        assert!(small.block_length_m >= MIN_BLOCK_LENGTH_M);
        assert!(small.block_length_m < large.block_length_m);
        assert!(large.block_length_m <= MAX_BLOCK_LENGTH_M);
    }

    #[test]
    fn degenerate_bbox_clamps_to_minimum_block_length() {
        let spec = grid_spec_for(&BoundingBox {
            west: 10.0,
            south: 50.0,
            east: 10.0,
            north: 50.0,
        });
        assert_eq!(spec.block_length_m, MIN_BLOCK_LENGTH_M);
    }
}
