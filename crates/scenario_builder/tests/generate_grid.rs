//! End-to-end pipeline test over the public API, with the external tool and
//! object store replaced by in-process fakes.

use std::path::Path;
use std::sync::Mutex;

use scenario_builder::audit::AuditLog;
use scenario_builder::handlers::build_and_publish_scenario;
use scenario_builder::scenario::{
    BoundingBox, ScenarioPaths, SIMULATION_DURATION_S, VEHICLE_COUNT,
};
use scenario_builder::storage::{ScenarioStore, RUN_CONFIG_OBJECT_KEY};
use sumo_control::netgen::{GridSpec, GridTool};

struct StubNetwork {
    /// Specs the fake saw, so the test can assert the bbox reached the tool.
    specs: Mutex<Vec<GridSpec>>,
}

impl GridTool for StubNetwork {
    fn generate(&self, spec: &GridSpec, output: &Path) -> Result<(), String> {
        self.specs
            .lock()
            .expect("specs lock poisoned")
            .push(spec.clone());
        std::fs::write(output, "<net version=\"1.16\"/>").map_err(|e| e.to_string())
    }
}

#[derive(Default)]
struct CapturingStore {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ScenarioStore for CapturingStore {
    fn upload_run_config(&self, key: &str, body: Vec<u8>) -> Result<(), String> {
        self.uploads
            .lock()
            .expect("uploads lock poisoned")
            .push((key.to_string(), body));
        Ok(())
    }
}

#[test]
fn full_pipeline_produces_consistent_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tool = StubNetwork {
        specs: Mutex::new(Vec::new()),
    };
    let store = CapturingStore::default();
    let bbox = BoundingBox {
        west: -46.66,
        south: -23.56,
        east: -46.64,
        north: -23.54,
    };

    let (audit, mut audit_rx) = AuditLog::channel();
    build_and_publish_scenario(&tool, &store, &audit, dir.path(), &bbox)
        .expect("pipeline should succeed");

    let entry = audit_rx.try_recv().expect("generation audit entry");
    assert_eq!(entry.modulo, "SUMO_API_GRID");

    let paths = ScenarioPaths::under(dir.path());

    let routes = std::fs::read_to_string(&paths.routes).expect("routes file");
    assert_eq!(routes.matches("<trip ").count(), VEHICLE_COUNT);
    assert!(routes.contains("<vType id=\"car\""));
    assert!(routes.contains("<vType id=\"priority_car\""));
    for line in routes.lines().filter(|line| line.starts_with("<trip ")) {
        let depart: u32 = line
            .split("depart=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .and_then(|raw| raw.parse().ok())
            .expect("numeric departure");
        assert!(depart < SIMULATION_DURATION_S);
    }

    let additional = std::fs::read_to_string(&paths.additional).expect("additional file");
    assert_eq!(additional.matches("<e1Detector ").count(), 2);

    let run_config = std::fs::read_to_string(&paths.run_config).expect("run config file");
    assert!(run_config.contains("grid.net.xml"));
    assert!(run_config.contains("grid.rou.xml"));
    assert!(run_config.contains("grid.add.xml"));

    let specs = tool.specs.lock().expect("specs lock poisoned");
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].x_blocks, 3);
    assert_eq!(specs[0].y_blocks, 3);
    assert!(specs[0].guess_traffic_lights);

    let uploads = store.uploads.lock().expect("uploads lock poisoned");
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, RUN_CONFIG_OBJECT_KEY);
    assert_eq!(uploads[0].1, run_config.as_bytes());
}
