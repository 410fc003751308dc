//! Environment-derived service configuration, resolved once at startup.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8001";
const DEFAULT_SCENARIO_CONFIG: &str = "sim_scenarios/unified_grid/unified.sumocfg";

const DEFAULT_STEP_INTERVAL_MS: u64 = 50;

/// How long a freshly launched engine gets to bind its control port.
pub const ENGINE_STARTUP_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// SUMO installation root; the engine binary lives under `bin/`.
    pub sumo_home: PathBuf,
    /// Run configuration every session launches with.
    pub scenario_config: PathBuf,
    pub bind_addr: String,
    /// Frame pacing between snapshot sends.
    pub step_interval: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, String> {
        let sumo_home = std::env::var("SUMO_HOME")
            .map(PathBuf::from)
            .map_err(|_| "SUMO_HOME must be configured".to_string())?;
        let scenario_config = std::env::var("SCENARIO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCENARIO_CONFIG));
        let bind_addr =
            std::env::var("RELAY_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let step_interval_ms = match std::env::var("RELAY_STEP_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| format!("RELAY_STEP_MS must be an integer, got {raw:?}"))?,
            Err(_) => DEFAULT_STEP_INTERVAL_MS,
        };

        Ok(Self {
            sumo_home,
            scenario_config,
            bind_addr,
            step_interval: Duration::from_millis(step_interval_ms),
        })
    }
}
