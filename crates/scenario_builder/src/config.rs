//! Environment-derived service configuration, resolved once at startup.

use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_OUTPUT_DIR: &str = "sim_scenarios";

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Base URL of the Supabase project hosting storage and the log table.
    pub supabase_url: String,
    /// Privileged key for storage upserts and log-table inserts.
    pub service_role_key: String,
    pub bind_addr: String,
    /// Root directory for generated scenario artifacts.
    pub output_dir: PathBuf,
}

impl BuilderConfig {
    pub fn from_env() -> Result<Self, String> {
        let supabase_url = std::env::var("NEXT_PUBLIC_SUPABASE_URL")
            .map_err(|_| "NEXT_PUBLIC_SUPABASE_URL must be configured".to_string())?;
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| "SUPABASE_SERVICE_ROLE_KEY must be configured".to_string())?;
        let bind_addr =
            std::env::var("BUILDER_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let output_dir = std::env::var("SCENARIO_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Self {
            supabase_url,
            service_role_key,
            bind_addr,
            output_dir,
        })
    }
}
