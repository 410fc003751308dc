use std::sync::Arc;

use scenario_builder::audit::{spawn_audit_worker, SupabaseAuditSink};
use scenario_builder::config::BuilderConfig;
use scenario_builder::handlers::{router, AppState};
use scenario_builder::logging::{log_error, log_info};
use scenario_builder::storage::SupabaseStore;
use sumo_control::netgen::Netgenerate;

#[tokio::main]
async fn main() {
    let config = match BuilderConfig::from_env() {
        Ok(config) => config,
        Err(message) => {
            log_error("startup_failed", serde_json::json!({ "error": message }));
            std::process::exit(1);
        }
    };

    let (audit, _audit_worker) = spawn_audit_worker(SupabaseAuditSink::new(
        config.supabase_url.clone(),
        config.service_role_key.clone(),
    ));

    let state = AppState {
        grid_tool: Arc::new(Netgenerate),
        store: Arc::new(SupabaseStore::new(
            config.supabase_url.clone(),
            config.service_role_key.clone(),
        )),
        audit,
        output_dir: config.output_dir.clone(),
    };

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            log_error(
                "startup_failed",
                serde_json::json!({ "bind_addr": config.bind_addr, "error": error.to_string() }),
            );
            std::process::exit(1);
        }
    };

    log_info(
        "listening",
        serde_json::json!({ "bind_addr": config.bind_addr }),
    );

    if let Err(error) = axum::serve(listener, router(state)).await {
        log_error("server_exited", serde_json::json!({ "error": error.to_string() }));
        std::process::exit(1);
    }
}
