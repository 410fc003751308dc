use live_relay::config::RelayConfig;
use live_relay::handlers::{router, RelayState};
use live_relay::logging::{log_error, log_info};
use live_relay::registry::SessionRegistry;

#[tokio::main]
async fn main() {
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(message) => {
            log_error("startup_failed", serde_json::json!({ "error": message }));
            std::process::exit(1);
        }
    };

    let state = RelayState {
        registry: SessionRegistry::default(),
        config,
    };

    let listener = match tokio::net::TcpListener::bind(&state.config.bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            log_error(
                "startup_failed",
                serde_json::json!({
                    "bind_addr": state.config.bind_addr,
                    "error": error.to_string(),
                }),
            );
            std::process::exit(1);
        }
    };

    log_info(
        "listening",
        serde_json::json!({
            "bind_addr": state.config.bind_addr,
            "scenario_config": state.config.scenario_config.display().to_string(),
        }),
    );

    if let Err(error) = axum::serve(listener, router(state)).await {
        log_error("server_exited", serde_json::json!({ "error": error.to_string() }));
        std::process::exit(1);
    }
}
