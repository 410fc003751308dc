//! HTTP surface and per-connection session orchestration.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};

use sumo_control::engine::{allocate_control_port, engine_binary, EngineLaunch, EngineProcess};
use sumo_control::traci::TraciClient;
use sumo_control::ControlError;

use crate::config::{RelayConfig, ENGINE_STARTUP_WINDOW};
use crate::events::ServerEvent;
use crate::logging::{log_error, log_info};
use crate::registry::{SessionInfo, SessionRegistry};
use crate::session::{run_session, EventSink};

#[derive(Clone)]
pub struct RelayState {
    pub config: RelayConfig,
    pub registry: SessionRegistry,
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/sessions", get(sessions))
        .route("/ws", get(live))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "live_relay" }))
}

async fn sessions(State(state): State<RelayState>) -> Json<Vec<SessionInfo>> {
    Json(state.registry.snapshot())
}

async fn live(State(state): State<RelayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| drive_session(state, socket))
}

/// Sends each event as one JSON text frame.
struct WebSocketSink {
    socket: WebSocket,
}

impl EventSink for WebSocketSink {
    async fn send_event(&mut self, event: &ServerEvent) -> Result<(), String> {
        let frame = serde_json::to_string(event).map_err(|e| e.to_string())?;
        self.socket
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| e.to_string())
    }
}

/// One client connection, start to finish.
///
/// Launch failures tear down whatever was started and close the socket
/// without a run; the relay itself stays up. Once the loop runs, cleanup
/// happens on every exit path: close handshake, engine kill, deregister.
async fn drive_session(state: RelayState, socket: WebSocket) {
    let (mut engine_process, mut client, launch) =
        match start_engine(&state.config).await {
            Ok(started) => started,
            Err(error) => {
                log_error(
                    "session_start_failed",
                    serde_json::json!({ "error": error.to_string() }),
                );
                return;
            }
        };

    let session_id = state.registry.register(launch.control_port);
    log_info(
        "session_started",
        serde_json::json!({
            "session_id": session_id.to_string(),
            "control_port": launch.control_port,
            "api_version": client.api_version(),
        }),
    );

    let mut sink = WebSocketSink { socket };
    let outcome = run_session(&mut client, &mut sink, state.config.step_interval).await;

    if let Err(error) = client.close().await {
        log_error(
            "traci_close_failed",
            serde_json::json!({
                "session_id": session_id.to_string(),
                "error": error.to_string(),
            }),
        );
    }
    // After a clean close the engine is already gone; the kill is for the
    // paths where it is not.
    let _ = engine_process.terminate().await;
    state.registry.deregister(&session_id);

    match outcome {
        Ok(summary) => log_info(
            "session_ended",
            serde_json::json!({
                "session_id": session_id.to_string(),
                "steps": summary.steps,
                "client_lost": summary.client_lost,
            }),
        ),
        Err(error) => log_error(
            "session_failed",
            serde_json::json!({
                "session_id": session_id.to_string(),
                "error": error.to_string(),
            }),
        ),
    }
}

async fn start_engine(
    config: &RelayConfig,
) -> Result<(EngineProcess, TraciClient, EngineLaunch), ControlError> {
    let launch = EngineLaunch {
        binary: engine_binary(&config.sumo_home),
        config: config.scenario_config.clone(),
        control_port: allocate_control_port()?,
    };

    let mut process = EngineProcess::launch(&launch)?;
    match TraciClient::connect(launch.control_addr(), ENGINE_STARTUP_WINDOW).await {
        Ok(client) => Ok((process, client, launch)),
        Err(error) => {
            let _ = process.terminate().await;
            Err(error)
        }
    }
}
