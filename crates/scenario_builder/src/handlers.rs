//! Request boundary and the scenario generation pipeline behind it.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use sumo_control::netgen::GridTool;

use crate::audit::{AuditLevel, AuditLog};
use crate::logging::{log_error, log_info};
use crate::scenario::{self, BoundingBox, ScenarioPaths};
use crate::storage::{self, ScenarioStore};

/// Soft outcome payload; the HTTP status is 200 either way so the frontend
/// only ever branches on `status`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateResponse {
    pub status: String,
    pub message: String,
}

impl GenerateResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "sucesso".to_string(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "erro".to_string(),
            message: message.into(),
        }
    }
}

/// A pipeline stage failure, carrying the audit severity it deserves.
/// Tool rejections are `Error`; local I/O and upload failures are
/// `Critical` because they point at the host, not the request.
#[derive(Debug)]
pub struct PipelineFailure {
    pub level: AuditLevel,
    pub message: String,
}

impl PipelineFailure {
    fn tool(message: String) -> Self {
        Self {
            level: AuditLevel::Error,
            message,
        }
    }

    fn host(message: String) -> Self {
        Self {
            level: AuditLevel::Critical,
            message,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub grid_tool: Arc<dyn GridTool + Send + Sync>,
    pub store: Arc<dyn ScenarioStore + Send + Sync>,
    pub audit: AuditLog,
    pub output_dir: std::path::PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/generate-grid", post(generate_grid))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "scenario_builder" }))
}

async fn generate_grid(
    State(state): State<AppState>,
    Json(bbox): Json<BoundingBox>,
) -> Json<GenerateResponse> {
    log_info(
        "generate_grid_requested",
        serde_json::json!({
            "west": bbox.west, "south": bbox.south,
            "east": bbox.east, "north": bbox.north,
        }),
    );
    state
        .audit
        .record(AuditLevel::Info, "Grid generation requested");

    let outcome = tokio::task::block_in_place(|| {
        build_and_publish_scenario(
            state.grid_tool.as_ref(),
            state.store.as_ref(),
            &state.audit,
            &state.output_dir,
            &bbox,
        )
    });

    match outcome {
        Ok(()) => {
            state.audit.record(
                AuditLevel::Success,
                "Grid scenario generated and uploaded",
            );
            Json(GenerateResponse::success(
                "Grid scenario generated and uploaded",
            ))
        }
        Err(failure) => {
            log_error(
                "generate_grid_failed",
                serde_json::json!({ "error": failure.message }),
            );
            state.audit.record(failure.level, failure.message.clone());
            Json(GenerateResponse::failure(failure.message))
        }
    }
}

/// The full pipeline: network generation, artifact synthesis, upload.
///
/// Stops at the first failure; artifacts written before that point are left
/// on disk for inspection.
pub fn build_and_publish_scenario(
    grid_tool: &dyn GridTool,
    store: &dyn ScenarioStore,
    audit: &AuditLog,
    output_dir: &std::path::Path,
    bbox: &BoundingBox,
) -> Result<(), PipelineFailure> {
    let paths = ScenarioPaths::under(output_dir);
    std::fs::create_dir_all(&paths.dir)
        .map_err(|e| PipelineFailure::host(format!("creating {}: {e}", paths.dir.display())))?;

    let spec = scenario::grid_spec_for(bbox);
    grid_tool
        .generate(&spec, &paths.network)
        .map_err(PipelineFailure::tool)?;
    audit.record(AuditLevel::Info, "Grid network generated");
    log_info(
        "network_generated",
        serde_json::json!({
            "path": paths.network.display().to_string(),
            "block_length_m": spec.block_length_m,
        }),
    );

    let mut rng = rand::thread_rng();
    write_artifact(&paths.routes, scenario::route_document(&mut rng))?;
    write_artifact(&paths.additional, scenario::additional_document())?;
    write_artifact(&paths.run_config, scenario::run_config_document())?;

    storage::upload_from_disk(store, &paths.run_config).map_err(PipelineFailure::host)
}

fn write_artifact(path: &std::path::Path, contents: String) -> Result<(), PipelineFailure> {
    std::fs::write(path, contents)
        .map_err(|e| PipelineFailure::host(format!("writing {}: {e}", path.display())))
}
