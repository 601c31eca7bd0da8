use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::context::{ReloadStatsSnapshot, ServerContext};
use crate::http::response::error_response;
use crate::reload::coordinator;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub generation: u64,
    pub mounted: usize,
    pub reloads: ReloadStatsSnapshot,
}

#[derive(Serialize)]
pub struct MountStatus {
    pub name: String,
    pub path: String,
    pub kind: &'static str,
}

pub async fn get_status(State(ctx): State<Arc<ServerContext>>) -> Json<SystemStatus> {
    let table = ctx.mounts().snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        generation: table.generation(),
        mounted: table.len(),
        reloads: ctx.stats().snapshot(),
    })
}

pub async fn get_mounts(State(ctx): State<Arc<ServerContext>>) -> Json<Vec<MountStatus>> {
    let table = ctx.mounts().snapshot();
    let mounts = table
        .iter()
        .map(|entry| MountStatus {
            name: entry.name.clone(),
            path: ctx.prefix().mount_path(&entry.name),
            kind: entry.spec.kind(),
        })
        .collect();
    Json(mounts)
}

/// Reload from the config file immediately, bypassing the watcher.
pub async fn post_reload(State(ctx): State<Arc<ServerContext>>) -> Response {
    let Some(path) = ctx.config_path().map(|p| p.to_path_buf()) else {
        return error_response(StatusCode::CONFLICT, "No config file configured");
    };

    tracing::info!(path = ?path, "Reload requested via admin API");
    match coordinator::reload_from_path(&ctx, &path).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}
