//! `/backup/*` handlers: thin wrappers over `SnapshotManager::backup` and
//! the ad-hoc single-kind exporter.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use kbr_core::{Artifact, CoreError, Manifest, SnapshotId, SnapshotSummary};
use kbr_reconcile::export_one;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::RestError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BackupRequest {
    pub service_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub compress: bool,
    /// Kept for request-shape parity with the superseded standalone draft
    /// (`snapshot: bool` toggling manifest creation); this adapter always
    /// produces a full snapshot, so the field is accepted and ignored.
    pub snapshot: Option<bool>,
    /// When `false`, skips committing a persisted snapshot and returns the
    /// exported artifacts directly in the response's `data` field. Defaults
    /// to `true`, matching the backing manager's default.
    pub archive_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub message: String,
    pub snapshot_id: String,
    pub metadata_key: Option<String>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, BTreeMap<String, Artifact>>>,
}

pub async fn run_backup(
    State(state): State<AppState>,
    Json(req): Json<BackupRequest>,
) -> Result<(StatusCode, Json<BackupResponse>), RestError> {
    // No request-cancellation wiring exists at this adapter boundary yet, so
    // each call gets a token that is never canceled; the manager/client
    // layers still honor cancellation end to end for callers that do have
    // one (the CLI's ctrl-c handler).
    let cancellation = CancellationToken::new();
    let result = state
        .manager
        .backup(
            req.service_name.as_deref(),
            req.description,
            req.compress,
            req.archive_only.unwrap_or(true),
            &cancellation,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(BackupResponse {
            message: "backup completed".to_string(),
            snapshot_id: result.snapshot_id.to_string(),
            metadata_key: result.metadata_key,
            degraded: result.degraded,
            data: result.data,
        }),
    ))
}

pub async fn list_backups(State(state): State<AppState>) -> Result<Json<Vec<SnapshotSummary>>, RestError> {
    let summaries = state.manager.list().await?;
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub snapshot_id: String,
}

pub async fn backup_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<Manifest>, RestError> {
    let id = SnapshotId::from_str_unchecked(query.snapshot_id);
    let manifest = state.manager.info(&id).await?;
    Ok(Json(manifest))
}

pub async fn export_service_kind(
    State(state): State<AppState>,
    Path((service, kind)): Path<(String, String)>,
) -> Result<Json<kbr_core::Artifact>, RestError> {
    let service = state
        .manager
        .services()
        .iter()
        .find(|s| s.name == service)
        .ok_or_else(|| CoreError::NotFound(format!("service '{service}' not configured")))?;
    let descriptor = service
        .registry
        .get(&kind)
        .ok_or_else(|| CoreError::NotFound(format!("kind '{kind}' not registered")))?;

    let artifact = export_one(&service.client, descriptor, &CancellationToken::new()).await;
    Ok(Json(artifact))
}
