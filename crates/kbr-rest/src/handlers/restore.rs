//! `/restore/*` handlers: thin wrappers over `SnapshotManager::restore` and
//! the ad-hoc single-kind importer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use kbr_core::{CoreError, Entity, Plan, SnapshotId};
use kbr_reconcile::{import_one, ImportReport, KindImportReport};
use kbr_snapshot::RestoreOutcome;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::RestError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub snapshot_id: String,
    pub service_name: Option<String>,
    #[serde(default)]
    pub plan: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RestoreResponse {
    Planned { plans: std::collections::BTreeMap<String, Plan> },
    Applied { reports: std::collections::BTreeMap<String, ImportReport> },
}

pub async fn run_restore(
    State(state): State<AppState>,
    Json(req): Json<RestoreRequest>,
) -> Result<(StatusCode, Json<RestoreResponse>), RestError> {
    let id = SnapshotId::from_str_unchecked(req.snapshot_id);
    let outcome = state
        .manager
        .restore(&id, req.service_name.as_deref(), req.plan, &CancellationToken::new())
        .await?;

    let body = match outcome {
        RestoreOutcome::Planned(plans) => RestoreResponse::Planned { plans },
        RestoreOutcome::Applied(reports) => RestoreResponse::Applied { reports },
    };

    Ok((StatusCode::OK, Json(body)))
}

#[derive(Debug, Deserialize)]
pub struct ImportKindRequest {
    pub entities: Vec<Entity>,
}

pub async fn import_service_kind(
    State(state): State<AppState>,
    Path((service, kind)): Path<(String, String)>,
    Json(req): Json<ImportKindRequest>,
) -> Result<Json<KindImportReport>, RestError> {
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

    let report =
        import_one(&service.client, descriptor.endpoint_create, req.entities, &CancellationToken::new()).await;
    Ok(Json(report))
}
