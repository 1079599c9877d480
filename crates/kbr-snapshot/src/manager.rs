//! The SnapshotManager: backup/restore orchestration across services.

use std::collections::BTreeMap;
use std::sync::Arc;

use kbr_core::{
    Artifact, CoreError, CoreResult, Entity, Manifest, Plan, ServiceManifestEntry, SnapshotId,
    SnapshotSummary,
};
use kbr_reconcile::{diff_all, export_all, import_all, ImportReport};
use kbr_storage::StorageBackend;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scoped_dir::ScopedDir;
use crate::service::ServiceHandle;
use crate::state::SnapshotState;

/// Result of a completed backup.
///
/// `metadata_key`/`data` are mutually exclusive: a committed backup
/// (`archive_only = true`, the default) sets `metadata_key` and leaves
/// `data` empty; an `archive_only = false` call skips the commit entirely
/// and returns the raw per-service, per-kind artifacts in `data` instead.
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub snapshot_id: SnapshotId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_key: Option<String>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, BTreeMap<String, Artifact>>>,
}

/// Result of `restore`: either a dry-run plan per service, or applied
/// import reports per service.
#[derive(Debug)]
pub enum RestoreOutcome {
    Planned(BTreeMap<String, Plan>),
    Applied(BTreeMap<String, ImportReport>),
}

/// Orchestrates Exporter/Importer/Differ across configured services,
/// against a single storage bucket shared by every snapshot.
pub struct SnapshotManager {
    backend: Arc<dyn StorageBackend>,
    bucket: String,
    services: Vec<ServiceHandle>,
}

impl SnapshotManager {
    pub fn new(backend: Arc<dyn StorageBackend>, bucket: impl Into<String>, services: Vec<ServiceHandle>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            services,
        }
    }

    /// The configured services, in registration order. Used by callers that
    /// need direct access to a service's client/registry for ad-hoc,
    /// single-kind operations outside the backup/restore lifecycle (the
    /// HTTP adapter's `GET /backup/<service>/<kind>` and
    /// `POST /restore/<service>/<kind>`).
    pub fn services(&self) -> &[ServiceHandle] {
        &self.services
    }

    fn select(&self, selector: Option<&str>) -> CoreResult<Vec<&ServiceHandle>> {
        match selector {
            None => Ok(self.services.iter().collect()),
            Some(name) => {
                let found = self.services.iter().find(|s| s.name == name);
                found
                    .map(|s| vec![s])
                    .ok_or_else(|| CoreError::Config(format!("unknown service '{name}'")))
            }
        }
    }

    fn metadata_key(snapshot_id: &SnapshotId) -> String {
        format!("{snapshot_id}_metadata.json")
    }

    /// Runs Exporter across the selected services, writes per-kind
    /// artifacts and a manifest, uploads everything, and returns the
    /// result. The manifest is written last: no partial snapshot is ever
    /// externally visible.
    ///
    /// `archive_only = false` skips the write/upload/commit steps entirely
    /// and returns the exported artifacts directly in `BackupResult::data`,
    /// mirroring `original_source/backup_restore/core/backup.py`'s
    /// `archive_only` flag. `cancellation` is checked before each service's
    /// export begins; a cancellation mid-backup leaves no partial snapshot
    /// behind (the manifest-last ordering already guarantees this, and the
    /// scoped staging directory is removed on drop regardless of how this
    /// function returns).
    pub async fn backup(
        &self,
        service_selector: Option<&str>,
        description: Option<String>,
        compress: bool,
        archive_only: bool,
        cancellation: &CancellationToken,
    ) -> CoreResult<BackupResult> {
        let mut state = SnapshotState::Init;
        let snapshot_id = SnapshotId::generate();
        let selected = self.select(service_selector)?;

        let fail = |state: &mut SnapshotState, err: CoreError| -> CoreError {
            *state = SnapshotState::Failed;
            warn!(%snapshot_id, state = %*state, error = %err, "backup failed");
            err
        };

        state = SnapshotState::Selecting;
        let scoped = ScopedDir::new()?;

        state = SnapshotState::Exporting;
        let mut services_manifest = BTreeMap::new();
        let mut raw_artifacts = BTreeMap::new();
        let mut degraded = false;

        for svc in &selected {
            if cancellation.is_cancelled() {
                return Err(fail(&mut state, CoreError::Canceled));
            }

            let (artifacts, kind_degraded) = export_all(&svc.client, &svc.registry, cancellation)
                .await
                .map_err(|e| fail(&mut state, e))?;
            if kind_degraded {
                degraded = true;
                state = SnapshotState::Degraded;
            }

            if archive_only {
                let service_dir = scoped.path().join(&svc.name);
                std::fs::create_dir_all(&service_dir).map_err(|e| fail(&mut state, e.into()))?;

                let mut data = Vec::with_capacity(artifacts.len());
                for (kind, artifact) in &artifacts {
                    let bytes = serde_json::to_vec_pretty(artifact).map_err(|e| fail(&mut state, e.into()))?;
                    std::fs::write(service_dir.join(Artifact::key_for(kind)), bytes)
                        .map_err(|e| fail(&mut state, e.into()))?;
                    data.push(kind.clone());
                }

                services_manifest.insert(
                    svc.name.clone(),
                    ServiceManifestEntry {
                        service_type: svc.service_type.clone(),
                        version: svc.version.clone(),
                        priority: svc.priority,
                        data,
                    },
                );
            } else {
                raw_artifacts.insert(svc.name.clone(), artifacts);
            }
        }

        if !archive_only {
            info!(%snapshot_id, degraded, "backup completed without archiving (archive_only=false)");
            return Ok(BackupResult {
                snapshot_id,
                metadata_key: None,
                degraded,
                data: Some(raw_artifacts),
            });
        }

        state = SnapshotState::Writing;
        let manifest = Manifest::new(
            snapshot_id.clone(),
            description.unwrap_or_default(),
            services_manifest,
            degraded,
        );

        state = SnapshotState::Uploading;
        self.backend
            .upload_tree(&self.bucket, snapshot_id.as_str(), scoped.path(), compress)
            .await
            .map_err(|e| fail(&mut state, e))?;

        let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| fail(&mut state, e.into()))?;
        self.backend
            .put(&self.bucket, &manifest.metadata_key(), manifest_bytes)
            .await
            .map_err(|e| fail(&mut state, e))?;

        state = SnapshotState::Done;
        info!(%snapshot_id, %state, degraded, "backup complete");

        Ok(BackupResult {
            snapshot_id,
            metadata_key: Some(manifest.metadata_key()),
            degraded,
            data: None,
        })
    }

    /// Loads a snapshot's artifacts for the selected services and either
    /// returns a dry-run diff plan (`plan = true`) or applies the import
    /// (`plan = false`). `cancellation` is checked before each service is
    /// processed; an already-canceled token aborts before anything is
    /// downloaded or applied.
    pub async fn restore(
        &self,
        snapshot_id: &SnapshotId,
        service_selector: Option<&str>,
        plan: bool,
        cancellation: &CancellationToken,
    ) -> CoreResult<RestoreOutcome> {
        let manifest = self.info(snapshot_id).await?;
        let selected = self.select(service_selector)?;
        let scoped = ScopedDir::new()?;

        let mut planned = BTreeMap::new();
        let mut applied = BTreeMap::new();

        for svc in &selected {
            if cancellation.is_cancelled() {
                return Err(CoreError::Canceled);
            }

            let entry = manifest.services.get(&svc.name).ok_or_else(|| {
                CoreError::NotFound(format!("service '{}' not present in snapshot {snapshot_id}", svc.name))
            })?;

            let service_dir = scoped.path().join(&svc.name);
            self.backend
                .download_tree(&self.bucket, &format!("{snapshot_id}/{}", svc.name), &service_dir)
                .await?;

            let mut artifacts = BTreeMap::new();
            for kind in &entry.data {
                let bytes = std::fs::read(service_dir.join(Artifact::key_for(kind)))?;
                let artifact: Artifact = serde_json::from_slice(&bytes)?;
                artifacts.insert(kind.clone(), artifact);
            }

            if plan {
                let snapshot_entities: BTreeMap<String, Vec<Entity>> = artifacts
                    .iter()
                    .map(|(kind, artifact)| (kind.clone(), artifact.result.clone()))
                    .collect();
                let (live_artifacts, _degraded) = export_all(&svc.client, &svc.registry, cancellation).await?;
                let live_entities: BTreeMap<String, Vec<Entity>> = live_artifacts
                    .into_iter()
                    .map(|(kind, artifact)| (kind, artifact.result))
                    .collect();

                let kind_plan = diff_all(&svc.registry, &snapshot_entities, &live_entities)?;
                planned.insert(svc.name.clone(), kind_plan);
            } else {
                let report = import_all(&svc.client, &svc.registry, &artifacts, cancellation).await?;
                applied.insert(svc.name.clone(), report);
            }
        }

        if plan {
            Ok(RestoreOutcome::Planned(planned))
        } else {
            Ok(RestoreOutcome::Applied(applied))
        }
    }

    /// Lists every snapshot's manifest as a one-line summary.
    pub async fn list(&self) -> CoreResult<Vec<SnapshotSummary>> {
        let keys = self.backend.list(&self.bucket, "").await?;
        let mut summaries = Vec::new();
        for key in keys {
            if !key.ends_with("_metadata.json") {
                continue;
            }
            let bytes = self.backend.get(&self.bucket, &key).await?;
            let manifest: Manifest = serde_json::from_slice(&bytes)?;
            summaries.push(SnapshotSummary::from(&manifest));
        }
        Ok(summaries)
    }

    /// Reads one snapshot's manifest.
    pub async fn info(&self, snapshot_id: &SnapshotId) -> CoreResult<Manifest> {
        let bytes = self.backend.get(&self.bucket, &Self::metadata_key(snapshot_id)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Alias of `info`: both read the persisted manifest by id.
    pub async fn get(&self, snapshot_id: &SnapshotId) -> CoreResult<Manifest> {
        self.info(snapshot_id).await
    }
}
