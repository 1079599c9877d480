//! Snapshot identity and manifest types: the persisted format written
//! alongside each snapshot's artifacts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A snapshot's unique identifier: a random 128-bit value, hex-encoded.
///
/// Generated per-instance at construction time (never memoized at the type
/// or descriptor level — see DESIGN.md's note on the source's `uuid4()`
/// class-attribute bug).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Generates a fresh, random snapshot id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an existing hex string (e.g. read back from storage).
    pub fn from_str_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The hex-encoded id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The current manifest format version written by this crate.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Metadata for a single backed-up service within a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceManifestEntry {
    /// The service's display type, e.g. `"Serial"`.
    #[serde(rename = "type")]
    pub service_type: String,
    /// The service's schema version.
    pub version: String,
    /// Export/import ordering priority among services.
    pub priority: i32,
    /// Names of the Kinds with an artifact present for this service.
    pub data: Vec<String>,
}

/// The manifest written last during a backup (the commit point) and read
/// first during a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: String,
    pub snapshot_id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub services: BTreeMap<String, ServiceManifestEntry>,
    /// Set when any kind in any service recorded a per-kind export error.
    #[serde(default)]
    pub degraded: bool,
}

impl Manifest {
    /// Builds a new manifest for the given snapshot id and per-service data.
    pub fn new(
        snapshot_id: SnapshotId,
        description: impl Into<String>,
        services: BTreeMap<String, ServiceManifestEntry>,
        degraded: bool,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            snapshot_id,
            created_at: Utc::now(),
            description: description.into(),
            services,
            degraded,
        }
    }

    /// The storage key for this manifest: `<snapshot_id>_metadata.json`.
    pub fn metadata_key(&self) -> String {
        format!("{}_metadata.json", self.snapshot_id)
    }
}

/// The per-kind artifact shape: `{message, result, error?, status}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub message: String,
    pub result: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "default_status")]
    pub status: u16,
}

fn default_status() -> u16 {
    200
}

impl Artifact {
    /// A successful artifact carrying the exported entities.
    pub fn ok(message: impl Into<String>, result: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
        Self {
            message: message.into(),
            result,
            error: None,
            status: 200,
        }
    }

    /// A failed artifact: empty result, error and status recorded.
    pub fn failed(message: impl Into<String>, error: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            result: Vec::new(),
            error: Some(error.into()),
            status,
        }
    }

    /// The storage key for this artifact within a service: `<kind>.json`.
    pub fn key_for(kind: &str) -> String {
        format!("{kind}.json")
    }
}

/// A single-line summary of a snapshot, as returned by `list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub snapshot_id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub degraded: bool,
}

impl From<&Manifest> for SnapshotSummary {
    fn from(manifest: &Manifest) -> Self {
        Self {
            snapshot_id: manifest.snapshot_id.clone(),
            created_at: manifest.created_at,
            description: manifest.description.clone(),
            degraded: manifest.degraded,
        }
    }
}
