//! Error taxonomy shared by every layer of the backup/restore tool.
//!
//! Each variant corresponds to one of the error kinds named in the
//! propagation policy: per-item errors stay isolated to the item, per-kind
//! errors isolate the kind (and mark dependents skipped), per-service errors
//! isolate the service, and backend errors at commit time fail the whole
//! operation. Nothing here is swallowed silently — callers that can't
//! classify an error wrap it as `Transport` or `Internal`.

use thiserror::Error;

/// The primary error type returned by core, storage, client, reconciliation
/// and snapshot operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid or missing configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error talking to the identity provider or a storage backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// 403 from the identity provider.
    #[error(
        "permission denied for realm '{realm}': the configured client may lack the required service-account roles ({detail})"
    )]
    PermissionDenied { realm: String, detail: String },

    /// A snapshot, manifest, or storage object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A non-2xx HTTP response not otherwise classified (not 403, not a
    /// connection-level failure). Carries the status code so callers such
    /// as the Importer can apply their own per-status policy (409 →
    /// `AlreadyExists`, other 4xx → `InvalidEntity`, 5xx → abort the kind).
    #[error("remote rejected request with status {status}: {message}")]
    RemoteRejected { status: u16, message: String },

    /// The dependency planner found a cycle among the given kinds.
    #[error("cyclic dependency among kinds: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    /// A single entity failed decode/validation.
    #[error("invalid entity of kind '{kind}': {message}")]
    InvalidEntity { kind: String, message: String },

    /// 409 on import; treated as soft/non-fatal by callers.
    #[error("entity already exists: {0}")]
    AlreadyExists(String),

    /// Operation completed, but with isolated per-kind failures.
    #[error("operation degraded: {0}")]
    Degraded(String),

    /// Cancellation was requested and honored.
    #[error("operation canceled")]
    Canceled,

    /// Any error the core cannot classify more specifically.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization error: {err}"))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Internal(format!("io error: {err}"))
    }
}

/// Result type alias used throughout the workspace.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_lists_all_kinds() {
        let err = CoreError::CyclicDependency(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "cyclic dependency among kinds: a, b");
    }

    #[test]
    fn permission_denied_names_realm() {
        let err = CoreError::PermissionDenied {
            realm: "acme".into(),
            detail: "missing manage-realm role".into(),
        };
        assert!(err.to_string().contains("realm 'acme'"));
    }
}
