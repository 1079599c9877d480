//! A configured backup/restore target: one identity-provider realm plus
//! the kind registry it reconciles against.

use std::sync::Arc;

use kbr_client::ApiClient;
use kbr_core::SchemaRegistry;

/// One named service the Orchestrator can back up or restore.
#[derive(Clone)]
pub struct ServiceHandle {
    pub name: String,
    /// Display type recorded in the manifest, e.g. `"Serial"`.
    pub service_type: String,
    pub version: String,
    pub priority: i32,
    pub client: Arc<ApiClient>,
    pub registry: Arc<SchemaRegistry>,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("service_type", &self.service_type)
            .field("version", &self.version)
            .field("priority", &self.priority)
            .finish()
    }
}
