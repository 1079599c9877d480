//! Config loader: `services.yaml` (precedence) or one `<service>.json` per
//! service. `serde_yaml` parses the combined file, `serde_json` parses
//! per-service files, and `services.yaml` always wins when both exist.

use std::collections::BTreeMap;
use std::path::Path;

use kbr_client::AuthConfig;
use kbr_core::{CoreError, CoreResult};
use serde::Deserialize;

/// One entry under the `storage` top-level key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Local { local: LocalStorageConfig },
    S3 { s3: S3StorageConfig },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    pub base_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageConfig {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub region: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_bucket() -> String {
    "backups".to_string()
}

/// One entry under a service's top-level key (e.g. `keycloak`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub auth: AuthConfig,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub priority: i32,
}

fn default_service_type() -> String {
    "Serial".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

/// The fully loaded, not-yet-env-overridden configuration tree: one
/// `storage` entry plus any number of named services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigTree {
    pub storage: Option<StorageConfig>,
    #[serde(flatten)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Loads `services.yaml` if present in `dir`, else merges every
/// `<service>.json` file found directly in `dir`. `services.yaml` takes
/// precedence over any per-service JSON files that might also exist.
pub fn load(dir: &Path) -> CoreResult<ConfigTree> {
    let combined = dir.join("services.yaml");
    if combined.is_file() {
        let text = std::fs::read_to_string(&combined)?;
        let tree: ConfigTree = serde_yaml::from_str(&text)
            .map_err(|err| CoreError::Config(format!("{}: {err}", combined.display())))?;
        return Ok(tree);
    }

    let mut tree = ConfigTree::default();
    let entries = std::fs::read_dir(dir)
        .map_err(|err| CoreError::Config(format!("reading config dir {}: {err}", dir.display())))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::Config(format!("unreadable config file name: {}", path.display())))?
            .to_string();
        let text = std::fs::read_to_string(&path)?;

        if name == "storage" {
            let storage: StorageConfig =
                serde_json::from_str(&text).map_err(|err| CoreError::Config(format!("{}: {err}", path.display())))?;
            tree.storage = Some(storage);
        } else {
            let service: ServiceConfig =
                serde_json::from_str(&text).map_err(|err| CoreError::Config(format!("{}: {err}", path.display())))?;
            tree.services.insert(name, service);
        }
    }

    if tree.storage.is_none() && tree.services.is_empty() {
        return Err(CoreError::Config(format!(
            "no services.yaml or <service>.json found under {}",
            dir.display()
        )));
    }

    Ok(tree)
}

/// Applies `KEYCLOAK_*` environment overrides to every service's auth
/// config, matching the original `ConfigManager`'s environment precedence
/// over file-based settings.
pub fn apply_env_overrides(tree: &mut ConfigTree) {
    for service in tree.services.values_mut() {
        if let Ok(v) = std::env::var("KEYCLOAK_AUTH_URL") {
            service.auth.auth_url = v;
        }
        if let Ok(v) = std::env::var("KEYCLOAK_REALM") {
            service.auth.realm = v;
        }
        if let Ok(v) = std::env::var("KEYCLOAK_CLIENT_ID") {
            service.auth.client_id = v;
        }
        if let Ok(v) = std::env::var("KEYCLOAK_CLIENT_SECRET") {
            service.auth.client_secret = v;
        }
        if let Ok(v) = std::env::var("KEYCLOAK_VERIFY_SSL") {
            service.auth.verify_ssl = v.parse().unwrap_or(service.auth.verify_ssl);
        }
    }
}
