//! Authentication configuration for one identity-provider realm.

use serde::{Deserialize, Serialize};

/// Client-credentials grant configuration, one per service. Field names
/// mirror the `KEYCLOAK_`-prefixed environment variables of the service's
/// own auth settings (`auth_url`, `realm`, `client_id`, `client_secret`,
/// `verify_ssl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub auth_url: String,
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

fn default_realm() -> String {
    "master".to_string()
}

fn default_client_id() -> String {
    "admin-cli".to_string()
}

fn default_verify_ssl() -> bool {
    true
}
