//! Typed Keycloak entity shapes, grounded in
//! `original_source/backup_restore/services/keycloak.py`'s pydantic schemas.
//!
//! Each type round-trips through the wire JSON Keycloak's admin REST API
//! actually produces and consumes (`rename_all = "camelCase"`). Decoding
//! through these types is also how server-only fields (anything not named
//! here, e.g. Keycloak-assigned `id`s on clients) get stripped before an
//! entity is written into a snapshot.

use std::collections::HashMap;

use kbr_core::{strip_fields, CoreError, CoreResult, Entity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientEntity {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
    /// Recursive tree; `Vec` already indirects, so no arena or boxing is
    /// needed for a type that contains itself.
    #[serde(default)]
    pub sub_groups: Vec<GroupEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub composite: bool,
    #[serde(default)]
    pub client_role: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderEntity {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub provider_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub trust_email: bool,
    #[serde(default)]
    pub store_token: bool,
    #[serde(default)]
    pub add_read_token_role_on_create: bool,
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Decodes `raw` through a typed schema and re-encodes to its canonical
/// wire form, stripping `strip` (wire field names, post-rename) so
/// server-assigned values never reach the snapshot artifact.
fn round_trip<T>(kind: &str, raw: Value, strip: &[&str]) -> CoreResult<Entity>
where
    T: for<'de> Deserialize<'de> + Serialize,
{
    let typed: T = serde_json::from_value(raw).map_err(|e| CoreError::InvalidEntity {
        kind: kind.to_string(),
        message: e.to_string(),
    })?;
    let value = serde_json::to_value(&typed)?;
    let mut entity = value.as_object().cloned().ok_or_else(|| CoreError::InvalidEntity {
        kind: kind.to_string(),
        message: "decoded entity was not a JSON object".to_string(),
    })?;
    strip_fields(&mut entity, strip);
    Ok(entity)
}

/// Removes the server-assigned `id` from a decoded group and every
/// `subGroups` descendant, recursively — a shallow strip would leave
/// nested groups' ids in place and break idempotence for any group with
/// children.
fn strip_group_ids(entity: &mut Entity) {
    entity.remove("id");
    if let Some(Value::Array(sub_groups)) = entity.get_mut("subGroups") {
        for sub_group in sub_groups.iter_mut() {
            if let Some(obj) = sub_group.as_object_mut() {
                strip_group_ids(obj);
            }
        }
    }
}

pub fn decode(kind: &str, raw: Value) -> CoreResult<Entity> {
    match kind {
        "clients" => round_trip::<ClientEntity>(kind, raw, &[]),
        "users" => round_trip::<UserEntity>(kind, raw, &[]),
        "groups" => {
            let mut entity = round_trip::<GroupEntity>(kind, raw, &[])?;
            strip_group_ids(&mut entity);
            Ok(entity)
        }
        "roles" => round_trip::<RoleEntity>(kind, raw, &["id", "containerId"]),
        "identity_providers" => round_trip::<IdentityProviderEntity>(kind, raw, &[]),
        other => Err(CoreError::Config(format!("unknown kind '{other}'"))),
    }
}
