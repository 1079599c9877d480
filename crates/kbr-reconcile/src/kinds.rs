//! The five built-in Keycloak kinds and their dependency edges, endpoints,
//! identity keys, and equality rules.

use std::sync::Arc;

use kbr_core::{CoreResult, Entity, EqualityFn, IdentityFn, KindDescriptor, SchemaRegistry};
use serde_json::Value;

fn string_field(entity: &Entity, field: &str) -> String {
    entity
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn structural_equality() -> EqualityFn {
    Arc::new(|a, b| a == b)
}

/// Users are considered equal when every field matches except that email
/// comparisons are case-insensitive, mirroring how Keycloak itself treats
/// email as case-insensitive for lookups even though it preserves case on
/// write.
fn user_equality() -> EqualityFn {
    Arc::new(|a, b| {
        let mut a = a.clone();
        let mut b = b.clone();
        for entity in [&mut a, &mut b] {
            if let Some(Value::String(email)) = entity.get_mut("email") {
                *email = email.to_lowercase();
            }
        }
        a == b
    })
}

/// Builds the fixed registry of Keycloak kinds used throughout this crate.
pub fn build_registry() -> CoreResult<SchemaRegistry> {
    let clients = KindDescriptor {
        name: "clients",
        depends_on: vec![],
        endpoint_list: "/admin/realms/{realm}/clients",
        endpoint_create: "/admin/realms/{realm}/clients",
        identity_fn: Arc::new(|e: &Entity| string_field(e, "clientId")) as IdentityFn,
        equality_fn: structural_equality(),
    };

    let groups = KindDescriptor {
        name: "groups",
        depends_on: vec![],
        endpoint_list: "/admin/realms/{realm}/groups",
        endpoint_create: "/admin/realms/{realm}/groups",
        identity_fn: Arc::new(|e: &Entity| string_field(e, "name")) as IdentityFn,
        equality_fn: structural_equality(),
    };

    let users = KindDescriptor {
        name: "users",
        depends_on: vec!["groups"],
        endpoint_list: "/admin/realms/{realm}/users",
        endpoint_create: "/admin/realms/{realm}/users",
        identity_fn: Arc::new(|e: &Entity| string_field(e, "username")) as IdentityFn,
        equality_fn: user_equality(),
    };

    let roles = KindDescriptor {
        name: "roles",
        depends_on: vec!["clients"],
        endpoint_list: "/admin/realms/{realm}/roles",
        endpoint_create: "/admin/realms/{realm}/roles",
        identity_fn: Arc::new(|e: &Entity| string_field(e, "name")) as IdentityFn,
        equality_fn: structural_equality(),
    };

    let identity_providers = KindDescriptor {
        name: "identity_providers",
        depends_on: vec![],
        endpoint_list: "/admin/realms/{realm}/identity-provider/instances",
        endpoint_create: "/admin/realms/{realm}/identity-provider/instances",
        identity_fn: Arc::new(|e: &Entity| string_field(e, "alias")) as IdentityFn,
        equality_fn: structural_equality(),
    };

    SchemaRegistry::new(vec![clients, groups, users, roles, identity_providers])
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbr_core::plan_order;

    #[test]
    fn registry_plans_dependents_after_dependencies() {
        let registry = build_registry().unwrap();
        let order = plan_order(&registry).unwrap();
        let pos = |name: &str| order.iter().position(|&n| n == name).unwrap();
        assert!(pos("groups") < pos("users"));
        assert!(pos("clients") < pos("roles"));
    }

    #[test]
    fn role_equality_ignores_server_assigned_id_and_container_id() {
        use crate::schemas::decode;

        let registry = build_registry().unwrap();
        let roles = registry.get("roles").unwrap();

        let snapshot = decode(
            "roles",
            serde_json::json!({"id": "original-realm-role-id", "name": "viewer", "containerId": "original-realm-client-id"}),
        )
        .unwrap();
        let live = decode(
            "roles",
            serde_json::json!({"id": "new-realm-role-id", "name": "viewer", "containerId": "new-realm-client-id"}),
        )
        .unwrap();

        assert!(roles.entities_equal(&snapshot, &live));
    }

    #[test]
    fn user_equality_ignores_email_case() {
        let registry = build_registry().unwrap();
        let users = registry.get("users").unwrap();
        let a = serde_json::json!({"username": "bob", "email": "Bob@Example.com", "enabled": true, "emailVerified": false, "attributes": {}})
            .as_object()
            .unwrap()
            .clone();
        let b = serde_json::json!({"username": "bob", "email": "bob@example.com", "enabled": true, "emailVerified": false, "attributes": {}})
            .as_object()
            .unwrap()
            .clone();
        assert!(users.entities_equal(&a, &b));
    }
}
