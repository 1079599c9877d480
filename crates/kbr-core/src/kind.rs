//! Kind descriptors: the declarative schema the reconciliation engine walks.

use std::sync::Arc;

use crate::entity::Entity;

/// Derives a comparison key from an entity (e.g. `clients.client_id`).
pub type IdentityFn = Arc<dyn Fn(&Entity) -> String + Send + Sync>;

/// Structural equality beyond the identity key; may ignore server-assigned
/// fields. Kinds override this to encode kind-specific equivalence (e.g.
/// treating case-insensitive emails as equal).
pub type EqualityFn = Arc<dyn Fn(&Entity, &Entity) -> bool + Send + Sync>;

/// A named category of realm entity and everything the planner, exporter,
/// importer, and differ need to treat it uniformly.
#[derive(Clone)]
pub struct KindDescriptor {
    /// Unique name, e.g. `"clients"`.
    pub name: &'static str,
    /// Other Kind names that must be materialised before this one.
    pub depends_on: Vec<&'static str>,
    /// Path template for listing entities of this kind, with a `{realm}`
    /// placeholder.
    pub endpoint_list: &'static str,
    /// Path template for creating an entity of this kind.
    pub endpoint_create: &'static str,
    /// Derives the identity key used to match entities across snapshot and
    /// live state.
    pub identity_fn: IdentityFn,
    /// Structural equality beyond the identity key.
    pub equality_fn: EqualityFn,
}

impl std::fmt::Debug for KindDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindDescriptor")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("endpoint_list", &self.endpoint_list)
            .field("endpoint_create", &self.endpoint_create)
            .finish()
    }
}

impl KindDescriptor {
    /// Substitutes `{realm}` in the list endpoint template.
    pub fn list_path(&self, realm: &str) -> String {
        self.endpoint_list.replace("{realm}", realm)
    }

    /// Substitutes `{realm}` in the create endpoint template.
    pub fn create_path(&self, realm: &str) -> String {
        self.endpoint_create.replace("{realm}", realm)
    }

    /// Derives the identity key for the given entity.
    pub fn identity_of(&self, entity: &Entity) -> String {
        (self.identity_fn)(entity)
    }

    /// Checks structural equality, beyond identity, of two entities.
    pub fn entities_equal(&self, a: &Entity, b: &Entity) -> bool {
        (self.equality_fn)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> KindDescriptor {
        KindDescriptor {
            name: "clients",
            depends_on: vec![],
            endpoint_list: "/admin/realms/{realm}/clients",
            endpoint_create: "/admin/realms/{realm}/clients",
            identity_fn: Arc::new(|e| {
                e.get("client_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            }),
            equality_fn: Arc::new(|a, b| a == b),
        }
    }

    #[test]
    fn substitutes_realm_placeholder() {
        let kind = sample();
        assert_eq!(kind.list_path("acme"), "/admin/realms/acme/clients");
    }

    #[test]
    fn identity_fn_reads_configured_field() {
        let kind = sample();
        let entity = json!({"client_id": "app1"}).as_object().unwrap().clone();
        assert_eq!(kind.identity_of(&entity), "app1");
    }
}
