//! A process-wide, immutable mapping from Kind name to descriptor.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::kind::KindDescriptor;

/// Holds Kind descriptors in insertion order, with lookup by name.
///
/// Built once (typically from a fixed `Vec<KindDescriptor>` at startup) and
/// never mutated afterwards. Attempts to register a duplicate name fail with
/// `CoreError::Config`.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    order: Vec<&'static str>,
    by_name: HashMap<&'static str, KindDescriptor>,
}

impl SchemaRegistry {
    /// Builds a registry from an ordered list of descriptors.
    pub fn new(descriptors: Vec<KindDescriptor>) -> CoreResult<Self> {
        let mut order = Vec::with_capacity(descriptors.len());
        let mut by_name = HashMap::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if by_name.contains_key(descriptor.name) {
                return Err(CoreError::Config(format!(
                    "duplicate kind '{}' in schema registry",
                    descriptor.name
                )));
            }
            order.push(descriptor.name);
            by_name.insert(descriptor.name, descriptor);
        }

        Ok(Self { order, by_name })
    }

    /// Looks up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&KindDescriptor> {
        self.by_name.get(name)
    }

    /// Iterates descriptors in insertion (registration) order.
    pub fn iter(&self) -> impl Iterator<Item = &KindDescriptor> {
        self.order.iter().map(move |name| &self.by_name[name])
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{EqualityFn, IdentityFn};
    use std::sync::Arc;

    fn descriptor(name: &'static str, depends_on: Vec<&'static str>) -> KindDescriptor {
        let identity: IdentityFn = Arc::new(|_| String::new());
        let equality: EqualityFn = Arc::new(|a, b| a == b);
        KindDescriptor {
            name,
            depends_on,
            endpoint_list: "/x",
            endpoint_create: "/x",
            identity_fn: identity,
            equality_fn: equality,
        }
    }

    #[test]
    fn preserves_insertion_order() {
        let registry =
            SchemaRegistry::new(vec![descriptor("b", vec![]), descriptor("a", vec![])]).unwrap();
        let names: Vec<_> = registry.iter().map(|k| k.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err =
            SchemaRegistry::new(vec![descriptor("a", vec![]), descriptor("a", vec![])]).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn lookup_by_name() {
        let registry = SchemaRegistry::new(vec![descriptor("a", vec![])]).unwrap();
        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
    }
}
