//! Topological ordering of Kinds by declared dependencies (Kahn's algorithm).

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::error::{CoreError, CoreResult};
use crate::registry::SchemaRegistry;

/// Computes a dependency-respecting order over the registry's kinds.
///
/// In-degree is computed over the reversed edge set (`dep -> dependent`).
/// The initial queue of zero-in-degree kinds, and every subsequent
/// enqueue, is processed in `SchemaRegistry` insertion order, so the same
/// registry always yields the same ordering. If not every kind can be
/// emitted, the unprocessed kinds form (or touch) a cycle and are reported
/// together.
pub fn plan_order(registry: &SchemaRegistry) -> CoreResult<Vec<&'static str>> {
    let names: Vec<&'static str> = registry.iter().map(|k| k.name).collect();

    let mut in_degree: HashMap<&'static str, usize> =
        names.iter().map(|&name| (name, 0)).collect();
    // successors[dep] = kinds that depend on `dep`
    let mut successors: HashMap<&'static str, Vec<&'static str>> =
        names.iter().map(|&name| (name, Vec::new())).collect();

    for kind in registry.iter() {
        for dep in &kind.depends_on {
            if !in_degree.contains_key(dep) {
                return Err(CoreError::Config(format!(
                    "kind '{}' depends on unknown kind '{}'",
                    kind.name, dep
                )));
            }
            *in_degree.get_mut(kind.name).unwrap() += 1;
            successors.get_mut(dep).unwrap().push(kind.name);
        }
    }

    let mut queue: VecDeque<&'static str> = VecDeque::new();
    for &name in &names {
        if in_degree[name] == 0 {
            queue.push_back(name);
        }
    }

    let mut emitted = Vec::with_capacity(names.len());
    while let Some(name) = queue.pop_front() {
        emitted.push(name);
        for &successor in &successors[name] {
            let degree = in_degree.get_mut(successor).unwrap();
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(successor);
            }
        }
    }

    if emitted.len() < names.len() {
        let emitted_set: std::collections::HashSet<_> = emitted.iter().copied().collect();
        let unprocessed: Vec<String> = names
            .into_iter()
            .filter(|name| !emitted_set.contains(name))
            .map(String::from)
            .collect();
        return Err(CoreError::CyclicDependency(unprocessed));
    }

    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{EqualityFn, IdentityFn, KindDescriptor};
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
    fn dependencies_precede_dependents() {
        let registry = SchemaRegistry::new(vec![
            descriptor("roles", vec!["clients"]),
            descriptor("clients", vec![]),
            descriptor("users", vec!["groups"]),
            descriptor("groups", vec![]),
        ])
        .unwrap();

        let order = plan_order(&registry).unwrap();
        let pos = |name: &str| order.iter().position(|&n| n == name).unwrap();

        assert!(pos("clients") < pos("roles"));
        assert!(pos("groups") < pos("users"));
    }

    #[test]
    fn stable_order_among_independent_kinds() {
        let registry = SchemaRegistry::new(vec![
            descriptor("clients", vec![]),
            descriptor("groups", vec![]),
            descriptor("identity_providers", vec![]),
        ])
        .unwrap();

        let order = plan_order(&registry).unwrap();
        assert_eq!(order, vec!["clients", "groups", "identity_providers"]);
    }

    #[test]
    fn rejects_cycles_naming_both_kinds() {
        let registry = SchemaRegistry::new(vec![
            descriptor("a", vec!["b"]),
            descriptor("b", vec!["a"]),
        ])
        .unwrap();

        let err = plan_order(&registry).unwrap_err();
        match err {
            CoreError::CyclicDependency(names) => {
                assert_eq!(names.len(), 2);
                assert!(names.contains(&"a".to_string()));
                assert!(names.contains(&"b".to_string()));
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn three_node_cycle_with_independent_kind() {
        let registry = SchemaRegistry::new(vec![
            descriptor("a", vec!["c"]),
            descriptor("b", vec!["a"]),
            descriptor("c", vec!["b"]),
            descriptor("independent", vec![]),
        ])
        .unwrap();

        let err = plan_order(&registry).unwrap_err();
        match err {
            CoreError::CyclicDependency(names) => {
                assert_eq!(names.len(), 3);
                assert!(!names.contains(&"independent".to_string()));
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }
}
