//! Three-way diff between a snapshot's entities and live entities for one
//! or every kind.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use kbr_core::{Action, CoreResult, Entity, KindDescriptor, KindPlan, Plan, SchemaRegistry};

/// Diffs one kind: `from` is live state, `to` is the snapshot's desired
/// state. Produces `add`/`remove`/`update`/`skip` actions keyed by the
/// kind's identity function.
pub fn diff_kind(kind: &KindDescriptor, snapshot_entities: &[Entity], live_entities: &[Entity]) -> KindPlan {
    let snapshot_by_id: BTreeMap<String, &Entity> = snapshot_entities
        .iter()
        .map(|e| (kind.identity_of(e), e))
        .collect();
    let live_by_id: BTreeMap<String, &Entity> = live_entities
        .iter()
        .map(|e| (kind.identity_of(e), e))
        .collect();

    let mut actions = Vec::new();
    let mut seen = HashSet::new();

    for (identity, snapshot_entity) in &snapshot_by_id {
        seen.insert(identity.clone());
        match live_by_id.get(identity) {
            None => actions.push(Action::Add {
                identity: identity.clone(),
                entity: (*snapshot_entity).clone(),
            }),
            Some(live_entity) => {
                if kind.entities_equal(snapshot_entity, live_entity) {
                    actions.push(Action::Skip {
                        identity: identity.clone(),
                    });
                } else {
                    actions.push(Action::Update {
                        identity: identity.clone(),
                        from: (*live_entity).clone(),
                        to: (*snapshot_entity).clone(),
                        changed_fields: changed_fields(live_entity, snapshot_entity),
                    });
                }
            }
        }
    }

    for (identity, live_entity) in &live_by_id {
        if !seen.contains(identity) {
            actions.push(Action::Remove {
                identity: identity.clone(),
                entity: (*live_entity).clone(),
            });
        }
    }

    KindPlan {
        kind: kind.name.to_string(),
        actions,
    }
}

fn changed_fields(from: &Entity, to: &Entity) -> BTreeSet<String> {
    let keys: BTreeSet<&String> = from.keys().chain(to.keys()).collect();
    keys.into_iter()
        .filter(|k| from.get(*k) != to.get(*k))
        .cloned()
        .collect()
}

/// Diffs every kind in the registry, in planner order.
pub fn diff_all(
    registry: &SchemaRegistry,
    snapshot: &BTreeMap<String, Vec<Entity>>,
    live: &BTreeMap<String, Vec<Entity>>,
) -> CoreResult<Plan> {
    let order = kbr_core::plan_order(registry)?;
    let empty = Vec::new();

    let kinds = order
        .into_iter()
        .map(|name| {
            let kind = registry.get(name).expect("planner names are registered");
            let snapshot_entities = snapshot.get(name).unwrap_or(&empty);
            let live_entities = live.get(name).unwrap_or(&empty);
            diff_kind(kind, snapshot_entities, live_entities)
        })
        .collect();

    Ok(Plan { kinds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(json: serde_json::Value) -> Entity {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn diff_symmetry_of_absence() {
        let registry = crate::kinds::build_registry().unwrap();
        let clients = registry.get("clients").unwrap();

        let snapshot = vec![entity(json!({"clientId": "app1"}))];
        let live = vec![entity(json!({"clientId": "app2"}))];

        let forward = diff_kind(clients, &snapshot, &live);
        let backward = diff_kind(clients, &live, &snapshot);

        let forward_adds: BTreeSet<_> = forward
            .actions
            .iter()
            .filter_map(|a| matches!(a, Action::Add { .. }).then(|| a.identity().to_string()))
            .collect();
        let backward_removes: BTreeSet<_> = backward
            .actions
            .iter()
            .filter_map(|a| matches!(a, Action::Remove { .. }).then(|| a.identity().to_string()))
            .collect();

        assert_eq!(forward_adds, backward_removes);
    }

    #[test]
    fn identical_entities_skip() {
        let registry = crate::kinds::build_registry().unwrap();
        let clients = registry.get("clients").unwrap();
        let snapshot = vec![entity(json!({"clientId": "app1", "enabled": true}))];
        let live = snapshot.clone();

        let plan = diff_kind(clients, &snapshot, &live);
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(plan.actions[0], Action::Skip { .. }));
    }

    #[test]
    fn differing_entities_produce_update_with_changed_fields() {
        let registry = crate::kinds::build_registry().unwrap();
        let clients = registry.get("clients").unwrap();
        let snapshot = vec![entity(json!({"clientId": "app1", "enabled": true}))];
        let live = vec![entity(json!({"clientId": "app1", "enabled": false}))];

        let plan = diff_kind(clients, &snapshot, &live);
        assert_eq!(plan.actions.len(), 1);
        match &plan.actions[0] {
            Action::Update { changed_fields, .. } => {
                assert!(changed_fields.contains("enabled"));
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }
}
