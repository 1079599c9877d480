//! The opaque entity representation shared by every Kind.

use serde_json::{Map, Value};

/// An opaque mapping from field name to JSON value, validated against a
/// Kind's expected shape elsewhere in the pipeline. Server-only fields
/// (`id`, timestamps) are stripped on snapshot and re-acquired on restore.
pub type Entity = Map<String, Value>;

/// Removes the given top-level fields from an entity, in place.
///
/// Used by exporters to strip server-only fields before an entity is
/// written into a snapshot artifact.
pub fn strip_fields(entity: &mut Entity, fields: &[&str]) {
    for field in fields {
        entity.remove(*field);
    }
}
