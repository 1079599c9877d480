//! Per-kind export: fetch the live collection, decode/normalise it, and
//! isolate failures to the failing kind.

use std::collections::BTreeMap;

use kbr_client::ApiClient;
use kbr_core::{Artifact, CoreError, CoreResult, Entity, KindDescriptor, SchemaRegistry};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::schemas;

/// Exports every kind in the registry, in planner order, against a single
/// realm. Per-kind failures are recorded in the artifact and do not abort
/// the remaining kinds; the returned `bool` is `true` if any kind failed.
/// Cancellation is checked between kinds and aborts the whole export with
/// `CoreError::Canceled` rather than folding it into a per-kind artifact.
pub async fn export_all(
    client: &ApiClient,
    registry: &SchemaRegistry,
    cancellation: &CancellationToken,
) -> CoreResult<(BTreeMap<String, Artifact>, bool)> {
    let order = kbr_core::plan_order(registry)?;
    let mut artifacts = BTreeMap::new();
    let mut degraded = false;

    for name in order {
        if cancellation.is_cancelled() {
            return Err(CoreError::Canceled);
        }

        let kind = registry
            .get(name)
            .expect("planner only emits names present in the registry");

        match export_kind(client, kind, cancellation).await {
            Ok(entities) => {
                let message = format!("exported {} {name} entities", entities.len());
                artifacts.insert(name.to_string(), Artifact::ok(message, entities));
            }
            Err(err) => {
                degraded = true;
                let status = status_for(&err);
                warn!(kind = name, error = %err, "export failed for kind, continuing");
                artifacts.insert(
                    name.to_string(),
                    Artifact::failed(format!("failed to export {name}"), err.to_string(), status),
                );
            }
        }
    }

    Ok((artifacts, degraded))
}

/// Exports a single kind on its own, for ad-hoc inspection (the HTTP
/// adapter's `GET /backup/<service>/<kind>`). Failures are folded into the
/// returned artifact rather than propagated, matching `export_all`'s
/// per-kind isolation.
pub async fn export_one(client: &ApiClient, kind: &KindDescriptor, cancellation: &CancellationToken) -> Artifact {
    match export_kind(client, kind, cancellation).await {
        Ok(entities) => {
            let message = format!("exported {} {} entities", entities.len(), kind.name);
            Artifact::ok(message, entities)
        }
        Err(err) => {
            let status = status_for(&err);
            warn!(kind = kind.name, error = %err, "ad-hoc export failed");
            Artifact::failed(format!("failed to export {}", kind.name), err.to_string(), status)
        }
    }
}

async fn export_kind(
    client: &ApiClient,
    kind: &KindDescriptor,
    cancellation: &CancellationToken,
) -> CoreResult<Vec<Entity>> {
    let raw_items = client.get(kind.endpoint_list, cancellation).await?;
    let mut decoded = Vec::with_capacity(raw_items.len());
    for raw in raw_items {
        decoded.push(schemas::decode(kind.name, Value::Object(raw))?);
    }
    Ok(decoded)
}

fn status_for(err: &CoreError) -> u16 {
    match err {
        CoreError::PermissionDenied { .. } => 403,
        CoreError::NotFound(_) => 404,
        CoreError::InvalidEntity { .. } => 422,
        CoreError::RemoteRejected { status, .. } => *status,
        CoreError::Config(_) => 500,
        _ => 502,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbr_client::AuthConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        Mock::given(method("POST"))
            .and(path("/realms/acme/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(server)
            .await;
        ApiClient::new(AuthConfig {
            auth_url: server.uri(),
            realm: "acme".to_string(),
            client_id: "backup-tool".to_string(),
            client_secret: "secret".to_string(),
            verify_ssl: true,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn export_all_marks_degraded_when_one_kind_fails() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/users"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/identity-provider/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let registry = crate::kinds::build_registry().unwrap();
        let (artifacts, degraded) = export_all(&client, &registry, &CancellationToken::new()).await.unwrap();

        assert!(degraded);
        assert!(artifacts["users"].error.is_some());
        assert!(artifacts["clients"].error.is_none());
    }

    #[tokio::test]
    async fn export_all_produces_empty_but_valid_artifact_for_empty_collection() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        for p in [
            "/admin/realms/acme/clients",
            "/admin/realms/acme/groups",
            "/admin/realms/acme/users",
            "/admin/realms/acme/roles",
            "/admin/realms/acme/identity-provider/instances",
        ] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;
        }

        let registry = crate::kinds::build_registry().unwrap();
        let (artifacts, degraded) = export_all(&client, &registry, &CancellationToken::new()).await.unwrap();

        assert!(!degraded);
        assert!(artifacts["clients"].result.is_empty());
        assert!(artifacts["clients"].error.is_none());
    }

    #[tokio::test]
    async fn export_all_fails_fast_on_an_already_canceled_token() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        // No per-kind mocks are registered: a canceled token must stop the
        // walk before the first kind's request is ever sent.
        let registry = crate::kinds::build_registry().unwrap();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let err = export_all(&client, &registry, &cancellation).await.unwrap_err();
        assert!(matches!(err, CoreError::Canceled));
    }

    #[tokio::test]
    async fn export_one_returns_a_standalone_artifact() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"clientId": "app1"}])))
            .mount(&server)
            .await;

        let registry = crate::kinds::build_registry().unwrap();
        let kind = registry.get("clients").unwrap();
        let artifact = export_one(&client, kind, &CancellationToken::new()).await;

        assert!(artifact.error.is_none());
        assert_eq!(artifact.result.len(), 1);
    }
}
