//! Per-kind import: create entities against the live realm, applying the
//! per-item failure policy: isolate, count, and continue.

use std::collections::{BTreeMap, HashSet};

use kbr_client::ApiClient;
use kbr_core::{Artifact, CoreError, CoreResult, SchemaRegistry};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Per-kind outcome of an import pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct KindImportReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
}

/// The full import report, keyed by kind name.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub kinds: BTreeMap<String, KindImportReport>,
}

/// Imports every kind present in `artifacts`, in planner order.
///
/// - 409 on an item is treated as `AlreadyExists`: counted, not fatal.
/// - Other 4xx on an item is recorded as a failure; the kind continues.
/// - 5xx, transport, or permission failures abort the remaining items in
///   that kind and mark it failed, so every kind depending on it (directly
///   or transitively) is recorded as skipped rather than attempted.
///
/// Cancellation is checked between kinds and aborts the whole import with
/// `CoreError::Canceled`, discarding whatever reports were already built.
pub async fn import_all(
    client: &ApiClient,
    registry: &SchemaRegistry,
    artifacts: &BTreeMap<String, Artifact>,
    cancellation: &CancellationToken,
) -> CoreResult<ImportReport> {
    let order = kbr_core::plan_order(registry)?;
    let mut reports = BTreeMap::new();
    let mut failed_kinds: HashSet<&str> = HashSet::new();

    for name in order {
        if cancellation.is_cancelled() {
            return Err(CoreError::Canceled);
        }

        let kind = registry
            .get(name)
            .expect("planner only emits names present in the registry");

        let Some(artifact) = artifacts.get(name) else {
            continue;
        };

        let blocked = kind.depends_on.iter().any(|dep| failed_kinds.contains(dep));
        if blocked {
            warn!(kind = name, "skipping kind: a dependency failed to import");
            reports.insert(
                name.to_string(),
                KindImportReport {
                    skipped: artifact.result.len(),
                    ..Default::default()
                },
            );
            failed_kinds.insert(name);
            continue;
        }

        let (report, aborted) = import_kind(client, kind.endpoint_create, artifact, cancellation).await;
        if aborted {
            failed_kinds.insert(name);
        }
        reports.insert(name.to_string(), report);
    }

    Ok(ImportReport { kinds: reports })
}

/// Imports a single kind's entities on its own, for ad-hoc use (the HTTP
/// adapter's `POST /restore/<service>/<kind>`). Dependency-skip bookkeeping
/// is the caller's responsibility in this one-shot path.
pub async fn import_one(
    client: &ApiClient,
    endpoint_create: &str,
    entities: Vec<serde_json::Map<String, Value>>,
    cancellation: &CancellationToken,
) -> KindImportReport {
    let artifact = Artifact::ok("ad-hoc import", entities);
    let (report, _aborted) = import_kind(client, endpoint_create, &artifact, cancellation).await;
    report
}

async fn import_kind(
    client: &ApiClient,
    endpoint_create: &str,
    artifact: &Artifact,
    cancellation: &CancellationToken,
) -> (KindImportReport, bool) {
    let mut report = KindImportReport::default();
    let mut aborted = false;

    for (index, raw) in artifact.result.iter().enumerate() {
        if aborted {
            report.skipped += 1;
            continue;
        }

        match client.post(endpoint_create, Value::Object(raw.clone()), cancellation).await {
            Ok(()) => report.created += 1,
            Err(CoreError::RemoteRejected { status, .. }) if status == 409 => {
                report.existing += 1;
            }
            Err(CoreError::RemoteRejected { status, message }) if (400..500).contains(&status) => {
                report.failed += 1;
                report.failures.push(format!("item {index}: {message}"));
            }
            Err(err) => {
                report.failed += 1;
                report.failures.push(format!("item {index}: {err}"));
                aborted = true;
            }
        }
    }

    (report, aborted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbr_client::AuthConfig;
    use kbr_core::Artifact;
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
    async fn conflict_is_counted_as_existing_not_failed() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let registry = crate::kinds::build_registry().unwrap();
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "clients".to_string(),
            Artifact::ok("x", vec![json!({"clientId": "app1"}).as_object().unwrap().clone()]),
        );

        let report = import_all(&client, &registry, &artifacts, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.kinds["clients"].existing, 1);
        assert_eq!(report.kinds["clients"].failed, 0);
    }

    #[tokio::test]
    async fn server_error_aborts_kind_and_skips_dependents() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = crate::kinds::build_registry().unwrap();
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "clients".to_string(),
            Artifact::ok(
                "x",
                vec![
                    json!({"clientId": "app1"}).as_object().unwrap().clone(),
                    json!({"clientId": "app2"}).as_object().unwrap().clone(),
                ],
            ),
        );
        artifacts.insert(
            "roles".to_string(),
            Artifact::ok("x", vec![json!({"name": "admin"}).as_object().unwrap().clone()]),
        );

        let report = import_all(&client, &registry, &artifacts, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.kinds["clients"].failed, 1);
        assert_eq!(report.kinds["clients"].skipped, 1);
        assert_eq!(report.kinds["roles"].skipped, 1);
    }

    #[tokio::test]
    async fn import_all_fails_fast_on_an_already_canceled_token() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        let registry = crate::kinds::build_registry().unwrap();
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "clients".to_string(),
            Artifact::ok("x", vec![json!({"clientId": "app1"}).as_object().unwrap().clone()]),
        );
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let err = import_all(&client, &registry, &artifacts, &cancellation).await.unwrap_err();
        assert!(matches!(err, CoreError::Canceled));
    }

    #[tokio::test]
    async fn import_one_creates_entities_without_touching_the_registry() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let entities = vec![json!({"clientId": "app1"}).as_object().unwrap().clone()];
        let report =
            import_one(&client, "/admin/realms/{realm}/clients", entities, &CancellationToken::new()).await;
        assert_eq!(report.created, 1);
    }
}
