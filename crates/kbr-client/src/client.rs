//! The identity-provider API client: client-credentials auth plus thin
//! GET/POST helpers, grounded on `original_source/.../services/keycloak.py`'s
//! `KeycloakAPIClient`.

use std::time::Duration;

use kbr_core::{CoreError, CoreResult, Entity};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AuthConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Speaks to one realm of the identity provider on behalf of Exporter and
/// Importer. Safe for concurrent use: token refresh is single-flighted
/// behind a `tokio::sync::Mutex` around the cached token slot.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    auth: AuthConfig,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    /// Builds a client for the given realm's auth configuration.
    pub fn new(auth: AuthConfig) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .danger_accept_invalid_certs(!auth.verify_ssl)
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            auth,
            token: Mutex::new(None),
        })
    }

    /// GET `endpoint` (with `{realm}` substituted), decoding the response
    /// body as a list of entities. Returns `CoreError::Canceled` without
    /// issuing a request if `cancellation` is already canceled.
    pub async fn get(&self, endpoint: &str, cancellation: &CancellationToken) -> CoreResult<Vec<Entity>> {
        let response = self.call(Method::GET, endpoint, None, cancellation).await?;
        response
            .json::<Vec<Entity>>()
            .await
            .map_err(|e| CoreError::Transport(format!("failed to decode response from {endpoint}: {e}")))
    }

    /// POST `body` to `endpoint` (with `{realm}` substituted). Returns
    /// `CoreError::Canceled` without issuing a request if `cancellation` is
    /// already canceled.
    pub async fn post(&self, endpoint: &str, body: Value, cancellation: &CancellationToken) -> CoreResult<()> {
        self.call(Method::POST, endpoint, Some(body), cancellation).await?;
        Ok(())
    }

    fn build_url(&self, endpoint_template: &str) -> String {
        let path = endpoint_template.replace("{realm}", &self.auth.realm);
        format!("{}{}", self.auth.auth_url.trim_end_matches('/'), path)
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        cancellation: &CancellationToken,
    ) -> CoreResult<reqwest::Response> {
        if cancellation.is_cancelled() {
            return Err(CoreError::Canceled);
        }

        let token = self.authenticate().await?;
        let response = self.send(method.clone(), endpoint, body.as_ref(), &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(endpoint, "token rejected with 401, re-authenticating once");
            *self.token.lock().await = None;

            if cancellation.is_cancelled() {
                return Err(CoreError::Canceled);
            }

            let token = self.authenticate().await?;
            let response = self.send(method, endpoint, body.as_ref(), &token).await?;
            return self.check_status(response, endpoint).await;
        }

        self.check_status(response, endpoint).await
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        token: &str,
    ) -> CoreResult<reqwest::Response> {
        let url = self.build_url(endpoint);
        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("{method} request to {endpoint} failed: {e}")))
    }

    async fn check_status(&self, response: reqwest::Response, endpoint: &str) -> CoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::FORBIDDEN {
            return Err(CoreError::PermissionDenied {
                realm: self.auth.realm.clone(),
                detail: format!(
                    "request to {endpoint} was forbidden; the configured client may lack the required service-account roles"
                ),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(CoreError::RemoteRejected {
            status: status.as_u16(),
            message: format!("{endpoint}: {body}"),
        })
    }

    /// Returns a valid bearer token, refreshing or acquiring one as needed.
    /// Holds the token lock for the duration of validation/refresh, so a
    /// burst of concurrent callers collapses onto one refresh.
    async fn authenticate(&self) -> CoreResult<String> {
        let mut slot = self.token.lock().await;

        if let Some(token) = slot.clone() {
            if self.token_is_valid(&token).await? {
                return Ok(token);
            }
        }

        info!(auth_url = %self.auth.auth_url, realm = %self.auth.realm, "authenticating");
        let token = self.acquire_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn acquire_token(&self) -> CoreResult<String> {
        let url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.auth.auth_url.trim_end_matches('/'),
            self.auth.realm
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.auth.client_id.as_str()),
                ("client_secret", self.auth.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("authentication request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Transport(format!(
                "authentication failed with status {status}: {body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Transport(format!("failed to decode token response: {e}")))?;
        payload
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CoreError::Transport("token response missing access_token".to_string()))
    }

    async fn token_is_valid(&self, token: &str) -> CoreResult<bool> {
        let url = format!(
            "{}/realms/{}/protocol/openid-connect/token/introspect",
            self.auth.auth_url.trim_end_matches('/'),
            self.auth.realm
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.auth.client_id.as_str()),
                ("client_secret", self.auth.client_secret.as_str()),
                ("token", token),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("token introspection failed: {e}")))?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Transport(format!("failed to decode introspection response: {e}")))?;
        Ok(payload.get("active").and_then(Value::as_bool).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth_for(server: &MockServer) -> AuthConfig {
        AuthConfig {
            auth_url: server.uri(),
            realm: "acme".to_string(),
            client_id: "backup-tool".to_string(),
            client_secret: "s3cr3t".to_string(),
            verify_ssl: true,
        }
    }

    #[tokio::test]
    async fn get_authenticates_then_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/acme/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"clientId": "app1"}])))
            .mount(&server)
            .await;

        let client = ApiClient::new(auth_for(&server)).unwrap();
        let entities = client
            .get("/admin/realms/{realm}/clients", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0]["clientId"], "app1");
    }

    #[tokio::test]
    async fn cached_token_is_reused_when_introspection_reports_active() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/acme/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/realms/acme/protocol/openid-connect/token/introspect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = ApiClient::new(auth_for(&server)).unwrap();
        let cancellation = CancellationToken::new();
        client.get("/admin/realms/{realm}/clients", &cancellation).await.unwrap();
        client.get("/admin/realms/{realm}/clients", &cancellation).await.unwrap();
    }

    #[tokio::test]
    async fn forbidden_response_maps_to_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/acme/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = ApiClient::new(auth_for(&server)).unwrap();
        let err = client
            .get("/admin/realms/{realm}/clients", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            CoreError::PermissionDenied { realm, .. } => assert_eq!(realm, "acme"),
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_triggers_one_retry_with_fresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/acme/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .and(body_string_contains(""))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/acme/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = ApiClient::new(auth_for(&server)).unwrap();
        let entities = client
            .get("/admin/realms/{realm}/clients", &CancellationToken::new())
            .await
            .unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn canceled_token_fails_fast_without_issuing_a_request() {
        let server = MockServer::start().await;
        // No mocks are registered: a request reaching the server would panic
        // the mock on an unexpected call, so a clean `Canceled` error is the
        // only way this test can pass.
        let client = ApiClient::new(auth_for(&server)).unwrap();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let err = client
            .get("/admin/realms/{realm}/clients", &cancellation)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Canceled));
    }
}
