//! Authenticated API transport.
//!
//! Every call goes through [`ApiTransport::execute`]: the current access
//! credential is attached as a bearer token, and a 401 is handed to the
//! refresh coordinator instead of being returned. Login and refresh calls
//! carry no bearer token and their 401s are returned as ordinary errors.
//!
//! The transport never ends the session on ordinary HTTP errors; only a
//! failed refresh, or a request rejected again after a refresh, does.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument};

use crate::backend::{HttpBackend, HttpMethod, HttpRequest, HttpResponse, ReqwestBackend};
use crate::config::ClientConfig;
use crate::credential::{Credential, CredentialStore};
use crate::envelope;
use crate::error::{ApiError, NetworkError};
use crate::refresh::RefreshCoordinator;

/// Notified when the session ends because the credential could not be renewed.
pub trait ExpiryListener: Send + Sync {
    /// Called after the credential store has been cleared.
    fn session_expired(&self);
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    method: HttpMethod,
    body: Option<JsonValue>,
    headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Creates options for `method` with no body.
    #[must_use]
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(alias = "access_token")]
    access: String,
}

/// State shared by the transport handle and the refresh coordinator task.
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) credentials: CredentialStore,
    backend: Arc<dyn HttpBackend>,
    listeners: RwLock<Vec<Arc<dyn ExpiryListener>>>,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig, backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            config,
            credentials: CredentialStore::new(),
            backend,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Builds the request without any `Authorization` header.
    pub(crate) fn prepare(&self, path: &str, options: RequestOptions) -> HttpRequest {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if options.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers.extend(options.headers);

        HttpRequest {
            method: options.method,
            url: self.config.url_for(path),
            path: path.to_string(),
            headers,
            body: options.body.map(|body| body.to_string().into_bytes()),
        }
    }

    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.backend.send(request).await.map_err(ApiError::from)
    }

    /// Calls the refresh endpoint; the refresh cookie rides in the backend's jar.
    pub(crate) async fn refresh(self: Arc<Self>) -> Result<Credential, ApiError> {
        let path = self.config.endpoints().refresh.clone();
        let response = self
            .send(self.prepare(&path, RequestOptions::new(HttpMethod::Post)))
            .await?;
        let RefreshResponse { access } = envelope::decode(&response)?;
        Ok(Credential::from_access_token(
            access,
            self.config.default_access_ttl(),
        ))
    }

    /// Clears the credential and notifies every expiry listener.
    pub(crate) fn expire_session(&self) {
        self.credentials.clear();
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.session_expired();
        }
    }
}

/// Cloneable handle for making authenticated backend calls.
#[derive(Clone)]
pub struct ApiTransport {
    shared: Arc<Shared>,
    coordinator: RefreshCoordinator,
}

impl ApiTransport {
    /// Creates a transport and starts its refresh coordinator.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(config: ClientConfig, backend: Arc<dyn HttpBackend>) -> Self {
        let shared = Arc::new(Shared::new(config, backend));
        let coordinator = RefreshCoordinator::spawn(Arc::clone(&shared));
        Self {
            shared,
            coordinator,
        }
    }

    /// Creates a transport backed by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_reqwest(config: ClientConfig) -> Result<Self, NetworkError> {
        let backend = ReqwestBackend::new(&config)?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Returns the credential store.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.shared.credentials
    }

    /// Registers a listener for session expiry.
    pub fn add_expiry_listener(&self, listener: Arc<dyn ExpiryListener>) {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Sends a request and returns the raw response.
    ///
    /// A 401 from any endpoint other than login and refresh waits for a
    /// single shared refresh and is then replayed once with the new
    /// credential.
    ///
    /// # Errors
    ///
    /// Returns `Network` when no response arrives and `AuthExpired` when the
    /// credential could not be renewed. Other statuses are returned as
    /// responses.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn execute(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.shared.prepare(path, options);

        if self.shared.config.is_credential_endpoint(path) {
            return self.shared.send(request).await;
        }

        let current = self.shared.credentials.get();
        let token = current
            .as_ref()
            .map(|credential| credential.access_token().to_string());

        if current
            .as_ref()
            .is_some_and(|credential| credential.is_expired(self.shared.config.expiry_skew()))
        {
            debug!("access credential expired; refreshing before sending");
            return self.coordinator.enqueue(request, token).await;
        }

        let response = self
            .shared
            .send(request.with_bearer(token.as_deref()))
            .await?;
        if response.is_unauthorized() {
            debug!("request rejected with 401; deferring to refresh");
            return self.coordinator.enqueue(request, token).await;
        }

        debug!(status = response.status, "request completed");
        Ok(response)
    }

    /// Sends a request and decodes the envelope's `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`execute`](Self::execute), plus `Http` for
    /// non-2xx statuses and failed envelopes, and `InvalidResponse` when the
    /// payload does not match `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.execute(path, options).await?;
        envelope::decode(&response)
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(HttpMethod::Get)).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: JsonValue,
    ) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(HttpMethod::Post).with_body(body)).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: JsonValue,
    ) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(HttpMethod::Put).with_body(body)).await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: JsonValue,
    ) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(HttpMethod::Patch).with_body(body)).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(path, RequestOptions::new(HttpMethod::Delete)).await
    }
}

impl fmt::Debug for ApiTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTransport")
            .field("base_url", &self.shared.config.base_url())
            .field("credentials", &self.shared.credentials)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedBackend};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PRODUCTS: &str = "/vendor/products";
    const REFRESH: &str = "/auth/vendor/refresh";
    const LOGIN: &str = "/auth/vendor/login";

    fn transport(backend: &Arc<ScriptedBackend>) -> ApiTransport {
        let config = ClientConfig::new("https://api.example.com");
        ApiTransport::new(config, Arc::clone(backend) as Arc<dyn HttpBackend>)
    }

    fn valid(token: &str) -> Credential {
        Credential::new(token.to_string(), Utc::now() + Duration::minutes(5))
    }

    fn ok(data: JsonValue) -> HttpResponse {
        HttpResponse::json(200, &json!({"success": true, "data": data, "message": ""}))
    }

    fn refreshed(token: &str) -> HttpResponse {
        HttpResponse::json(200, &json!({"access": token}))
    }

    fn failed(status: u16, message: &str) -> HttpResponse {
        HttpResponse::json(status, &json!({"success": false, "message": message}))
    }

    #[derive(Default)]
    struct CountingListener(AtomicUsize);

    impl ExpiryListener for CountingListener {
        fn session_expired(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn attaches_bearer_and_decodes_data() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, ok(json!(["lamp", "desk"])));
        let api = transport(&backend);
        api.credentials().set(valid("tok-1"));

        let products: Vec<String> = api.get(PRODUCTS).await.expect("request");

        assert_eq!(products, vec!["lamp", "desk"]);
        let sent = backend.requests_to(HttpMethod::Get, PRODUCTS);
        assert_eq!(sent[0].bearer_token(), Some("tok-1"));
        assert_eq!(sent[0].url, "https://api.example.com/vendor/products");
    }

    #[tokio::test]
    async fn json_body_and_custom_headers_are_sent() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Post, PRODUCTS, ok(json!({"id": 9})));
        let api = transport(&backend);
        api.credentials().set(valid("tok"));

        let options = RequestOptions::new(HttpMethod::Post)
            .with_body(json!({"name": "Lamp"}))
            .with_header("Idempotency-Key", "abc");
        let _: JsonValue = api.request(PRODUCTS, options).await.expect("request");

        let sent = &backend.requests_to(HttpMethod::Post, PRODUCTS)[0];
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.header("idempotency-key"), Some("abc"));
        let bytes = sent.body.clone().unwrap_or_default();
        let body: JsonValue = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body, json!({"name": "Lamp"}));
    }

    #[tokio::test]
    async fn network_failure_has_status_zero() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, Reply::network_failure("refused"));
        let api = transport(&backend);

        let err = api
            .get::<JsonValue>(PRODUCTS)
            .await
            .expect_err("should fail");
        assert_eq!(err.status(), 0);
        assert!(matches!(err, ApiError::Network { .. }));
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_message_and_session() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(
            HttpMethod::Get,
            PRODUCTS,
            failed(500, "Database unavailable"),
        );
        let api = transport(&backend);
        api.credentials().set(valid("tok"));

        let err = api
            .get::<JsonValue>(PRODUCTS)
            .await
            .expect_err("should fail");
        assert_eq!(err.status(), 500);
        assert_eq!(err.user_message(), "Database unavailable");
        assert!(api.credentials().get().is_some());
        assert_eq!(backend.calls(HttpMethod::Post, REFRESH), 0);
    }

    #[tokio::test]
    async fn login_401_is_returned_without_refresh() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Post, LOGIN, failed(401, "Invalid credentials"));
        let api = transport(&backend);
        api.credentials().set(valid("stale"));

        let err = api
            .post::<JsonValue>(LOGIN, json!({"email": "a@b.c", "password": "x"}))
            .await
            .expect_err("should fail");

        assert!(matches!(err, ApiError::Http { status: 401, .. }));
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(backend.calls(HttpMethod::Post, REFRESH), 0);
        let sent = backend.requests_to(HttpMethod::Post, LOGIN);
        assert!(sent[0].bearer_token().is_none());
    }

    #[tokio::test]
    async fn decorated_login_path_is_still_a_credential_endpoint() {
        const LOGIN_WITH_QUERY: &str = "/auth/vendor/login/?next=%2Fvendor";
        let backend = Arc::new(ScriptedBackend::new());
        let rejected = failed(401, "Invalid credentials");
        backend.push(HttpMethod::Post, LOGIN_WITH_QUERY, rejected);
        let api = transport(&backend);
        api.credentials().set(valid("stale"));

        let body = json!({"email": "a@b.c", "password": "x"});
        let err = api
            .post::<JsonValue>(LOGIN_WITH_QUERY, body)
            .await
            .expect_err("should fail");

        assert!(matches!(err, ApiError::Http { status: 401, .. }));
        assert_eq!(backend.calls(HttpMethod::Post, REFRESH), 0);
        assert!(api.credentials().get().is_some());
    }

    #[tokio::test]
    async fn single_401_refreshes_and_replays_with_new_token() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Get, PRODUCTS, ok(json!({"count": 3})));
        backend.push(HttpMethod::Post, REFRESH, refreshed("tok-2"));
        let api = transport(&backend);
        api.credentials().set(valid("tok-1"));

        let body: JsonValue = api.get(PRODUCTS).await.expect("replayed");

        assert_eq!(body, json!({"count": 3}));
        assert_eq!(backend.calls(HttpMethod::Post, REFRESH), 1);
        let sent = backend.requests_to(HttpMethod::Get, PRODUCTS);
        assert_eq!(sent[0].bearer_token(), Some("tok-1"));
        assert_eq!(sent[1].bearer_token(), Some("tok-2"));
        let stored = api.credentials().get().expect("credential");
        assert_eq!(stored.access_token(), "tok-2");
        let sent = backend.requests_to(HttpMethod::Post, REFRESH);
        assert!(sent[0].bearer_token().is_none());
    }

    #[tokio::test]
    async fn refresh_envelope_with_access_token_alias_is_accepted() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Get, PRODUCTS, ok(json!(null)));
        backend.push(
            HttpMethod::Post,
            REFRESH,
            ok(json!({"access_token": "tok-2"})),
        );
        let api = transport(&backend);

        api.get::<()>(PRODUCTS).await.expect("replayed");
        let stored = api.credentials().get().expect("credential");
        assert_eq!(stored.access_token(), "tok-2");
    }

    #[tokio::test]
    async fn replay_preserves_body_and_headers() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Post, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Post, PRODUCTS, ok(json!({"id": 1})));
        backend.push(HttpMethod::Post, REFRESH, refreshed("new"));
        let api = transport(&backend);
        api.credentials().set(valid("old"));

        let options = RequestOptions::new(HttpMethod::Post)
            .with_body(json!({"name": "Lamp", "price": 12}))
            .with_header("X-Request-Source", "dashboard");
        let _: JsonValue = api.request(PRODUCTS, options).await.expect("replayed");

        let sent = backend.requests_to(HttpMethod::Post, PRODUCTS);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].body, sent[1].body);
        assert_eq!(sent[1].header("x-request-source"), Some("dashboard"));
        assert_eq!(sent[1].bearer_token(), Some("new"));
    }

    #[tokio::test]
    async fn double_401_expires_session_without_second_refresh() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(
            HttpMethod::Post,
            REFRESH,
            HttpResponse::json(401, &json!({"detail": "Token is invalid or expired"})),
        );
        let api = transport(&backend);
        let listener = Arc::new(CountingListener::default());
        api.add_expiry_listener(listener.clone());
        api.credentials().set(valid("tok-1"));

        let err = api
            .get::<JsonValue>(PRODUCTS)
            .await
            .expect_err("should fail");

        assert!(err.is_auth_expired());
        assert_eq!(backend.calls(HttpMethod::Post, REFRESH), 1);
        assert_eq!(backend.calls(HttpMethod::Get, PRODUCTS), 1);
        assert!(api.credentials().get().is_none());
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_network_failure_is_auth_expired() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Post, REFRESH, Reply::network_failure("offline"));
        let api = transport(&backend);
        api.credentials().set(valid("tok-1"));

        let err = api
            .get::<JsonValue>(PRODUCTS)
            .await
            .expect_err("should fail");
        assert!(err.is_auth_expired());
        assert!(api.credentials().get().is_none());
    }

    #[tokio::test]
    async fn replay_401_is_terminal() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Post, REFRESH, refreshed("tok-2"));
        let api = transport(&backend);
        let listener = Arc::new(CountingListener::default());
        api.add_expiry_listener(listener.clone());
        api.credentials().set(valid("tok-1"));

        let err = api
            .get::<JsonValue>(PRODUCTS)
            .await
            .expect_err("should fail");

        assert!(err.is_auth_expired());
        assert_eq!(backend.calls(HttpMethod::Post, REFRESH), 1);
        assert_eq!(backend.calls(HttpMethod::Get, PRODUCTS), 2);
        assert!(api.credentials().get().is_none());
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replay_non_401_error_keeps_its_own_outcome() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(
            HttpMethod::Get,
            PRODUCTS,
            HttpResponse::json(404, &json!({"message": "Product not found"})),
        );
        backend.push(HttpMethod::Post, REFRESH, refreshed("tok-2"));
        let api = transport(&backend);
        api.credentials().set(valid("tok-1"));

        let err = api
            .get::<JsonValue>(PRODUCTS)
            .await
            .expect_err("should fail");

        assert!(matches!(err, ApiError::Http { status: 404, .. }));
        assert!(api.credentials().get().is_some());
    }

    #[tokio::test]
    async fn expired_credential_refreshes_before_sending() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Post, REFRESH, refreshed("fresh"));
        backend.push(HttpMethod::Get, PRODUCTS, ok(json!(1)));
        let api = transport(&backend);
        let stale = Credential::new("stale".to_string(), Utc::now() - Duration::seconds(1));
        api.credentials().set(stale);

        let value: u32 = api.get(PRODUCTS).await.expect("request");

        assert_eq!(value, 1);
        let sent = backend.requests_to(HttpMethod::Get, PRODUCTS);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bearer_token(), Some("fresh"));
    }

    #[tokio::test]
    async fn anonymous_401_attempts_cookie_refresh() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Get, PRODUCTS, HttpResponse::text(401, ""));
        backend.push(HttpMethod::Get, PRODUCTS, ok(json!("restored")));
        backend.push(HttpMethod::Post, REFRESH, refreshed("tok"));
        let api = transport(&backend);

        let value: String = api.get(PRODUCTS).await.expect("request");

        assert_eq!(value, "restored");
        let sent = backend.requests_to(HttpMethod::Get, PRODUCTS);
        assert!(sent[0].bearer_token().is_none());
    }

    #[tokio::test]
    async fn logout_endpoint_is_not_a_credential_endpoint() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(HttpMethod::Post, "/auth/vendor/logout", ok(json!(null)));
        let api = transport(&backend);
        api.credentials().set(valid("tok"));

        let logout = RequestOptions::new(HttpMethod::Post);
        api.request::<()>("/auth/vendor/logout", logout)
            .await
            .expect("logout");

        let sent = backend.requests_to(HttpMethod::Post, "/auth/vendor/logout");
        assert_eq!(sent[0].bearer_token(), Some("tok"));
    }
}
