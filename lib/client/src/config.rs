//! API client configuration.
//!
//! Fields with defaults can be omitted when loading from environment
//! variables.

use serde::{Deserialize, Serialize};

/// Backend paths used by the session core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
    /// Credential login. Default: "/auth/vendor/login"
    #[serde(default = "default_login")]
    pub login: String,
    /// Cookie-authenticated access refresh. Default: "/auth/vendor/refresh"
    #[serde(default = "default_refresh")]
    pub refresh: String,
    /// Best-effort logout. Default: "/auth/vendor/logout"
    #[serde(default = "default_logout")]
    pub logout: String,
    /// "Who am I" used to restore a session. Default: "/vendor/profile"
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_login() -> String {
    "/auth/vendor/login".to_string()
}

fn default_refresh() -> String {
    "/auth/vendor/refresh".to_string()
}

fn default_logout() -> String {
    "/auth/vendor/logout".to_string()
}

fn default_profile() -> String {
    "/vendor/profile".to_string()
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            login: default_login(),
            refresh: default_refresh(),
            logout: default_logout(),
            profile: default_profile(),
        }
    }
}

/// Configuration for [`ApiTransport`](crate::ApiTransport).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash (e.g., "https://api.example.com/api").
    base_url: String,
    /// Endpoint paths.
    #[serde(default)]
    endpoints: ApiEndpoints,
    /// Access lifetime assumed when the token carries no readable `exp`.
    /// Default: 300
    #[serde(default = "default_access_ttl_seconds")]
    default_access_ttl_seconds: i64,
    /// A credential this close to expiry is treated as already expired.
    /// Default: 10
    #[serde(default = "default_expiry_skew_seconds")]
    expiry_skew_seconds: i64,
    /// Optional whole-request timeout applied by the HTTP backend.
    /// Default: none
    #[serde(default)]
    request_timeout_seconds: Option<u64>,
    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    user_agent: String,
}

fn default_access_ttl_seconds() -> i64 {
    300
}

fn default_expiry_skew_seconds() -> i64 {
    10
}

fn default_user_agent() -> String {
    concat!("storefront-client/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder(base_url).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the endpoint paths.
    #[must_use]
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Returns the fallback access lifetime.
    #[must_use]
    pub fn default_access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.default_access_ttl_seconds)
    }

    /// Returns the expiry skew.
    #[must_use]
    pub fn expiry_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiry_skew_seconds)
    }

    /// Returns the request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_seconds
            .map(std::time::Duration::from_secs)
    }

    /// Returns the User-Agent string.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Returns true for endpoints whose 401 must not trigger a refresh.
    ///
    /// `path` may be relative or absolute under the base URL, and may carry
    /// a query string or a trailing slash.
    #[must_use]
    pub fn is_credential_endpoint(&self, path: &str) -> bool {
        let path = self.endpoint_path(path);
        path == self.endpoint_path(&self.endpoints.login)
            || path == self.endpoint_path(&self.endpoints.refresh)
    }

    /// Strips the base URL, query, fragment and surrounding slashes.
    fn endpoint_path<'a>(&self, path: &'a str) -> &'a str {
        let base = self.base_url.trim_end_matches('/');
        let path = path
            .strip_prefix(base)
            .filter(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
            .unwrap_or(path);
        let path = path.find(['?', '#']).map_or(path, |end| &path[..end]);
        path.trim_matches('/')
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Creates a builder with defaults.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                endpoints: ApiEndpoints::default(),
                default_access_ttl_seconds: default_access_ttl_seconds(),
                expiry_skew_seconds: default_expiry_skew_seconds(),
                request_timeout_seconds: None,
                user_agent: default_user_agent(),
            },
        }
    }

    /// Sets the endpoint paths.
    #[must_use]
    pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    /// Sets the fallback access lifetime in seconds.
    #[must_use]
    pub fn default_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.config.default_access_ttl_seconds = seconds;
        self
    }

    /// Sets the expiry skew in seconds.
    #[must_use]
    pub fn expiry_skew_seconds(mut self, seconds: i64) -> Self {
        self.config.expiry_skew_seconds = seconds;
        self
    }

    /// Sets a whole-request timeout.
    #[must_use]
    pub fn request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.request_timeout_seconds = Some(seconds);
        self
    }

    /// Sets the User-Agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Builds the `ClientConfig`.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
