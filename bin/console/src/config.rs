//! Console configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `STOREFRONT`, using `__` for nesting:
//!
//! ```text
//! STOREFRONT__CLIENT__BASE_URL=https://api.example.com/api
//! STOREFRONT__CLIENT__REQUEST_TIMEOUT_SECONDS=30
//! STOREFRONT__LOGIN__EMAIL=vendor@example.com
//! STOREFRONT__LOGIN__PASSWORD=...
//! STOREFRONT__GUARD__LOGIN_ROUTE=/vendor/login
//! ```
//!
//! See [`ClientConfig`] and [`GuardConfig`] for the nested sections.

use serde::Deserialize;
use std::fmt;
use storefront_client::ClientConfig;
use storefront_session::{GuardConfig, LoginCredentials};

/// Console configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// API transport configuration.
    pub client: ClientConfig,

    /// Route guard redirect targets.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Credentials used when no session can be restored.
    #[serde(default)]
    pub login: Option<LoginConfig>,

    /// Whether to sign out before exiting.
    #[serde(default = "default_logout_on_exit")]
    pub logout_on_exit: bool,
}

fn default_logout_on_exit() -> bool {
    true
}

/// Login credentials from the environment.
#[derive(Clone, Deserialize)]
pub struct LoginConfig {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl LoginConfig {
    /// Returns the credentials to submit.
    #[must_use]
    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("STOREFRONT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl ConsoleConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ConsoleConfig, config::ConfigError> {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ConsoleConfig::load(environment().source(Some(source)))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config =
            load(&[("STOREFRONT__CLIENT__BASE_URL", "https://api.example.com")]).expect("load");

        assert_eq!(config.client.base_url(), "https://api.example.com");
        assert_eq!(config.client.endpoints().login, "/auth/vendor/login");
        assert!(config.client.request_timeout().is_none());
        assert_eq!(config.guard, GuardConfig::default());
        assert!(config.login.is_none());
        assert!(config.logout_on_exit);
    }

    #[test]
    fn nested_values_are_parsed() {
        let config = load(&[
            ("STOREFRONT__CLIENT__BASE_URL", "https://api.example.com"),
            ("STOREFRONT__CLIENT__REQUEST_TIMEOUT_SECONDS", "15"),
            ("STOREFRONT__CLIENT__ENDPOINTS__PROFILE", "/vendor/me"),
            ("STOREFRONT__LOGIN__EMAIL", "v@x.com"),
            ("STOREFRONT__LOGIN__PASSWORD", "secret"),
            ("STOREFRONT__GUARD__UNAUTHORIZED_ROUTE", "/denied"),
            ("STOREFRONT__LOGOUT_ON_EXIT", "false"),
        ])
        .expect("load");

        assert_eq!(
            config.client.request_timeout(),
            Some(std::time::Duration::from_secs(15))
        );
        assert_eq!(config.client.endpoints().profile, "/vendor/me");
        assert_eq!(config.guard.unauthorized_route, "/denied");
        assert_eq!(config.guard.login_route, "/vendor/login");
        assert!(!config.logout_on_exit);

        let login = config.login.expect("login section");
        assert_eq!(login.credentials().email, "v@x.com");
        assert!(!format!("{login:?}").contains("secret"));
    }

    #[test]
    fn missing_base_url_is_an_error() {
        assert!(load(&[("STOREFRONT__LOGOUT_ON_EXIT", "true")]).is_err());
    }
}
