//! Client configuration.
//!
//! Immutable per-instance configuration: provider endpoints, OAuth client
//! settings, optional pre-supplied credentials, and host notification hooks.
//! Replaced only wholesale via [`crate::Client::set_config`].

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::auth::token_manager::TokenRecord;
use crate::error::Error;

/// Hook invoked when the authenticated state flips.
pub type AuthenticatedChangeHook = Arc<dyn Fn(bool) + Send + Sync>;

/// Hook invoked when an unrecovered error is recorded.
pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Hook invoked around long-running login/exchange work.
pub type LoadingChangeHook = Arc<dyn Fn(bool) + Send + Sync>;

/// Provider and resource API endpoints.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Authorization endpoint the browser is redirected to.
    pub authorize_url: Url,
    /// Token endpoint for code exchange and refresh.
    pub token_url: Url,
    /// Base URL all resource requests are built against.
    pub api_base_url: Url,
}

impl EndpointConfig {
    /// Parse endpoint URLs from strings.
    pub fn new(authorize_url: &str, token_url: &str, api_base_url: &str) -> Result<Self, Error> {
        let parse = |name: &str, value: &str| {
            Url::parse(value).map_err(|e| Error::Config(format!("Invalid {}: {}", name, e)))
        };

        Ok(Self {
            authorize_url: parse("authorize_url", authorize_url)?,
            token_url: parse("token_url", token_url)?,
            api_base_url: parse("api_base_url", api_base_url)?,
        })
    }
}

/// Host notification hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Called with the new state whenever authentication flips on or off.
    pub on_authenticated_change: Option<AuthenticatedChangeHook>,
    /// Called with every error recorded by the facade.
    pub on_error: Option<ErrorHook>,
    /// Called with `true` before login/exchange work and `false` after.
    pub on_loading_change: Option<LoadingChangeHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field(
                "on_authenticated_change",
                &self.on_authenticated_change.is_some(),
            )
            .field("on_error", &self.on_error.is_some())
            .field("on_loading_change", &self.on_loading_change.is_some())
            .finish()
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// Redirect URI registered with the provider.
    pub redirect_uri: String,
    /// Requested scopes, joined by spaces on the wire.
    pub scopes: Vec<String>,
    /// Provider and API endpoints.
    pub endpoints: EndpointConfig,
    /// Authorization code from the provider redirect, if one is pending.
    pub authorization_code: Option<String>,
    /// Pre-supplied token, bypassing the persisted one.
    pub token: Option<TokenRecord>,
    /// Exchange a pending authorization code during construction when no
    /// usable token is found.
    pub auto_login: bool,
    /// Host notification hooks.
    pub hooks: Hooks,
}

impl ClientConfig {
    /// Create a configuration with the required fields.
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
        endpoints: EndpointConfig,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            endpoints,
            authorization_code: None,
            token: None,
            auto_login: false,
            hooks: Hooks::default(),
        }
    }

    /// Set the pending authorization code.
    pub fn with_authorization_code(mut self, code: impl Into<String>) -> Self {
        self.authorization_code = Some(code.into());
        self
    }

    /// Supply a token directly instead of loading it from the store.
    pub fn with_token(mut self, token: TokenRecord) -> Self {
        self.token = Some(token);
        self
    }

    /// Enable the constructor-time code exchange.
    pub fn with_auto_login(mut self, auto_login: bool) -> Self {
        self.auto_login = auto_login;
        self
    }

    /// Install host notification hooks.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// The scope list as sent on the wire.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }

        if self.redirect_uri.is_empty() {
            return Err(Error::Config("redirect_uri must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_endpoints() -> EndpointConfig {
        EndpointConfig::new(
            "https://accounts.example.com/authorize",
            "https://accounts.example.com/api/token",
            "https://api.example.com/v1/",
        )
        .unwrap()
    }

    #[test]
    fn test_validate_rejects_empty_client_id() {
        let config = ClientConfig::new("", "https://app.example.com/callback", vec![], test_endpoints());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_redirect_uri() {
        let config = ClientConfig::new("client", "", vec![], test_endpoints());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let result = EndpointConfig::new("not a url", "https://a.example.com", "https://b.example.com");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_scope_string() {
        let config = ClientConfig::new(
            "client",
            "https://app.example.com/callback",
            vec!["user-read".into(), "user-modify".into()],
            test_endpoints(),
        );
        assert_eq!(config.scope_string(), "user-read user-modify");
    }
}
