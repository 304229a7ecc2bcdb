//! Client facade.
//!
//! Composes the PKCE utility, OAuth2 client, token manager, and request
//! pipeline into the login / logout / reset / query surface. One facade
//! instance manages one user session.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::api::{ApiClient, QueryOptions};
use crate::auth::oauth::OAuth2Client;
use crate::auth::pkce::PkceChallenge;
use crate::auth::token_manager::TokenManager;
use crate::config::ClientConfig;
use crate::error::{AuthError, Error};
use crate::store::cache::ResponseCache;
use crate::store::CredentialStore;

/// Client for an OAuth2 authorization-code-with-PKCE provider and the
/// REST API behind it.
pub struct Client {
    config: ClientConfig,
    store: Option<Arc<dyn CredentialStore>>,
    cache: Option<Arc<dyn ResponseCache>>,
    oauth: Arc<OAuth2Client>,
    api: ApiClient,
    token_manager: Arc<TokenManager>,
    /// Shared cancellation handle for all in-flight requests of the
    /// current session; replaced wholesale on reset.
    cancel: Mutex<CancellationToken>,
    /// Formatted snapshot of the last unrecovered failure.
    last_error: Mutex<Option<String>>,
}

impl Client {
    /// Create a client, loading any persisted token.
    ///
    /// A pre-supplied `config.token` takes precedence over the store.
    /// With `auto_login` set, a pending authorization code is exchanged
    /// immediately when no usable token is found; exchange failures
    /// propagate from here.
    pub async fn new(
        config: ClientConfig,
        store: Option<Arc<dyn CredentialStore>>,
        cache: Option<Arc<dyn ResponseCache>>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let oauth = Arc::new(OAuth2Client::new(&config)?);
        let api = ApiClient::new(&config, cache.clone())?;
        let token_manager = Arc::new(TokenManager::new(
            store.clone(),
            config.authorization_code.clone(),
            config.hooks.on_authenticated_change.clone(),
        ));

        let client = Self {
            config,
            store,
            cache,
            oauth,
            api,
            token_manager,
            cancel: Mutex::new(CancellationToken::new()),
            last_error: Mutex::new(None),
        };

        if let Some(token) = client.config.token.clone() {
            client.token_manager.restore(Some(token)).await;
        } else if client.store.is_some() {
            client.token_manager.load_from_store().await;

            if client.config.auto_login && !client.token_manager.has_valid_token().await {
                client.set_loading(true);
                let result = client.token_manager.exchange_code(&client.oauth).await;
                client.set_loading(false);

                if let Err(e) = result {
                    client.record_error(&e).await;
                    return Err(e);
                }
            }
        }

        Ok(client)
    }

    /// Whether a token is currently held. Derived, never stored.
    pub async fn is_authenticated(&self) -> bool {
        self.token_manager.is_authenticated().await
    }

    /// Whether a store already holds a token, without building a client.
    pub async fn is_authenticated_initial(store: &dyn CredentialStore) -> bool {
        store.get_token().await.is_some()
    }

    /// The last unrecovered failure, cleared on [`Client::reset`].
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Begin the authorization-code flow.
    ///
    /// Generates a PKCE pair, persists the verifier, and returns the
    /// authorization URL the host must navigate the browser to. The
    /// provider redirects back to `redirect_uri` with an authorization
    /// code for a follow-up client construction.
    pub async fn login(&self) -> Result<Url, Error> {
        let result = self.login_inner().await;

        if let Err(e) = &result {
            self.record_error(e).await;
        }

        result
    }

    async fn login_inner(&self) -> Result<Url, Error> {
        if self.is_authenticated().await {
            return Err(AuthError::AlreadyAuthenticated.into());
        }

        let store = self
            .store
            .clone()
            .ok_or_else(|| Error::Config("No credential store configured".into()))?;

        self.reset().await;
        self.set_loading(true);

        let pkce = PkceChallenge::new();
        store.set_verifier(&pkce.verifier).await;

        let url = self.oauth.authorize_url(&pkce);

        self.set_loading(false);
        info!("Login flow started");

        Ok(url)
    }

    /// End the session: cancel in-flight work, delete the token and any
    /// leftover verifier.
    pub async fn logout(&self) -> Result<(), Error> {
        if !self.is_authenticated().await {
            let e = Error::from(AuthError::NotAuthenticated);
            self.record_error(&e).await;
            return Err(e);
        }

        self.reset().await;
        self.token_manager.clear().await;

        if let Some(store) = &self.store {
            store.remove_verifier().await;
        }

        info!("Logged out");

        Ok(())
    }

    /// Cancel all in-flight requests, reload the token from the store,
    /// and clear the recorded error.
    ///
    /// Used internally before login/logout, and externally to
    /// resynchronize after the store was changed behind this instance.
    pub async fn reset(&self) {
        let previous = {
            let mut guard = self.cancel.lock().await;
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        previous.cancel();

        self.token_manager.load_from_store().await;

        *self.last_error.lock().await = None;
    }

    /// Perform an authenticated request against the resource API.
    pub async fn query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: QueryOptions,
    ) -> Result<T, Error> {
        let cancel = self.cancel.lock().await.clone();

        let result = self
            .api
            .query(method, path, options, &self.token_manager, &self.oauth, &cancel)
            .await;

        if let Err(e) = &result {
            self.record_error(e).await;
        }

        result
    }

    /// Replace the configuration wholesale, rebuilding the provider and
    /// API clients. The current token carries over.
    pub async fn set_config(&mut self, config: ClientConfig) -> Result<(), Error> {
        config.validate()?;

        self.oauth = Arc::new(OAuth2Client::new(&config)?);
        self.api = ApiClient::new(&config, self.cache.clone())?;

        let current = self.token_manager.current_token().await;
        let token_manager = Arc::new(TokenManager::new(
            self.store.clone(),
            config.authorization_code.clone(),
            config.hooks.on_authenticated_change.clone(),
        ));
        token_manager.restore(current).await;

        self.token_manager = token_manager;
        self.config = config;

        Ok(())
    }

    async fn record_error(&self, error: &Error) {
        if let Some(hook) = &self.config.hooks.on_error {
            hook(error);
        }

        *self.last_error.lock().await = Some(error.to_string());
    }

    fn set_loading(&self, is_loading: bool) {
        if let Some(hook) = &self.config.hooks.on_loading_change {
            hook(is_loading);
        }
    }
}
