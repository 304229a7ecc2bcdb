//! Token lifecycle management.
//!
//! The [`TokenManager`] exclusively owns the in-memory token record and is
//! the single choke point authenticated requests obtain their access token
//! through: [`TokenManager::ensure_valid_access_token`] exchanges a pending
//! authorization code when no token exists, refreshes when the token has
//! expired, and otherwise hands back the cached access token without any
//! network call. The token mutex is held across the decision and the
//! provider call, so concurrent callers that observe an expired token wait
//! on the same refresh instead of issuing duplicates.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::auth::oauth::{OAuth2Client, TokenResponse};
use crate::config::AuthenticatedChangeHook;
use crate::error::{AuthError, Error};
use crate::store::CredentialStore;

/// The current token: bearer credential, refresh credential, and expiry.
///
/// Secrets are zeroized when the record is dropped.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenRecord {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    pub refresh_token: String,
    /// The moment past which the access token must no longer be used.
    #[zeroize(skip)]
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// A token expiring exactly now counts as expired, erring toward
    /// refreshing early rather than sending a doomed request.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Build a record from a provider token response.
    ///
    /// Returns `None` when the response carries no refresh token and no
    /// previous one is available to retain.
    fn from_response(response: TokenResponse, previous_refresh: Option<&str>) -> Option<Self> {
        let refresh_token = response
            .refresh_token
            .or_else(|| previous_refresh.map(String::from))?;

        Some(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            scope: response.scope,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in as i64),
        })
    }
}

/// Owns the token record and decides when to exchange or refresh.
pub struct TokenManager {
    store: Option<Arc<dyn CredentialStore>>,
    token: Mutex<Option<TokenRecord>>,
    /// Pending authorization code from the provider redirect; single-use.
    authorization_code: Mutex<Option<String>>,
    on_authenticated_change: Option<AuthenticatedChangeHook>,
}

impl TokenManager {
    /// Create a new token manager.
    pub fn new(
        store: Option<Arc<dyn CredentialStore>>,
        authorization_code: Option<String>,
        on_authenticated_change: Option<AuthenticatedChangeHook>,
    ) -> Self {
        Self {
            store,
            token: Mutex::new(None),
            authorization_code: Mutex::new(authorization_code),
            on_authenticated_change,
        }
    }

    /// Return a non-expired access token, or fail loudly.
    ///
    /// No token: exchanges the pending authorization code. Expired token:
    /// refreshes. Otherwise the cached access token is returned with no
    /// network call.
    pub async fn ensure_valid_access_token(&self, oauth: &OAuth2Client) -> Result<String, Error> {
        let mut guard = self.token.lock().await;

        let expired = match guard.as_ref() {
            Some(token) if !token.is_expired() => return Ok(token.access_token.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.refresh_locked(&mut guard, oauth).await
        } else {
            self.exchange_locked(&mut guard, oauth).await
        }
    }

    /// Exchange the pending authorization code for a token.
    pub async fn exchange_code(&self, oauth: &OAuth2Client) -> Result<String, Error> {
        let mut guard = self.token.lock().await;
        self.exchange_locked(&mut guard, oauth).await
    }

    /// Refresh the current token.
    pub async fn refresh(&self, oauth: &OAuth2Client) -> Result<String, Error> {
        let mut guard = self.token.lock().await;
        self.refresh_locked(&mut guard, oauth).await
    }

    /// Whether a token is present (expired or not).
    pub async fn is_authenticated(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// Whether a non-expired token is present.
    pub async fn has_valid_token(&self) -> bool {
        matches!(self.token.lock().await.as_ref(), Some(t) if !t.is_expired())
    }

    /// Snapshot of the current token record.
    pub async fn current_token(&self) -> Option<TokenRecord> {
        self.token.lock().await.clone()
    }

    /// Set the in-memory token without touching the store or firing hooks.
    ///
    /// Used for pre-supplied tokens and for resynchronizing after a reset.
    pub async fn restore(&self, token: Option<TokenRecord>) {
        *self.token.lock().await = token;
    }

    /// Replace the in-memory token with whatever the store holds.
    pub async fn load_from_store(&self) {
        let token = match &self.store {
            Some(store) => store.get_token().await,
            None => None,
        };
        *self.token.lock().await = token;
    }

    /// Adopt a token: memory, store, and the authenticated-change hook.
    pub(crate) async fn adopt(&self, record: TokenRecord) {
        let mut guard = self.token.lock().await;
        self.set_locked(&mut guard, record).await;
    }

    /// Drop the token from memory and store; fires the hook with `false`.
    pub async fn clear(&self) {
        *self.token.lock().await = None;

        if let Some(store) = &self.store {
            store.remove_token().await;
        }

        self.notify(false);
    }

    async fn exchange_locked(
        &self,
        slot: &mut Option<TokenRecord>,
        oauth: &OAuth2Client,
    ) -> Result<String, Error> {
        let code = self
            .authorization_code
            .lock()
            .await
            .take()
            .ok_or(AuthError::MissingAuthorizationCode)?;

        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::Config("No credential store configured".into()))?;

        let verifier = store
            .get_verifier()
            .await
            .ok_or(AuthError::MissingVerifier)?;

        // Single-use: the verifier is gone before the exchange is attempted,
        // so a failed exchange can never silently reuse it.
        store.remove_verifier().await;

        let response = oauth.exchange_code(&code, &verifier).await?;

        let record = TokenRecord::from_response(response, None).ok_or_else(|| {
            AuthError::TokenExchangeFailed("response missing refresh_token".into())
        })?;

        let access_token = record.access_token.clone();
        info!("Authorization code exchanged, token expires at {}", record.expires_at);

        self.set_locked(slot, record).await;

        Ok(access_token)
    }

    async fn refresh_locked(
        &self,
        slot: &mut Option<TokenRecord>,
        oauth: &OAuth2Client,
    ) -> Result<String, Error> {
        let refresh_token = slot
            .as_ref()
            .ok_or(AuthError::NoToken)?
            .refresh_token
            .clone();

        let response = oauth.refresh_token(&refresh_token).await?;

        // The previous refresh token is retained when the provider does not
        // rotate it; `from_response` cannot fail here.
        let record = TokenRecord::from_response(response, Some(&refresh_token))
            .ok_or_else(|| AuthError::TokenRefreshFailed("response missing tokens".into()))?;

        let access_token = record.access_token.clone();
        info!("Token refreshed, expires at {}", record.expires_at);

        self.set_locked(slot, record).await;

        Ok(access_token)
    }

    async fn set_locked(&self, slot: &mut Option<TokenRecord>, record: TokenRecord) {
        if let Some(store) = &self.store {
            store.set_token(&record).await;
        }

        *slot = Some(record);

        self.notify(true);
    }

    fn notify(&self, is_authenticated: bool) {
        if let Some(hook) = &self.on_authenticated_change {
            hook(is_authenticated);
        }
    }
}
