//! Client library for OAuth2 authorization-code-with-PKCE providers.
//!
//! Authenticates against a provider's authorize/token endpoints and
//! performs authenticated requests against the REST API behind it,
//! transparently handling token acquisition, persistence, expiry,
//! refresh, and rate-limit retries.
//!
//! The host supplies a [`CredentialStore`] capability for persistence
//! (and optionally a [`ResponseCache`]); [`Client`] composes the PKCE
//! utility, the OAuth2 client, and the token manager around them:
//!
//! ```no_run
//! use std::sync::Arc;
//! use pkce_web_client::{Client, ClientConfig, CredentialStore, EndpointConfig, MemoryStore};
//!
//! # async fn run() -> Result<(), pkce_web_client::Error> {
//! let endpoints = EndpointConfig::new(
//!     "https://accounts.example.com/authorize",
//!     "https://accounts.example.com/api/token",
//!     "https://api.example.com/v1/",
//! )?;
//! let config = ClientConfig::new(
//!     "client-id",
//!     "https://app.example.com/callback",
//!     vec!["user-read".into()],
//!     endpoints,
//! );
//!
//! let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::new());
//! let client = Client::new(config, Some(store), None).await?;
//!
//! // Navigate the browser to this URL; the provider redirects back with
//! // an authorization code for the next construction.
//! let authorize_url = client.login().await?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use api::{ApiClient, QueryOptions};
pub use auth::oauth::{OAuth2Client, TokenResponse};
pub use auth::pkce::{derive_challenge, generate_verifier, PkceChallenge};
pub use auth::token_manager::{TokenManager, TokenRecord};
pub use client::Client;
pub use config::{
    AuthenticatedChangeHook, ClientConfig, EndpointConfig, ErrorHook, Hooks, LoadingChangeHook,
};
pub use error::{ApiError, AuthError, Error};
pub use store::cache::{MemoryCache, ResponseCache};
pub use store::{CredentialStore, MemoryStore};

pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
