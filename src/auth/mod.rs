//! OAuth2 authorization-code-with-PKCE authentication.
//!
//! Provides PKCE challenge generation, the provider-facing OAuth2 client,
//! and token lifecycle management with automatic refresh.

pub mod oauth;
pub mod pkce;
pub mod token_manager;
