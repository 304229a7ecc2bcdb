//! Credential persistence.
//!
//! The client never touches a concrete storage backend directly; it talks
//! to the [`CredentialStore`] capability, which hosts implement over local
//! storage, indexed storage, a keychain, or anything else key-value
//! shaped. Memory stays authoritative within a session; the store merely
//! mirrors the token so it survives reloads.

pub mod cache;
mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::auth::token_manager::TokenRecord;

/// Logical key for the persisted token record, for key-value backends.
pub const TOKEN_KEY: &str = "pkce-web-client.token";

/// Logical key for the pending PKCE verifier, for key-value backends.
pub const VERIFIER_KEY: &str = "pkce-web-client.pkceverifier";

/// Persistence capability for the token record and the pending verifier.
///
/// Backend failures are indistinguishable from absence: every read returns
/// `Option`, and writes that fail are silently lost. Implementations must
/// not panic.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The persisted token record, if any.
    async fn get_token(&self) -> Option<TokenRecord>;

    /// Persist the token record.
    async fn set_token(&self, token: &TokenRecord);

    /// Delete the persisted token record.
    async fn remove_token(&self);

    /// The pending PKCE verifier, if any.
    async fn get_verifier(&self) -> Option<String>;

    /// Persist the pending PKCE verifier.
    async fn set_verifier(&self, verifier: &str);

    /// Delete the pending PKCE verifier.
    async fn remove_verifier(&self);
}
