//! In-memory credential store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::CredentialStore;
use crate::auth::token_manager::TokenRecord;

#[derive(Debug, Default)]
struct Slots {
    token: Option<TokenRecord>,
    verifier: Option<String>,
}

/// In-memory [`CredentialStore`].
///
/// The default backend for hosts without durable storage, and the test
/// double for everything in this crate. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<Slots>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_token(&self) -> Option<TokenRecord> {
        self.slots.lock().await.token.clone()
    }

    async fn set_token(&self, token: &TokenRecord) {
        self.slots.lock().await.token = Some(token.clone());
    }

    async fn remove_token(&self) {
        self.slots.lock().await.token = None;
    }

    async fn get_verifier(&self) -> Option<String> {
        self.slots.lock().await.verifier.clone()
    }

    async fn set_verifier(&self, verifier: &str) {
        self.slots.lock().await.verifier = Some(verifier.to_string());
    }

    async fn remove_verifier(&self) {
        self.slots.lock().await.verifier = None;
    }
}
