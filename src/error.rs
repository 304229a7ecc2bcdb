//! Error types for the client library.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level client error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Authentication and token lifecycle errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No authorization code found")]
    MissingAuthorizationCode,

    #[error("No code verifier found")]
    MissingVerifier,

    #[error("No token found")]
    NoToken,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),
}

/// Resource API request errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Empty response body")]
    EmptyResponse,

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if this error means the stored credentials are beyond
    /// repair and the host should sign the user out.
    ///
    /// A failed refresh implies the refresh token was revoked or has
    /// expired; retrying cannot recover, so the host is expected to call
    /// [`Client::logout`](crate::Client::logout) (or clear its stored
    /// session) and start a fresh login. Hosts typically check this in
    /// their [`ErrorHook`](crate::ErrorHook).
    pub fn requires_sign_out(&self) -> bool {
        matches!(self, Self::Auth(AuthError::TokenRefreshFailed(_)))
    }
}
