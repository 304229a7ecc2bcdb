//! OAuth2 client with PKCE support.
//!
//! Stateless network actions against the configured provider endpoints:
//! authorize-URL construction, authorization-code exchange, and refresh.

use std::time::Duration;

use url::Url;

use crate::auth::pkce::PkceChallenge;
use crate::config::{ClientConfig, EndpointConfig};
use crate::error::{AuthError, Error};

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// OAuth2 client for the configured provider.
pub struct OAuth2Client {
    client_id: String,
    redirect_uri: String,
    scope: String,
    endpoints: EndpointConfig,
    http_client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new OAuth2 client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope_string(),
            endpoints: config.endpoints.clone(),
            http_client,
        })
    }

    /// Build the authorization URL for browser-based sign-in.
    ///
    /// The host application navigates the browser here; the provider
    /// redirects back to `redirect_uri` with an authorization code.
    pub fn authorize_url(&self, pkce: &PkceChallenge) -> Url {
        let mut url = self.endpoints.authorize_url.clone();

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", &pkce.challenge);

        url
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", pkce_verifier),
        ];

        let response = self
            .http_client
            .post(self.endpoints.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging without exposing them to the caller
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed: HTTP {} - {}", status, error_body);
            return Err(AuthError::TokenExchangeFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        Ok(token_response)
    }

    /// Refresh an access token using a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .http_client
            .post(self.endpoints.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token refresh failed: HTTP {} - {}", status, error_body);
            return Err(AuthError::TokenRefreshFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        Ok(token_response)
    }
}

/// Token response from the provider's token endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// Absent on refresh responses from providers that do not rotate.
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server_uri: &str) -> ClientConfig {
        let endpoints = EndpointConfig::new(
            &format!("{}/authorize", server_uri),
            &format!("{}/api/token", server_uri),
            &format!("{}/v1/", server_uri),
        )
        .unwrap();

        ClientConfig::new(
            "client-id",
            "https://app.example.com/callback",
            vec!["user-read".into(), "user-modify".into()],
            endpoints,
        )
    }

    #[test]
    fn test_authorize_url_parameters() {
        let config = config_for("https://accounts.example.com");
        let oauth = OAuth2Client::new(&config).unwrap();
        let pkce = PkceChallenge::new();

        let url = oauth.authorize_url(&pkce);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("client_id".into(), "client-id".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("scope".into(), "user-read user-modify".into())));
        assert!(pairs.contains(&("code_challenge_method".into(), "S256".into())));
        assert!(pairs.contains(&("code_challenge".into(), pkce.challenge.clone())));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier=verifier-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-1",
                "scope": "user-read",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = OAuth2Client::new(&config_for(&server.uri())).unwrap();
        let response = oauth.exchange_code("auth-code", "verifier-1").await.unwrap();

        assert_eq!(response.access_token, "access-1");
        assert_eq!(response.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(response.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_exchange_code_provider_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let oauth = OAuth2Client::new(&config_for(&server.uri())).unwrap();
        let result = oauth.exchange_code("bad-code", "verifier-1").await;

        assert!(matches!(result, Err(AuthError::TokenExchangeFailed(s)) if s == "HTTP 400"));
    }

    #[tokio::test]
    async fn test_refresh_token_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-2",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-read",
            })))
            .mount(&server)
            .await;

        let oauth = OAuth2Client::new(&config_for(&server.uri())).unwrap();
        let response = oauth.refresh_token("refresh-1").await.unwrap();

        assert_eq!(response.access_token, "access-2");
        // Provider did not rotate; the response has no refresh token
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_provider_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let oauth = OAuth2Client::new(&config_for(&server.uri())).unwrap();
        let result = oauth.refresh_token("stale").await;

        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(s)) if s == "HTTP 401"));
    }
}
