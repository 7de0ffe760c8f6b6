//! OAuth 2.0 client with PKCE.
//!
//! Implements the three protocol operations the flow needs: building the
//! authorization URL (RFC 6749 + RFC 7636 S256 challenge), exchanging an
//! authorization code, and refreshing an access token. Every request runs
//! exactly once; a failed token call surfaces to the flow, which decides
//! what it means.
//!
//! Sensitive values (tokens, codes, verifiers) are never logged.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientSecrets;
use crate::error::{AuthError, Result};

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// The verifier stays local for the lifetime of one handshake; only the
/// derived challenge is sent to the authorization server. The `state` value
/// rides along for CSRF protection of the callback.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// Generate a fresh verifier (32 random bytes) and state (16 random
    /// bytes), both URL-safe base64 without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        // 43-128 characters per RFC 7636
        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// S256 challenge: BASE64URL(SHA256(verifier)).
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful response from the token endpoint.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    /// Space-separated granted scopes, when the endpoint echoes them.
    pub scope: Option<String>,
}

/// Wire form of the token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    fn into_grant(self) -> TokenGrant {
        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            scope: self.scope,
        }
    }
}

/// OAuth 2.0 client for a single registered application.
pub struct OAuthClient {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    http: Arc<dyn HttpClient>,
}

impl OAuthClient {
    pub fn new(secrets: ClientSecrets, scopes: Vec<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            secrets,
            scopes,
            http,
        }
    }

    /// Scopes this client requests during authorization.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Build the authorization URL the user must visit, together with the
    /// PKCE verifier to keep for the code exchange.
    pub fn authorize_url(&self, redirect_uri: &str) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.secrets.auth_uri)
            .map_err(|e| AuthError::InvalidEndpoint(format!("{}: {}", self.secrets.auth_uri, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.secrets.client_id);
            query.append_pair("redirect_uri", redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
            // Without offline access Google never issues a refresh token.
            query.append_pair("access_type", "offline");
        }

        debug!("built authorization URL");
        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for a token grant.
    ///
    /// `state` is the value the callback carried; it must match the verifier
    /// generated with the authorization URL.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
        redirect_uri: &str,
    ) -> Result<TokenGrant> {
        if state != verifier.state() {
            warn!("callback state does not match the authorization request");
            return Err(AuthError::StateMismatch);
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.secrets.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(secret) = self.secrets.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        debug!("exchanging authorization code for tokens");
        let response = self.post_form(&params).await?;

        if !response.is_success() {
            let status = response.status;
            let message = response
                .text()
                .unwrap_or_else(|_| "unreadable error response".to_string());
            warn!(status, "authorization code exchange failed");
            return Err(AuthError::TokenEndpoint { status, message });
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Protocol(format!("bad token response: {}", e)))?;

        info!(expires_in = token.expires_in, "authorization code exchanged");
        Ok(token.into_grant())
    }

    /// Refresh an access token.
    ///
    /// A 4xx answer means the refresh token is dead (revoked or expired) and
    /// maps to [`AuthError::RefreshRejected`]; anything else that fails is a
    /// transport or server problem and does not condemn the token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
        ];
        if let Some(secret) = self.secrets.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        debug!("refreshing access token");
        let response = self.post_form(&params).await?;

        if response.is_client_error() {
            let message = response
                .text()
                .unwrap_or_else(|_| "unreadable error response".to_string());
            warn!(status = response.status, "refresh token rejected");
            return Err(AuthError::RefreshRejected(format!(
                "{}: {}",
                response.status, message
            )));
        }

        if !response.is_success() {
            let status = response.status;
            let message = response
                .text()
                .unwrap_or_else(|_| "unreadable error response".to_string());
            warn!(status, "token refresh failed");
            return Err(AuthError::TokenEndpoint { status, message });
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Protocol(format!("bad token response: {}", e)))?;

        info!(expires_in = token.expires_in, "access token refreshed");
        Ok(token.into_grant())
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<HttpResponse> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::Protocol(format!("failed to encode token request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, self.secrets.token_uri.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body));

        self.http
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_http::HttpError;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> bridge_http::Result<HttpResponse>;
        }
    }

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "test-client".to_string(),
            client_secret: Some("shhh".to_string()),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    fn scopes() -> Vec<String> {
        vec!["https://www.googleapis.com/auth/drive".to_string()]
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.as_bytes().to_vec()),
        }
    }

    #[test]
    fn pkce_verifier_is_random_and_challenge_deterministic() {
        let a = PkceVerifier::new();
        let b = PkceVerifier::new();

        assert!(!a.verifier().is_empty());
        assert_ne!(a.verifier(), b.verifier());
        assert_ne!(a.state(), b.state());
        assert_eq!(a.challenge(), a.challenge());
        assert_ne!(a.challenge(), b.challenge());
    }

    #[test]
    fn challenge_is_url_safe_base64() {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
        assert!(!challenge.contains('='));
    }

    #[test]
    fn authorize_url_carries_required_parameters() {
        let client = OAuthClient::new(secrets(), scopes(), Arc::new(MockHttp::new()));
        let (url, verifier) = client.authorize_url("http://127.0.0.1:9999").unwrap();

        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("redirect_uri=http"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&format!("state={}", verifier.state())));
        assert!(url.contains("code_challenge="));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn authorize_url_rejects_invalid_endpoint() {
        let mut bad = secrets();
        bad.auth_uri = "not a url".to_string();
        let client = OAuthClient::new(bad, scopes(), Arc::new(MockHttp::new()));

        assert!(matches!(
            client.authorize_url("http://127.0.0.1:9999"),
            Err(AuthError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn exchange_code_rejects_state_mismatch() {
        let client = OAuthClient::new(secrets(), scopes(), Arc::new(MockHttp::new()));
        let verifier = PkceVerifier::new();

        let result = client
            .exchange_code("code", "forged-state", &verifier, "http://127.0.0.1:9999")
            .await;

        assert!(matches!(result, Err(AuthError::StateMismatch)));
    }

    #[tokio::test]
    async fn exchange_code_parses_grant() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                let body = request.body.as_ref().unwrap();
                let body = std::str::from_utf8(body).unwrap();
                body.contains("grant_type=authorization_code") && body.contains("code_verifier=")
            })
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"access_token":"at1","refresh_token":"rt1","expires_in":3599,"scope":"https://www.googleapis.com/auth/drive"}"#,
                ))
            });

        let client = OAuthClient::new(secrets(), scopes(), Arc::new(http));
        let verifier = PkceVerifier::new();
        let state = verifier.state().to_string();

        let grant = client
            .exchange_code("code", &state, &verifier, "http://127.0.0.1:9999")
            .await
            .unwrap();

        assert_eq!(grant.access_token, "at1");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt1"));
        assert_eq!(grant.expires_in, 3599);
    }

    #[tokio::test]
    async fn exchange_code_surfaces_endpoint_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(400, r#"{"error":"invalid_grant"}"#)));

        let client = OAuthClient::new(secrets(), scopes(), Arc::new(http));
        let verifier = PkceVerifier::new();
        let state = verifier.state().to_string();

        let result = client
            .exchange_code("code", &state, &verifier, "http://127.0.0.1:9999")
            .await;

        assert!(matches!(
            result,
            Err(AuthError::TokenEndpoint { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn refresh_maps_4xx_to_rejection() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                let body = request.body.as_ref().unwrap();
                std::str::from_utf8(body)
                    .unwrap()
                    .contains("grant_type=refresh_token")
            })
            .times(1)
            .returning(|_| Ok(json_response(400, r#"{"error":"invalid_grant"}"#)));

        let client = OAuthClient::new(secrets(), scopes(), Arc::new(http));
        let result = client.refresh("rt-dead").await;

        assert!(matches!(result, Err(AuthError::RefreshRejected(_))));
    }

    #[tokio::test]
    async fn refresh_keeps_token_on_server_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(503, "unavailable")));

        let client = OAuthClient::new(secrets(), scopes(), Arc::new(http));
        let result = client.refresh("rt1").await;

        assert!(matches!(
            result,
            Err(AuthError::TokenEndpoint { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn refresh_maps_transport_failure_to_network() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(HttpError::Connect("refused".to_string())));

        let client = OAuthClient::new(secrets(), scopes(), Arc::new(http));
        let result = client.refresh("rt1").await;

        assert!(matches!(result, Err(AuthError::Network(_))));
    }

    #[test]
    fn token_response_defaults_expiry() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"at"}"#).unwrap();
        assert_eq!(token.expires_in, 3600);
        assert!(token.refresh_token.is_none());
    }
}
