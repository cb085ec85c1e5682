//! Identity provider client.
//!
//! The controller only needs three things from the provider: build a client
//! for an API key, authenticate (sign in or create an account) with
//! email/password, and read an ID token off the resulting session. Those are
//! the [`AuthProvider`] and [`AuthClient`] traits.
//!
//! [`IdentityToolkit`] implements them against the Firebase Auth REST API
//! (`accounts:signInWithPassword` / `accounts:signUp`). Tokens are issued and
//! signed by the provider; nothing here inspects or refreshes them.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::ProviderConfig;

// ============================================================================
// Errors
// ============================================================================

/// Categories of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The provider answered with a non-success HTTP status.
    HttpStatus,
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    Transport,
    /// A success response could not be parsed.
    Parse,
    /// The client could not be constructed (bad base URL, TLS backend init).
    Config,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Transport => write!(f, "transport"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::Config => write!(f, "config"),
        }
    }
}

/// Structured error from the provider.
///
/// `message` is what the user sees, verbatim from the provider when it sent one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error category
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ProviderError {
    /// Creates a new provider error.
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, lifting `error.message` out of the body
    /// when the provider sent its usual JSON error envelope.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());

        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
        {
            return Self {
                kind: ProviderErrorKind::HttpStatus,
                message: msg.to_string(),
                details,
            };
        }

        Self {
            kind: ProviderErrorKind::HttpStatus,
            message: format!("HTTP {status}"),
            details,
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    /// Creates a client construction error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Config, message)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Session
// ============================================================================

/// Result of a successful sign-in or account creation.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: Option<String>, id_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            id_token: id_token.into(),
            refresh_token: None,
            expires_in: None,
        }
    }

    /// Provider user identifier (`localId`).
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Seconds until the ID token expires, as reported at issue time.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("id_token", &mask_token(&self.id_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}

// ============================================================================
// Traits
// ============================================================================

/// Builds clients bound to one API key.
pub trait AuthProvider {
    type Client: AuthClient;

    /// Constructs a fresh client for `api_key`.
    ///
    /// # Errors
    /// Returns an error if the client cannot be constructed.
    fn connect(&self, api_key: &str) -> Result<Self::Client, ProviderError>;
}

/// Authentication calls against one provider project.
pub trait AuthClient: Clone + Send + Sync + 'static {
    /// The API key this client is bound to.
    fn api_key(&self) -> &str;

    /// Signs in an existing account.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, ProviderError>> + Send;

    /// Creates a new account and signs it in.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, ProviderError>> + Send;

    /// Returns a current ID token (JWT) for the session.
    fn id_token(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

// ============================================================================
// Identity Toolkit (REST)
// ============================================================================

/// Client factory for the Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct IdentityToolkit {
    base_url: String,
}

impl IdentityToolkit {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Builds a factory from config, honoring the base URL env override.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.resolve_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for IdentityToolkit {
    fn default() -> Self {
        Self::new(ProviderConfig::DEFAULT_BASE_URL)
    }
}

impl AuthProvider for IdentityToolkit {
    type Client = IdentityToolkitClient;

    fn connect(&self, api_key: &str) -> Result<Self::Client, ProviderError> {
        let base = self.base_url.trim_end_matches('/');
        let base_url = Url::parse(base)
            .map_err(|e| ProviderError::config(format!("Invalid provider URL '{base}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::config(format!(
                "Unsupported provider URL scheme: {}",
                base_url.scheme()
            )));
        }

        // One HTTP client per key: nothing is shared between projects.
        let http = reqwest::Client::builder()
            .user_agent(concat!("jwtgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::config(e.without_url().to_string()))?;

        tracing::info!(base_url = %base, "initialized identity provider client");

        Ok(IdentityToolkitClient {
            http,
            base: base.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Identity Toolkit client bound to one API key.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
}

impl fmt::Debug for IdentityToolkitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToolkitClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds, sent as a decimal string.
    #[serde(default)]
    expires_in: Option<String>,
}

impl From<AccountResponse> for Session {
    fn from(resp: AccountResponse) -> Self {
        let mut session = Session::new(resp.local_id, resp.email, resp.id_token);
        session.refresh_token = resp.refresh_token;
        session.expires_in = resp.expires_in.and_then(|s| s.trim().parse().ok());
        session
    }
}

impl IdentityToolkitClient {
    fn endpoint(&self, action: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/v1/accounts:{action}", self.base))
            .map_err(|e| ProviderError::config(format!("Invalid provider URL: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let url = self.endpoint(action)?;
        let response = self
            .http
            .post(url)
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            // The request URL carries the API key; keep it out of messages.
            .map_err(|e| ProviderError::transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ProviderError::http_status(status.as_u16(), &body);
            tracing::warn!(action, status = status.as_u16(), error = %err, "provider rejected request");
            return Err(err);
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("Failed to parse provider response: {}", e.without_url())))?;

        let session = Session::from(account);
        tracing::info!(action, user_id = session.user_id(), "provider accepted credentials");
        Ok(session)
    }
}

impl AuthClient for IdentityToolkitClient {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.password_call("signUp", email, password).await
    }

    async fn id_token(&self, session: &Session) -> Result<String, ProviderError> {
        // A session fresh from signInWithPassword/signUp already carries a
        // current token; there is nothing to exchange.
        if session.id_token.is_empty() {
            return Err(ProviderError::parse("Provider returned an empty ID token"));
        }
        Ok(session.id_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn account_body(uid: &str, email: &str, token: &str) -> Value {
        json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "localId": uid,
            "email": email,
            "idToken": token,
            "refreshToken": "refresh-token-value",
            "expiresIn": "3600"
        })
    }

    fn error_body(message: &str) -> Value {
        json!({
            "error": {
                "code": 400,
                "message": message,
                "errors": [{ "message": message, "domain": "global", "reason": "invalid" }]
            }
        })
    }

    #[tokio::test]
    async fn test_sign_in_posts_credentials_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "AIzaFAKE123"))
            .and(body_json(json!({
                "email": "a@b.com",
                "password": "secret",
                "returnSecureToken": true
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(account_body("uid-1", "a@b.com", "jwt.token.value")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = IdentityToolkit::new(server.uri()).connect("AIzaFAKE123").unwrap();
        let session = client.sign_in("a@b.com", "secret").await.unwrap();

        assert_eq!(session.user_id(), "uid-1");
        assert_eq!(session.email(), Some("a@b.com"));
        assert_eq!(session.expires_in(), Some(3600));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-token-value"));
        assert_eq!(client.id_token(&session).await.unwrap(), "jwt.token.value");
    }

    #[tokio::test]
    async fn test_create_account_uses_sign_up_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(account_body("new-user", "a@b.com", "jwt")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = IdentityToolkit::new(server.uri()).connect("key").unwrap();
        let session = client.create_account("a@b.com", "secret").await.unwrap();

        assert_eq!(session.user_id(), "new-user");
    }

    #[tokio::test]
    async fn test_provider_error_message_is_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body("INVALID_PASSWORD")))
            .mount(&server)
            .await;

        let client = IdentityToolkit::new(server.uri()).connect("key").unwrap();
        let err = client.sign_in("a@b.com", "wrong").await.unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.message, "INVALID_PASSWORD");
        assert!(err.details.unwrap().contains("INVALID_PASSWORD"));
    }

    #[tokio::test]
    async fn test_non_json_error_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = IdentityToolkit::new(server.uri()).connect("key").unwrap();
        let err = client.create_account("a@b.com", "secret").await.unwrap_err();

        assert_eq!(err.message, "HTTP 503");
        assert_eq!(err.details.as_deref(), Some("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let client = IdentityToolkit::new(server.uri()).connect("key").unwrap();
        let err = client.sign_in("a@b.com", "secret").await.unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identitytoolkit.googleapis.com/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(account_body("u", "a@b.com", "t")))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/identitytoolkit.googleapis.com/", server.uri());
        let client = IdentityToolkit::new(base).connect("key").unwrap();

        assert!(client.create_account("a@b.com", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        // Nothing listens on port 9 (discard) in test environments.
        let client = IdentityToolkit::new("http://127.0.0.1:9").connect("SECRET-KEY").unwrap();
        let err = client.sign_in("a@b.com", "secret").await.unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::Transport);
        assert!(!err.message.contains("SECRET-KEY"));
    }

    #[tokio::test]
    async fn test_empty_id_token_is_rejected() {
        let client = IdentityToolkit::default().connect("key").unwrap();
        let session = Session::new("uid", None, "");

        assert!(client.id_token(&session).await.is_err());
    }

    #[test]
    fn test_connect_rejects_invalid_base_url() {
        let err = IdentityToolkit::new("not a url").connect("key").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Config);

        let err = IdentityToolkit::new("ftp://example.com").connect("key").unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Config);
    }

    #[test]
    fn test_session_debug_masks_tokens() {
        let mut session =
            Session::new("uid", Some("a@b.com".into()), "eyJhbGciOiJSUzI1NiJ9.payload.signature");
        session.refresh_token = Some("refresh-token-that-is-long".to_string());
        let debug = format!("{session:?}");

        assert!(!debug.contains("payload.signature"));
        assert!(!debug.contains("refresh-token-that-is-long"));
        assert!(debug.contains("eyJhbGciOiJS..."));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("abcdefghijklmnopqrstuvwxyz"), "abcdefghijkl...");
    }
}
