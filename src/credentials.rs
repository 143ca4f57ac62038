//! Authorization header providers.
//!
//! Client-credentials mode exchanges the consumer key/secret for an OAuth2
//! token and caches it until one second before its declared expiry. Static
//! mode wraps a caller-supplied token and never touches the network.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use base64::Engine;
use reqwest::{header, StatusCode};

use crate::{wire::TokenResponse, ClientConfig, Credentials, Result, SmartObjectsError};

/// Tokens are treated as expired this long before their declared expiry.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(1);

/// OAuth2 access token. Replaced wholesale on refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    access_token: String,
    token_type: String,
    expires_at: Instant,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// Creates a token issued at `issued_at` that lives for `expires_in`.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        issued_at: Instant,
        expires_in: Duration,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: issued_at + expires_in,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN >= self.expires_at
    }

    /// Value for the `Authorization` header, e.g. `Bearer abc`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Source of the `Authorization` header value.
pub(crate) enum CredentialProvider {
    ClientCredentials(TokenCache),
    StaticToken(String),
}

impl CredentialProvider {
    pub(crate) fn from_config(config: &ClientConfig) -> Self {
        match config.credentials() {
            Credentials::ClientCredentials {
                consumer_key,
                consumer_secret,
            } => Self::ClientCredentials(TokenCache {
                token_url: config.token_url(),
                basic_authorization: basic_authorization(consumer_key, consumer_secret),
                timeout: config.timeout(),
                cached: RwLock::new(None),
                refresh: tokio::sync::Mutex::new(()),
            }),
            Credentials::StaticToken { token } => Self::StaticToken(format!("Bearer {token}")),
        }
    }

    /// Returns a complete `Authorization` header value backed by a
    /// non-expired token, fetching a new one first when needed.
    pub(crate) async fn authorization(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            Self::ClientCredentials(cache) => cache.authorization(http).await,
            Self::StaticToken(authorization) => Ok(authorization.clone()),
        }
    }
}

pub(crate) struct TokenCache {
    token_url: String,
    basic_authorization: String,
    timeout: Duration,
    cached: RwLock<Option<Arc<Token>>>,
    refresh: tokio::sync::Mutex<()>,
}

impl TokenCache {
    async fn authorization(&self, http: &reqwest::Client) -> Result<String> {
        if let Some(token) = self.fresh_token() {
            return Ok(token.authorization());
        }

        // Single-flight: concurrent callers wait for the first refresh.
        let _refresh = self.refresh.lock().await;
        if let Some(token) = self.fresh_token() {
            return Ok(token.authorization());
        }

        let token = Arc::new(self.fetch(http).await?);
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&token));
        Ok(token.authorization())
    }

    fn fresh_token(&self) -> Option<Arc<Token>> {
        let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
        cached
            .as_ref()
            .filter(|token| !token.is_expired_at(Instant::now()))
            .cloned()
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Token> {
        #[cfg(feature = "tracing")]
        tracing::debug!(url = %self.token_url, "fetching access token");

        let response = http
            .post(&self.token_url)
            .header(header::AUTHORIZATION, &self.basic_authorization)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| SmartObjectsError::Authentication(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SmartObjectsError::Authentication(err.to_string()))?;

        if status != StatusCode::OK {
            return Err(SmartObjectsError::Authentication(format!(
                "status code: {}, message {body}",
                status.as_u16()
            )));
        }

        let issued_at = Instant::now();
        let parsed = serde_json::from_str::<TokenResponse>(&body).map_err(|err| {
            SmartObjectsError::Authentication(format!("invalid token response: {err}"))
        })?;

        match (parsed.access_token, parsed.token_type, parsed.expires_in) {
            (Some(access_token), Some(token_type), Some(expires_in)) => Ok(Token::new(
                access_token,
                token_type,
                issued_at,
                Duration::from_secs(expires_in),
            )),
            _ => Err(SmartObjectsError::Authentication(
                "token response is missing access_token, token_type or expires_in".to_owned(),
            )),
        }
    }
}

fn basic_authorization(consumer_key: &str, consumer_secret: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{consumer_key}:{consumer_secret}"));
    format!("Basic {encoded}")
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{basic_authorization, CredentialProvider, Token};
    use crate::ClientConfig;

    #[test]
    fn token_expires_one_second_early() {
        let issued = Instant::now();
        let token = Token::new("abc", "Bearer", issued, Duration::from_secs(10));

        assert!(!token.is_expired_at(issued));
        assert!(!token.is_expired_at(issued + Duration::from_millis(8_999)));
        assert!(token.is_expired_at(issued + Duration::from_secs(9)));
        assert!(token.is_expired_at(issued + Duration::from_secs(11)));
    }

    #[test]
    fn token_authorization_uses_token_type() {
        let token = Token::new("abc", "bearer", Instant::now(), Duration::from_secs(60));
        assert_eq!(token.authorization(), "bearer abc");
        assert!(!format!("{token:?}").contains("abc"));
    }

    #[test]
    fn basic_authorization_encodes_key_and_secret() {
        assert_eq!(basic_authorization("key", "secret"), "Basic a2V5OnNlY3JldA==");
    }

    #[tokio::test]
    async fn static_token_is_prefixed_with_bearer() {
        let config = ClientConfig::builder()
            .token("xyz")
            .build()
            .expect("must build");
        let provider = CredentialProvider::from_config(&config);

        let header = provider
            .authorization(&reqwest::Client::new())
            .await
            .expect("static token never fails");
        assert_eq!(header, "Bearer xyz");
    }
}
