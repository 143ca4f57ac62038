use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{Result, SmartObjectsError};

/// Hostname of the sandbox environment.
pub const SANDBOX_HOST: &str = "rest.sandbox.mnubo.com";
/// Hostname of the production environment.
pub const PRODUCTION_HOST: &str = "rest.api.mnubo.com";

pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_BASE_PATH: &str = "/api/v3/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RESPONSE_BUFFER_SIZE: usize = 64 * 1024 * 1024;
pub const DEFAULT_COMPRESSION_ENABLED: bool = true;

/// Target API environment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Environment {
    Sandbox,
    Production,
    /// Explicit endpoint, e.g. a local mock server.
    Custom {
        scheme: String,
        host: String,
        port: u16,
    },
}

impl Environment {
    pub fn scheme(&self) -> &str {
        match self {
            Self::Sandbox | Self::Production => DEFAULT_SCHEME,
            Self::Custom { scheme, .. } => scheme,
        }
    }

    pub fn host(&self) -> &str {
        match self {
            Self::Sandbox => SANDBOX_HOST,
            Self::Production => PRODUCTION_HOST,
            Self::Custom { host, .. } => host,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Sandbox | Self::Production => DEFAULT_PORT,
            Self::Custom { port, .. } => *port,
        }
    }

    /// Sandbox-only operations are refused in production only; custom
    /// endpoints are assumed to be test doubles.
    pub fn allows_sandbox_operations(&self) -> bool {
        !matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Some(Self::Sandbox),
            "production" => Some(Self::Production),
            _ => None,
        }
    }
}

/// How the client authenticates.
#[derive(Clone, Eq, PartialEq)]
pub enum Credentials {
    /// OAuth2 client-credentials exchange.
    ClientCredentials {
        consumer_key: String,
        consumer_secret: String,
    },
    /// Caller-supplied bearer token.
    StaticToken { token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials { consumer_key, .. } => f
                .debug_struct("ClientCredentials")
                .field("consumer_key", consumer_key)
                .field("consumer_secret", &"<redacted>")
                .finish(),
            Self::StaticToken { .. } => f
                .debug_struct("StaticToken")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Callback invoked before each retry with the failure and the 1-based retry number.
pub type RetryCallback = Arc<dyn Fn(&SmartObjectsError, u32) + Send + Sync>;

/// Retry policy for retryable request failures.
#[derive(Clone, Default)]
pub enum ExponentialBackoffConfig {
    #[default]
    Off,
    On {
        /// Maximum number of retries after the initial attempt.
        number_of_attempts: u32,
        /// Delay before the first retry; doubled for each further retry.
        initial_delay: Duration,
        on_retry: Option<RetryCallback>,
    },
}

impl ExponentialBackoffConfig {
    pub fn on(number_of_attempts: u32, initial_delay: Duration) -> Self {
        Self::On {
            number_of_attempts,
            initial_delay,
            on_retry: None,
        }
    }

    pub fn on_with_callback<F>(
        number_of_attempts: u32,
        initial_delay: Duration,
        callback: F,
    ) -> Self
    where
        F: Fn(&SmartObjectsError, u32) + Send + Sync + 'static,
    {
        Self::On {
            number_of_attempts,
            initial_delay,
            on_retry: Some(Arc::new(callback)),
        }
    }

    pub(crate) fn max_retries(&self) -> u32 {
        match self {
            Self::Off => 0,
            Self::On {
                number_of_attempts, ..
            } => *number_of_attempts,
        }
    }

    /// Delay before retry `attempt` (0-based).
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Off => Duration::ZERO,
            Self::On { initial_delay, .. } => {
                let multiplier = 1u32 << attempt.min(16);
                initial_delay.saturating_mul(multiplier)
            }
        }
    }

    pub(crate) fn notify(&self, err: &SmartObjectsError, retry: u32) {
        if let Self::On {
            on_retry: Some(callback),
            ..
        } = self
        {
            callback(err, retry);
        }
    }
}

impl fmt::Debug for ExponentialBackoffConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("Off"),
            Self::On {
                number_of_attempts,
                initial_delay,
                on_retry,
            } => f
                .debug_struct("On")
                .field("number_of_attempts", number_of_attempts)
                .field("initial_delay", initial_delay)
                .field("on_retry", &on_retry.as_ref().map(|_| "<callback>"))
                .finish(),
        }
    }
}

/// Immutable client configuration. Build it with [`ClientConfig::builder`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    environment: Environment,
    base_path: String,
    credentials: Credentials,
    timeout: Duration,
    max_response_buffer_size: usize,
    compression_enabled: Option<bool>,
    backoff: ExponentialBackoffConfig,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Creates a configuration from environment variables.
    ///
    /// Reads:
    /// - `SMARTOBJECTS_ENV` — `sandbox` (default) or `production`
    /// - `SMARTOBJECTS_CONSUMER_KEY` / `SMARTOBJECTS_CONSUMER_SECRET`, or
    /// - `SMARTOBJECTS_TOKEN` — static bearer token
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(env) = std::env::var("SMARTOBJECTS_ENV") {
            let environment = Environment::parse(&env).ok_or_else(|| {
                SmartObjectsError::Config(format!(
                    "SMARTOBJECTS_ENV must be 'sandbox' or 'production', got '{env}'"
                ))
            })?;
            builder = builder.environment(environment);
        }

        let key = std::env::var("SMARTOBJECTS_CONSUMER_KEY").ok();
        let secret = std::env::var("SMARTOBJECTS_CONSUMER_SECRET").ok();
        match (key, secret) {
            (Some(key), Some(secret)) => builder = builder.consumer_key_and_secret(key, secret),
            (Some(_), None) => {
                return Err(SmartObjectsError::Config(
                    "missing SMARTOBJECTS_CONSUMER_SECRET environment variable".to_owned(),
                ))
            }
            (None, Some(_)) => {
                return Err(SmartObjectsError::Config(
                    "missing SMARTOBJECTS_CONSUMER_KEY environment variable".to_owned(),
                ))
            }
            (None, None) => {}
        }

        if let Ok(token) = std::env::var("SMARTOBJECTS_TOKEN") {
            builder = builder.token(token);
        }

        builder.build()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_response_buffer_size(&self) -> usize {
        self.max_response_buffer_size
    }

    /// Effective compression setting; unset falls back to the default.
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled.unwrap_or(DEFAULT_COMPRESSION_ENABLED)
    }

    pub fn backoff(&self) -> &ExponentialBackoffConfig {
        &self.backoff
    }

    /// `{scheme}://{host}:{port}`
    pub(crate) fn host_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.environment.scheme(),
            self.environment.host(),
            self.environment.port()
        )
    }

    /// Full URL of an API path relative to the base path.
    pub(crate) fn api_url(&self, relative_path: &str) -> String {
        let (path, query) = match relative_path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (relative_path, None),
        };
        let path = path.trim_start_matches('/');
        match query {
            Some(query) => format!("{}{}{path}?{query}", self.host_url(), self.base_path),
            None => format!("{}{}{path}", self.host_url(), self.base_path),
        }
    }

    pub(crate) fn token_url(&self) -> String {
        format!(
            "{}/oauth/token?grant_type=client_credentials&scope=ALL",
            self.host_url()
        )
    }
}

/// Validating builder for [`ClientConfig`].
#[derive(Clone, Debug, Default)]
pub struct ClientConfigBuilder {
    environment: Option<Environment>,
    base_path: Option<String>,
    consumer: Option<(String, String)>,
    token: Option<String>,
    timeout: Option<Duration>,
    max_response_buffer_size: Option<usize>,
    compression_enabled: Option<bool>,
    backoff: ExponentialBackoffConfig,
}

impl ClientConfigBuilder {
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Overrides scheme, host and port, typically for a mock server.
    pub fn custom_endpoint(
        self,
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        self.environment(Environment::Custom {
            scheme: scheme.into(),
            host: host.into(),
            port,
        })
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn consumer_key_and_secret(
        mut self,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        self.consumer = Some((consumer_key.into(), consumer_secret.into()));
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_response_buffer_size(mut self, bytes: usize) -> Self {
        self.max_response_buffer_size = Some(bytes);
        self
    }

    pub fn compression_enabled(mut self, enabled: bool) -> Self {
        self.compression_enabled = Some(enabled);
        self
    }

    pub fn exponential_backoff(mut self, backoff: ExponentialBackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let credentials = match (self.consumer, self.token) {
            (Some(_), Some(_)) => {
                return Err(SmartObjectsError::Config(
                    "consumer key/secret and token are mutually exclusive".to_owned(),
                ))
            }
            (None, None) => {
                return Err(SmartObjectsError::Config(
                    "consumer key/secret or token is required".to_owned(),
                ))
            }
            (Some((consumer_key, consumer_secret)), None) => {
                if consumer_key.trim().is_empty() {
                    return Err(SmartObjectsError::Config(
                        "consumer key cannot be blank".to_owned(),
                    ));
                }
                if consumer_secret.trim().is_empty() {
                    return Err(SmartObjectsError::Config(
                        "consumer secret cannot be blank".to_owned(),
                    ));
                }
                Credentials::ClientCredentials {
                    consumer_key,
                    consumer_secret,
                }
            }
            (None, Some(token)) => {
                let token = token.trim();
                if token.is_empty() {
                    return Err(SmartObjectsError::Config("token cannot be blank".to_owned()));
                }
                Credentials::StaticToken {
                    token: token.to_owned(),
                }
            }
        };

        let environment = self.environment.unwrap_or(Environment::Sandbox);
        if let Environment::Custom { scheme, host, .. } = &environment {
            if scheme.trim().is_empty() || host.trim().is_empty() {
                return Err(SmartObjectsError::Config(
                    "custom endpoint scheme and host cannot be blank".to_owned(),
                ));
            }
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(SmartObjectsError::Config(
                "timeout must be greater than zero".to_owned(),
            ));
        }

        let max_response_buffer_size = self
            .max_response_buffer_size
            .unwrap_or(DEFAULT_MAX_RESPONSE_BUFFER_SIZE);
        if max_response_buffer_size == 0 {
            return Err(SmartObjectsError::Config(
                "max response buffer size must be greater than zero".to_owned(),
            ));
        }

        Ok(ClientConfig {
            environment,
            base_path: normalize_base_path(self.base_path.as_deref().unwrap_or(DEFAULT_BASE_PATH)),
            credentials,
            timeout,
            max_response_buffer_size,
            compression_enabled: self.compression_enabled,
            backoff: self.backoff,
        })
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        normalize_base_path, ClientConfig, Credentials, Environment, ExponentialBackoffConfig,
    };
    use crate::SmartObjectsError;

    fn token_config() -> ClientConfig {
        ClientConfig::builder()
            .token("abc")
            .build()
            .expect("must build")
    }

    #[test]
    fn defaults_target_sandbox() {
        let config = token_config();
        assert_eq!(config.environment(), &Environment::Sandbox);
        assert_eq!(config.base_path(), "/api/v3/");
        assert!(config.compression_enabled());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(matches!(config.backoff(), ExponentialBackoffConfig::Off));
    }

    #[test]
    fn api_url_composition() {
        let config = token_config();
        assert_eq!(
            config.api_url("objects/exists/dev-1"),
            "https://rest.sandbox.mnubo.com:443/api/v3/objects/exists/dev-1"
        );
        assert_eq!(
            config.api_url("events?report_results=true"),
            "https://rest.sandbox.mnubo.com:443/api/v3/events?report_results=true"
        );
        assert_eq!(
            config.token_url(),
            "https://rest.sandbox.mnubo.com:443/oauth/token?grant_type=client_credentials&scope=ALL"
        );
    }

    #[test]
    fn custom_endpoint_and_base_path() {
        let config = ClientConfig::builder()
            .custom_endpoint("http", "localhost", 8080)
            .base_path("mock")
            .token("abc")
            .build()
            .expect("must build");
        assert_eq!(config.api_url("owners"), "http://localhost:8080/mock/owners");
    }

    #[test]
    fn credential_modes_are_exclusive() {
        let err = ClientConfig::builder()
            .consumer_key_and_secret("key", "secret")
            .token("abc")
            .build()
            .expect_err("must fail");
        assert!(matches!(err, SmartObjectsError::Config(_)));

        let err = ClientConfig::builder().build().expect_err("must fail");
        assert!(matches!(err, SmartObjectsError::Config(_)));
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let err = ClientConfig::builder()
            .consumer_key_and_secret("key", "  ")
            .build()
            .expect_err("must fail");
        assert!(matches!(err, SmartObjectsError::Config(_)));
    }

    #[test]
    fn compression_is_tri_state() {
        let config = ClientConfig::builder()
            .token("abc")
            .compression_enabled(false)
            .build()
            .expect("must build");
        assert!(!config.compression_enabled());
    }

    #[test]
    fn backoff_delay_doubles() {
        let backoff = ExponentialBackoffConfig::on(5, Duration::from_millis(500));
        assert_eq!(backoff.max_retries(), 5);
        assert_eq!(backoff.delay(0), Duration::from_millis(500));
        assert_eq!(backoff.delay(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay(3), Duration::from_millis(4000));
        assert_eq!(ExponentialBackoffConfig::Off.max_retries(), 0);
    }

    #[test]
    fn debug_redacts_secrets() {
        let credentials = Credentials::ClientCredentials {
            consumer_key: "key".to_owned(),
            consumer_secret: "very-secret".to_owned(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn base_path_normalization() {
        assert_eq!(normalize_base_path("api/v3"), "/api/v3/");
        assert_eq!(normalize_base_path("/api/v3/"), "/api/v3/");
        assert_eq!(normalize_base_path(""), "/");
    }
}
