use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flate2::{write::GzEncoder, Compression};
use reqwest::{header, Method, StatusCode};
use tokio::time::sleep;

use crate::{
    credentials::CredentialProvider, ClientConfig, DatalakeClient, EventsClient, ModelClient,
    ObjectsClient, OwnersClient, Result, SearchClient, SmartObjectsError,
};

/// Authenticated HTTP client for the SmartObjects REST API.
///
/// Cheap to clone; clones share the connection pool and the cached token.
#[derive(Clone)]
pub struct SmartObjectsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: CredentialProvider,
    disposed: AtomicBool,
}

/// Request body ready to be sent.
struct Payload {
    bytes: Vec<u8>,
    gzipped: bool,
}

impl fmt::Debug for SmartObjectsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartObjectsClient")
            .field("config", &self.inner.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl SmartObjectsClient {
    /// Creates a client. The OAuth2 token, if any, is fetched by the first request.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(SmartObjectsError::Transport)?;
        let credentials = CredentialProvider::from_config(&config);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                credentials,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Creates a client and fetches the OAuth2 token right away.
    ///
    /// Fails with [`SmartObjectsError::Authentication`] when the token
    /// endpoint rejects the consumer key/secret.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.authorization().await?;
        Ok(client)
    }

    /// Creates a client from `SMARTOBJECTS_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn objects(&self) -> ObjectsClient<'_> {
        ObjectsClient::new(self)
    }

    pub fn owners(&self) -> OwnersClient<'_> {
        OwnersClient::new(self)
    }

    pub fn events(&self) -> EventsClient<'_> {
        EventsClient::new(self)
    }

    pub fn search(&self) -> SearchClient<'_> {
        SearchClient::new(self)
    }

    pub fn model(&self) -> ModelClient<'_> {
        ModelClient::new(self)
    }

    pub fn datalake(&self) -> DatalakeClient<'_> {
        DatalakeClient::new(self)
    }

    /// Marks the client as unusable. Calls already in flight complete;
    /// later calls fail with [`SmartObjectsError::Disposed`].
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Returns the current `Authorization` header value, refreshing the
    /// token first if it is about to expire.
    pub async fn authorization(&self) -> Result<String> {
        self.ensure_usable()?;
        self.inner.credentials.authorization(&self.inner.http).await
    }

    /// Sends an authenticated request to `relative_path` (relative to the
    /// base path, query string allowed) and returns the response body.
    ///
    /// Only 200, 201 and 207 succeed. HTTP 400 maps to
    /// [`SmartObjectsError::InvalidArgument`]; any other status, including
    /// 202 and 204, maps to [`SmartObjectsError::Operation`].
    pub async fn send_request(
        &self,
        method: Method,
        relative_path: &str,
        body: Option<&str>,
    ) -> Result<String> {
        self.ensure_usable()?;

        let url = self.inner.config.api_url(relative_path);
        let payload = match body {
            Some(body) if !body.is_empty() => Some(self.encode_body(body)?),
            _ => None,
        };
        let backoff = self.inner.config.backoff();
        let mut attempt = 0u32;

        loop {
            let authorization = self.authorization().await?;
            match self
                .send_once(method.clone(), &url, &authorization, payload.as_ref())
                .await
            {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt < backoff.max_retries() && is_retryable(&err) {
                        let delay = backoff.delay(attempt);
                        attempt += 1;
                        backoff.notify(&err, attempt);

                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            %url,
                            attempt,
                            error = %err,
                            "retrying request after {} ms",
                            delay.as_millis()
                        );

                        sleep(delay).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        authorization: &str,
        payload: Option<&Payload>,
    ) -> Result<String> {
        let mut request = self
            .inner
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, authorization)
            .timeout(self.inner.config.timeout());

        if let Some(payload) = payload {
            request = request.header(header::CONTENT_TYPE, "application/json");
            if payload.gzipped {
                request = request.header(header::CONTENT_ENCODING, "gzip");
            }
            request = request.body(payload.bytes.clone());
        }

        let response = request.send().await.map_err(SmartObjectsError::Transport)?;
        let status = response.status();
        let body = read_body(response, self.inner.config.max_response_buffer_size()).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, status = status.as_u16(), "request completed");

        classify(status, body)
    }

    fn encode_body(&self, body: &str) -> Result<Payload> {
        if self.inner.config.compression_enabled() {
            Ok(Payload {
                bytes: gzip(body.as_bytes())?,
                gzipped: true,
            })
        } else {
            Ok(Payload {
                bytes: body.as_bytes().to_vec(),
                gzipped: false,
            })
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(SmartObjectsError::Disposed);
        }
        Ok(())
    }
}

/// Percent-encodes a value used as a single path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(SmartObjectsError::Compression)?;
    encoder.finish().map_err(SmartObjectsError::Compression)
}

async fn read_body(mut response: reqwest::Response, limit: usize) -> Result<String> {
    if response
        .content_length()
        .is_some_and(|length| length > limit as u64)
    {
        return Err(SmartObjectsError::ResponseTooLarge { limit });
    }

    let mut buffer = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(SmartObjectsError::Transport)? {
        if buffer.len() + chunk.len() > limit {
            return Err(SmartObjectsError::ResponseTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    String::from_utf8(buffer)
        .map_err(|err| SmartObjectsError::Decode(format!("response body is not UTF-8: {err}")))
}

fn classify(status: StatusCode, body: String) -> Result<String> {
    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::MULTI_STATUS => Ok(body),
        StatusCode::BAD_REQUEST => Err(SmartObjectsError::InvalidArgument(body)),
        _ => Err(SmartObjectsError::Operation { status, body }),
    }
}

fn is_retryable(err: &SmartObjectsError) -> bool {
    match err {
        SmartObjectsError::Operation { status, .. } => matches!(
            *status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        ),
        SmartObjectsError::Transport(err) => {
            err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;
    use reqwest::StatusCode;

    use super::{classify, gzip, is_retryable, segment, SmartObjectsClient};
    use crate::{ClientConfig, SmartObjectsError};

    #[test]
    fn gzip_output_decompresses_to_input() {
        let body = r#"{"username":"élodie"}"#;
        let compressed = gzip(body.as_bytes()).expect("must compress");

        let mut decoded = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut decoded)
            .expect("must decompress");
        assert_eq!(decoded, body);
    }

    #[test]
    fn classification() {
        assert_eq!(classify(StatusCode::OK, "a".into()).expect("ok"), "a");
        assert_eq!(classify(StatusCode::CREATED, "b".into()).expect("ok"), "b");
        assert_eq!(classify(StatusCode::MULTI_STATUS, "c".into()).expect("ok"), "c");

        match classify(StatusCode::BAD_REQUEST, "request failed".into()) {
            Err(SmartObjectsError::InvalidArgument(message)) => {
                assert_eq!(message, "request failed")
            }
            other => panic!("expected invalid argument, got {other:?}"),
        }

        let err = classify(StatusCode::NOT_FOUND, "missing".into()).expect_err("must fail");
        assert_eq!(err.to_string(), "status code: NotFound, message missing");

        for status in [StatusCode::ACCEPTED, StatusCode::NO_CONTENT] {
            match classify(status, String::new()) {
                Err(SmartObjectsError::Operation { status: actual, .. }) => {
                    assert_eq!(actual, status)
                }
                other => panic!("expected operation error for {status}, got {other:?}"),
            }
        }
        let err = classify(StatusCode::NO_CONTENT, String::new()).expect_err("must fail");
        assert_eq!(err.to_string(), "status code: NoContent, message ");
    }

    #[test]
    fn only_server_side_statuses_are_retryable() {
        let unavailable = SmartObjectsError::Operation {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        let not_found = SmartObjectsError::Operation {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(is_retryable(&unavailable));
        assert!(!is_retryable(&not_found));
        assert!(!is_retryable(&SmartObjectsError::InvalidArgument(String::new())));
        assert!(!is_retryable(&SmartObjectsError::Authentication(String::new())));
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(segment("dev 1/a"), "dev%201%2Fa");
        assert_eq!(segment("plain-id_1.x"), "plain-id_1.x");
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = ClientConfig::builder()
            .token("secret-token")
            .build()
            .expect("must build");
        let client = SmartObjectsClient::new(config).expect("must create client");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn disposed_client_rejects_calls() {
        let config = ClientConfig::builder()
            .token("abc")
            .build()
            .expect("must build");
        let client = SmartObjectsClient::new(config).expect("must create client");
        client.dispose();

        let err = client
            .send_request(reqwest::Method::GET, "model/export", None)
            .await
            .expect_err("must fail");
        assert!(matches!(err, SmartObjectsError::Disposed));
    }
}
