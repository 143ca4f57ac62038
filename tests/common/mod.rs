#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::Read,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::post,
    Router,
};
use flate2::read::GzDecoder;
use serde_json::{json, Value as JsonValue};
use smartobjects_http::{ClientConfig, ClientConfigBuilder};

#[derive(Clone)]
pub struct MockResponse {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockResponse {
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self::text(status, body.to_string())
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::text(status, "")
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Request body, gunzipped when it was sent compressed.
    pub fn body_text(&self) -> String {
        let mut text = String::new();
        if self.content_encoding.as_deref() == Some("gzip") {
            GzDecoder::new(self.body.as_slice())
                .read_to_string(&mut text)
                .expect("body must be valid gzip");
        } else {
            text = String::from_utf8(self.body.clone()).expect("body must be UTF-8");
        }
        text
    }

    pub fn body_json(&self) -> JsonValue {
        serde_json::from_str(&self.body_text()).expect("body must be JSON")
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    token_responses: Arc<Mutex<VecDeque<MockResponse>>>,
    token_expires_in: u64,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    token_requests: Arc<Mutex<Vec<RecordedRequest>>>,
    hits: Arc<AtomicUsize>,
    token_hits: Arc<AtomicUsize>,
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn record(method: Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> RecordedRequest {
    RecordedRequest {
        method,
        uri: uri
            .path_and_query()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_default(),
        authorization: header_value(headers, header::AUTHORIZATION),
        content_type: header_value(headers, header::CONTENT_TYPE),
        content_encoding: header_value(headers, header::CONTENT_ENCODING),
        body: body.to_vec(),
    }
}

async fn api_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(record(method, &uri, &headers, body));

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::text(StatusCode::INTERNAL_SERVER_ERROR, "no mock response available")
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, response.body)
}

async fn token_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let hit = state.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
    state
        .token_requests
        .lock()
        .expect("token log mutex must not be poisoned")
        .push(record(method, &uri, &headers, body));

    let queued = state
        .token_responses
        .lock()
        .expect("token queue mutex must not be poisoned")
        .pop_front();
    let response = queued.unwrap_or_else(|| {
        MockResponse::json(
            StatusCode::OK,
            json!({
                "access_token": format!("token-{hit}"),
                "token_type": "Bearer",
                "expires_in": state.token_expires_in,
                "scope": "ALL",
                "jti": format!("jti-{hit}")
            }),
        )
    });

    (response.status, response.body)
}

pub struct TestServer {
    pub port: u16,
    pub hits: Arc<AtomicUsize>,
    pub token_hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    token_requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    /// Config pointed at this server, authenticated with a static token.
    pub fn config(&self) -> ClientConfigBuilder {
        self.endpoint().token("abc")
    }

    /// Config pointed at this server, authenticated through `/oauth/token`.
    pub fn oauth_config(&self) -> ClientConfigBuilder {
        self.endpoint().consumer_key_and_secret("key", "secret")
    }

    pub fn client_config(&self) -> ClientConfig {
        self.config().build().expect("config must build")
    }

    fn endpoint(&self) -> ClientConfigBuilder {
        ClientConfig::builder().custom_endpoint("http", "127.0.0.1", self.port)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn token_hits(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests()
            .pop()
            .expect("server must have received a request")
    }

    pub fn token_requests(&self) -> Vec<RecordedRequest> {
        self.token_requests
            .lock()
            .expect("token log mutex must not be poisoned")
            .clone()
    }
}

pub async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    spawn_oauth_server(responses, Vec::new(), 3600).await
}

/// Mock API plus token endpoint. Queued `token_responses` are served first;
/// afterwards every token request gets a fresh `token-N` valid for
/// `token_expires_in` seconds.
pub async fn spawn_oauth_server(
    responses: Vec<MockResponse>,
    token_responses: Vec<MockResponse>,
    token_expires_in: u64,
) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        token_responses: Arc::new(Mutex::new(token_responses.into())),
        token_expires_in,
        requests: Arc::new(Mutex::new(Vec::new())),
        token_requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
        token_hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/oauth/token", post(token_handler))
        .fallback(api_handler)
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        port: address.port(),
        hits: state.hits,
        token_hits: state.token_hits,
        requests: state.requests,
        token_requests: state.token_requests,
        task,
    }
}
