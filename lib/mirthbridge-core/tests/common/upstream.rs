#![allow(
    clippy::missing_errors_doc,
    dead_code,
    missing_docs,
    clippy::expect_used
)]
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "s3cr3t";

/// How the fake NextGen Connect server misbehaves.
#[derive(Debug, Clone)]
pub struct Behavior {
    /// Number of channel calls answered with `expired_status` before succeeding.
    pub expired_responses: usize,
    pub expired_status: StatusCode,
    /// Logins accepted before every further one is rejected with 401.
    pub accepted_logins: usize,
    pub slow_delay: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            expired_responses: 0,
            expired_status: StatusCode::UNAUTHORIZED,
            accepted_logins: usize::MAX,
            slow_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug)]
struct UpstreamState {
    behavior: Behavior,
    logins: AtomicUsize,
    channel_calls: AtomicUsize,
    remaining_expired: AtomicUsize,
}

#[derive(Debug)]
pub struct Upstream {
    base_url: String,
    state: Arc<UpstreamState>,
}

impl Upstream {
    pub async fn start(behavior: Behavior) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(UpstreamState {
            remaining_expired: AtomicUsize::new(behavior.expired_responses),
            behavior,
            logins: AtomicUsize::new(0),
            channel_calls: AtomicUsize::new(0),
        });

        let api = Router::new()
            .route("/users/_login", post(login))
            .route("/channels", post(create_channel))
            .route("/channels/{channel_id}", get(get_channel).delete(remove_channel))
            .route("/server/broken", get(broken))
            .route("/server/slow", get(slow))
            .route("/server/text", get(text));
        let router = Router::new()
            .nest("/api", api)
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, router).await {
                warn!(%error, "mock upstream stopped");
            }
        });
        info!(%addr, "mock upstream listening");

        Ok(Self {
            base_url: format!("http://{addr}/api"),
            state,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn channel_calls(&self) -> usize {
        self.state.channel_calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<Arc<UpstreamState>>, Form(form): Form<LoginForm>) -> Response {
    let attempt = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    let valid = form.username == USERNAME && form.password == PASSWORD;
    if !valid || attempt > state.behavior.accepted_logins {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (
        [(header::SET_COOKIE, format!("JSESSIONID=session-{attempt}; Path=/"))],
        Json(json!({ "name": form.username })),
    )
        .into_response()
}

async fn get_channel(
    State(state): State<Arc<UpstreamState>>,
    Path(channel_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    state.channel_calls.fetch_add(1, Ordering::SeqCst);

    let expired = state
        .remaining_expired
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if expired {
        return (state.behavior.expired_status, "session expired").into_response();
    }

    let trace = headers
        .get("x-trace-id")
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    let requested_with = headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    Json(json!({
        "id": channel_id,
        "name": "ADT Inbound",
        "query": query,
        "trace": trace,
        "requestedWith": requested_with,
    }))
    .into_response()
}

async fn create_channel(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    (
        StatusCode::CREATED,
        Json(json!({ "created": body, "contentType": content_type })),
    )
        .into_response()
}

async fn remove_channel(Path(_channel_id): Path<String>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn broken() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "database unavailable" })),
    )
        .into_response()
}

async fn slow(State(state): State<Arc<UpstreamState>>) -> &'static str {
    tokio::time::sleep(state.behavior.slow_delay).await;
    "too late"
}

async fn text() -> &'static str {
    "STARTED"
}
