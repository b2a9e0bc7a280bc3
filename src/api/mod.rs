//! HTTP API for the browser front end.
//!
//! Serves the static shell, connection control, sending, and CRUD over
//! contacts, groups, templates and message logs. Every `/api/*` route sits
//! behind the optional bearer token.

mod crud;
mod messaging;


use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use wasend_core::config::{ApiConfig, Config};
use wasend_core::error::WasendError;
use wasend_store::Store;

use crate::dispatch::Dispatcher;
use crate::realtime;
use crate::session::{ConnectOutcome, SessionManager, SessionSnapshot};

/// Shell served when `{web_dir}/index.html` is missing.
const FALLBACK_INDEX: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>wasend</title></head>
<body>
<h1>wasend</h1>
<p>Front end not installed. The API is available under <code>/api</code>.</p>
<script src="/app.js"></script>
</body>
</html>
"#;

pub(crate) type ApiError = (StatusCode, Json<Value>);

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) session: Arc<SessionManager>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) store: Store,
    pub(crate) api_key: Option<String>,
    uptime: Instant,
    web_dir: PathBuf,
    session_dir: PathBuf,
    cors: bool,
}

impl AppState {
    pub fn new(
        config: &Config,
        session: Arc<SessionManager>,
        dispatcher: Arc<Dispatcher>,
        store: Store,
    ) -> Self {
        let api_key = if config.api.api_key.is_empty() {
            None
        } else {
            Some(config.api.api_key.clone())
        };
        Self {
            session,
            dispatcher,
            store,
            api_key,
            uptime: Instant::now(),
            web_dir: PathBuf::from(wasend_core::shellexpand(&config.api.web_dir)),
            session_dir: config.session_dir(),
            cors: config.api.cors,
        }
    }
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({"success": false, "error": message.into()})),
    )
}

/// Map a domain error onto an HTTP status.
pub(crate) fn api_error(e: WasendError) -> ApiError {
    let status = match &e {
        WasendError::Validation(_)
        | WasendError::InvalidRecipient(_)
        | WasendError::NotConnected => StatusCode::BAD_REQUEST,
        WasendError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => {
            error!("request failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e.to_string())
}

pub(crate) fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))
}

/// Constant-time string comparison to prevent timing attacks on API token validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Whether `token` matches the configured key (always true without one).
pub(crate) fn token_matches(token: &str, api_key: &Option<String>) -> bool {
    match api_key {
        Some(key) => constant_time_eq(token, key),
        None => true,
    }
}

/// Check bearer token auth. Returns `None` if authorized, `Some(response)` if rejected.
pub(crate) fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<ApiError> {
    if api_key.is_none() {
        return None;
    }

    let Some(header) = headers.get(header::AUTHORIZATION) else {
        return Some(error_response(
            StatusCode::UNAUTHORIZED,
            "missing Authorization header",
        ));
    };
    let Ok(value) = header.to_str() else {
        return Some(error_response(
            StatusCode::UNAUTHORIZED,
            "invalid Authorization header",
        ));
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if token_matches(token, api_key) => None,
        _ => Some(error_response(StatusCode::UNAUTHORIZED, "invalid token")),
    }
}

async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }
    Ok(next.run(request).await)
}

/// `GET /`: HTML shell.
async fn index(State(state): State<AppState>) -> Html<String> {
    match tokio::fs::read_to_string(state.web_dir.join("index.html")).await {
        Ok(html) => Html(html),
        Err(_) => Html(FALLBACK_INDEX.to_string()),
    }
}

/// `GET /app.js`: front-end script, never cached.
async fn app_js(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.web_dir.join("app.js")).await {
        Ok(js) => (
            [
                (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            js,
        )
            .into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "app.js not found").into_response(),
    }
}

/// `GET /health`: liveness plus the connection status. No auth.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptimeSecs": state.uptime.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "whatsapp": state.session.status().await,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    success: bool,
    #[serde(flatten)]
    session: SessionSnapshot,
    client: String,
    client_connected: bool,
    uptime_secs: u64,
    version: &'static str,
    storage: &'static str,
    session_dir: String,
    session_stored: bool,
}

/// `GET /api/status`: connection snapshot and diagnostics.
async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    let client = state.session.client();
    Json(StatusBody {
        success: true,
        session: state.session.snapshot().await,
        client: client.name().to_string(),
        client_connected: client.is_connected().await,
        uptime_secs: state.uptime.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
        storage: state.store.backend().as_str(),
        session_dir: state.session_dir.display().to_string(),
        session_stored: state.session_dir.exists(),
    })
}

/// `POST /api/connect`: start a connection attempt.
async fn connect(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let outcome = state.session.request_connect().await.map_err(api_error)?;
    match outcome {
        ConnectOutcome::Started | ConnectOutcome::AlreadyActive(_) => Ok(Json(json!({
            "success": true,
            "status": state.session.status().await,
            "message": outcome.message(),
        }))),
        ConnectOutcome::Cooldown(left) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "error": outcome.message(),
                "retryAfterSecs": left.as_secs() + u64::from(left.subsec_nanos() > 0),
            })),
        )),
        ConnectOutcome::AttemptLimit => Err(error_response(
            StatusCode::TOO_MANY_REQUESTS,
            outcome.message(),
        )),
    }
}

/// `POST /api/reset`: tear down and forget the session.
async fn reset(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.session.reset().await.map_err(api_error)?;
    Ok(Json(json!({
        "success": true,
        "message": "connection reset",
        "status": state.session.status().await,
    })))
}

/// `POST /api/disconnect`: close the socket, keep credentials.
async fn disconnect(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.session.disconnect().await.map_err(api_error)?;
    Ok(Json(json!({
        "success": true,
        "message": "disconnected",
        "status": state.session.status().await,
    })))
}

/// Build the axum router with shared state.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(status))
        .route("/connect", post(connect))
        .route("/reset", post(reset))
        .route("/disconnect", post(disconnect))
        .route("/send-message", post(messaging::send_message))
        .route("/send-bulk", post(messaging::send_bulk))
        .route("/send-bulk-message", post(messaging::send_bulk))
        .route(
            "/contacts",
            get(crud::list_contacts).post(crud::create_contact),
        )
        .route(
            "/contacts/{id}",
            get(crud::get_contact)
                .put(crud::update_contact)
                .delete(crud::delete_contact),
        )
        .route("/groups", get(crud::list_groups).post(crud::create_group))
        .route(
            "/groups/{id}",
            get(crud::get_group)
                .put(crud::update_group)
                .delete(crud::delete_group),
        )
        .route(
            "/templates",
            get(crud::list_templates).post(crud::create_template),
        )
        .route(
            "/templates/{id}",
            get(crud::get_template)
                .put(crud::update_template)
                .delete(crud::delete_template),
        )
        .route("/logs", get(crud::list_logs).delete(crud::clear_logs))
        .route("/logs/stats", get(crud::log_stats))
        .route("/logs/{id}", get(crud::get_log))
        .route(
            "/message-logs",
            get(crud::list_logs).delete(crud::clear_logs),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let router = Router::new()
        .route("/", get(index))
        .route("/app.js", get(app_js))
        .route("/health", get(health))
        .route("/ws", get(realtime::ws_handler))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(1024 * 1024)); // 1 MB max request body

    let router = if state.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    config: &ApiConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!("API server failed to bind to {addr}: {e}");
        e
    })?;

    info!("API server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
