use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures_util::StreamExt;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{Level, LevelFilter, Log, Metadata, Record};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    env,
    fs::OpenOptions,
    io::Write,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use subtle::ConstantTimeEq;
use tokio::signal;
use tokio::sync::broadcast;
use tower_cookies::{Cookie, CookieManagerLayer, Cookies};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use themeforge_server::commands::{content_disposition, export_theme, ExportLocks};
use themeforge_server::models::{ServerSettings, ThemeDocument};
use themeforge_server::services::{
    apply_env_overrides, prune_logs, read_recent_logs, resolve_against, DocumentStore,
    DocumentStoreError, EventSink, SessionStore, SettingsManager, ThemeExporter, ThemeManager, LOG_EVENT,
};

// ============================================================================
// Constants
// ============================================================================

const AUTH_COOKIE_NAME: &str = "themeforge_session";
const CSRF_COOKIE_NAME: &str = "themeforge_csrf";
const CSRF_HEADER_NAME: &str = "x-csrf-token";
const COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60; // 7 days
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;
const DEFAULT_LOG_LINES: usize = 200;
const MAX_LOG_LINES: usize = 2000;

// ============================================================================
// Event System
// ============================================================================

#[derive(Clone, Serialize)]
struct ServerEvent {
    event: String,
    payload: Value,
}

#[derive(Clone)]
struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &str, payload: Value) {
        let _ = self.sender.send(ServerEvent {
            event: event.to_string(),
            payload,
        });
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
struct AppState {
    settings_manager: Arc<SettingsManager>,
    theme_manager: Arc<ThemeManager>,
    document_store: Arc<DocumentStore>,
    exporter: Arc<ThemeExporter>,
    export_locks: Arc<ExportLocks>,
    export_timeout_secs: u64,
    event_bus: EventBus,
    log_dir: PathBuf,
    auth_token: Option<String>,
    sessions: Arc<SessionStore>,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

#[derive(Serialize)]
struct ApiResponse {
    ok: bool,
    data: Option<Value>,
    error: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    let response = ApiResponse {
        ok: false,
        data: None,
        error: Some(error.into()),
    };
    (status, Json(response)).into_response()
}

fn ok_response(data: Value) -> Response {
    let response = ApiResponse {
        ok: true,
        data: Some(data),
        error: None,
    };
    (StatusCode::OK, Json(response)).into_response()
}

// ============================================================================
// Logging
// ============================================================================

struct ServerLogger {
    file: Mutex<std::fs::File>,
    event_bus: EventBus,
    level: LevelFilter,
}

impl ServerLogger {
    fn new(log_dir: &std::path::Path, event_bus: EventBus) -> Result<Self, Box<dyn std::error::Error>> {
        let log_path = log_dir.join("themeforge-server.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(Self {
            file: Mutex::new(file),
            event_bus,
            level: LevelFilter::Info,
        })
    }
}

impl Log for ServerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now();
        let date = timestamp.format("%Y-%m-%d");
        let time = timestamp.format("%H:%M:%S");
        let target = record.target();
        let level = record.level();
        let message = format!("{}", record.args());
        let line = format!("[{date}][{time}][{target}][{level}] {message}");

        if let Ok(mut file) = self.file.try_lock() {
            let _ = writeln!(file, "{line}");
        }

        let level_number = match level {
            Level::Error => 1,
            Level::Warn => 2,
            Level::Info => 3,
            Level::Debug => 4,
            Level::Trace => 5,
        };

        self.event_bus.emit(
            LOG_EVENT,
            json!({ "level": level_number, "message": message, "target": target }),
        );
    }

    fn flush(&self) {}
}

fn init_logger(log_dir: &std::path::Path, event_bus: EventBus) -> Result<(), Box<dyn std::error::Error>> {
    let logger = ServerLogger::new(log_dir, event_bus)?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

// ============================================================================
// Security Utilities
// ============================================================================

/// Constant-time token comparison to prevent timing attacks
fn verify_token(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Extract bearer token from Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Double-submit check: the `x-csrf-token` header must equal the CSRF cookie
fn csrf_valid(cookies: &Cookies, headers: &HeaderMap) -> bool {
    let Some(cookie) = cookies.get(CSRF_COOKIE_NAME) else {
        return false;
    };
    headers
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .is_some_and(|provided| verify_token(cookie.value(), provided))
}

// ============================================================================
// CORS Configuration
// ============================================================================

fn build_cors_layer() -> CorsLayer {
    let cors_origins = env::var("THEMEFORGE_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:*,http://127.0.0.1:*".to_string());

    let allowed_origins: Vec<String> = cors_origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let origin_str = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };

            allowed_origins.iter().any(|allowed| {
                if allowed.ends_with(":*") {
                    // Wildcard port matching
                    let prefix = allowed.trim_end_matches(":*");
                    origin_str.starts_with(prefix) && origin_str[prefix.len()..].starts_with(':')
                } else {
                    origin_str == allowed
                }
            })
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::COOKIE,
            header::AUTHORIZATION,
            HeaderName::from_static(CSRF_HEADER_NAME),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
}

// ============================================================================
// Authentication Endpoints
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    token: String,
}

/// Session cookie value, if it names a session this server issued
fn has_valid_session(sessions: &SessionStore, cookies: &Cookies) -> bool {
    cookies
        .get(AUTH_COOKIE_NAME)
        .is_some_and(|cookie| sessions.is_valid(cookie.value()))
}

/// Issue a session and set its cookie
fn set_session_cookie(sessions: &SessionStore, cookies: &Cookies) {
    let session_id = sessions.issue();
    let cookie = Cookie::build((AUTH_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(false) // Set to true when using HTTPS
        .same_site(tower_cookies::cookie::SameSite::Strict)
        .path("/")
        .max_age(tower_cookies::cookie::time::Duration::seconds(COOKIE_MAX_AGE_SECS))
        .build();
    cookies.add(cookie);
}

/// GET /auth/csrf - Issue a CSRF token, echoed back by the client in `x-csrf-token`
async fn auth_csrf(cookies: Cookies) -> impl IntoResponse {
    let token = uuid::Uuid::new_v4().to_string();
    let cookie = Cookie::build((CSRF_COOKIE_NAME, token.clone()))
        .http_only(true)
        .secure(false)
        .same_site(tower_cookies::cookie::SameSite::Strict)
        .path("/")
        .build();
    cookies.add(cookie);
    Json(json!({ "token": token }))
}

/// POST /auth/login - Validate token and set HttpOnly cookie
async fn auth_login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    match state.auth_token.as_deref() {
        None => {
            // No token configured - open access, set session cookie anyway
            set_session_cookie(&state.sessions, &cookies);
            Json(json!({ "ok": true }))
        }
        Some(expected) if verify_token(expected, &payload.token) => {
            set_session_cookie(&state.sessions, &cookies);
            Json(json!({ "ok": true }))
        }
        _ => {
            // Invalid token - add a small delay to prevent brute force
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Json(json!({ "ok": false, "error": "Invalid token" }))
        }
    }
}

/// POST /auth/logout - Revoke the session and clear its cookie
async fn auth_logout(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    if let Some(session) = cookies.get(AUTH_COOKIE_NAME) {
        state.sessions.revoke(session.value());
    }
    let cookie = Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.remove(cookie);
    Json(json!({ "ok": true }))
}

/// GET /auth/check - Check if session is valid
async fn auth_check(
    State(state): State<AppState>,
    cookies: Cookies,
) -> impl IntoResponse {
    // If no token configured, always authenticated
    if state.auth_token.is_none() {
        return Json(json!({ "authenticated": true, "required": false }));
    }

    let is_authenticated = has_valid_session(&state.sessions, &cookies);
    Json(json!({ "authenticated": is_authenticated, "required": true }))
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware - check for valid session cookie
async fn auth_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };

    if has_valid_session(&state.sessions, &cookies) {
        return next.run(request).await;
    }

    // Bearer token for programmatic access
    if bearer_token(&headers).is_some_and(|token| verify_token(expected, token)) {
        return next.run(request).await;
    }

    error_response(StatusCode::UNAUTHORIZED, "Authentication required")
}

/// Rate limiting middleware
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match state.rate_limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        ),
    }
}

// ============================================================================
// Request Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Readiness check - settings loadable and themes directory readable
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let checks = [
        ("settings", state.settings_manager.load().is_ok()),
        ("themes", state.theme_manager.is_ready()),
    ];

    let failed: Vec<&str> = checks
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| *name)
        .collect();

    if failed.is_empty() {
        Json(json!({ "ready": true })).into_response()
    } else {
        log::warn!("Readiness check failed: {failed:?}");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false, "failed": failed })),
        )
            .into_response()
    }
}

/// GET /api/themes - Canonical themes available for export
async fn list_themes_handler(State(state): State<AppState>) -> Response {
    let themes = state.theme_manager.list_themes();
    match serde_json::to_value(themes) {
        Ok(data) => ok_response(data),
        Err(e) => {
            log::error!("Failed to serialize theme list: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Operation failed")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExportRequest {
    #[serde(default)]
    document: Option<ThemeDocument>,
}

fn parse_export_request(body: &[u8]) -> Result<ExportRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExportRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid export request: {e}"))
}

async fn load_saved_document(state: &AppState, theme_id: &str) -> Result<ThemeDocument, Response> {
    state.document_store.load(theme_id).await.map_err(|e| {
        log::warn!("[DocumentStore] {e}");
        match e {
            DocumentStoreError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
            DocumentStoreError::InvalidId(_) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
            DocumentStoreError::Corrupt { .. } => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            DocumentStoreError::Io(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Operation failed")
            }
        }
    })
}

/// POST /api/themes/:theme_id/export - Compile the customization and stream the archive
async fn export_theme_handler(
    State(state): State<AppState>,
    Path(theme_id): Path<String>,
    cookies: Cookies,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !csrf_valid(&cookies, &headers) {
        log::warn!("[Export] Rejected export of '{theme_id}': missing or invalid CSRF token");
        return error_response(StatusCode::FORBIDDEN, "Invalid CSRF token");
    }

    if let Err(e) = state.theme_manager.theme_dir(&theme_id) {
        return error_response(StatusCode::NOT_FOUND, e);
    }

    let request = match parse_export_request(&body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e),
    };
    let document = match request.document {
        Some(document) => document,
        None => match load_saved_document(&state, &theme_id).await {
            Ok(document) => document,
            Err(response) => return response,
        },
    };

    let artifact = match export_theme(
        state.exporter.clone(),
        &state.export_locks,
        theme_id,
        document,
        state.export_timeout_secs,
    )
    .await
    {
        Ok(artifact) => artifact,
        Err(failure) => return error_response(failure.status(), failure.message()),
    };

    let disposition = HeaderValue::from_str(&content_disposition(&artifact.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(artifact.bytes),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    lines: Option<usize>,
}

/// GET /api/logs - Tail of the newest server log
async fn logs_handler(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Response {
    let max_lines = query.lines.unwrap_or(DEFAULT_LOG_LINES).clamp(1, MAX_LOG_LINES);
    match read_recent_logs(&state.log_dir, max_lines) {
        Ok(lines) => ok_response(json!(lines)),
        Err(e) => {
            log::error!("{e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Operation failed")
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
    cookies: Cookies,
) -> impl IntoResponse {
    // Check authentication: no token required, valid cookie, or valid query param
    let authenticated = state.auth_token.is_none()
        || has_valid_session(&state.sessions, &cookies)
        || query.token.as_deref().is_some_and(|token| {
            state.auth_token.as_deref().is_some_and(|expected| verify_token(expected, token))
        });

    if !authenticated {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state.event_bus.subscribe()))
}

async fn handle_socket(mut socket: WebSocket, receiver: broadcast::Receiver<ServerEvent>) {
    let mut events = BroadcastStream::new(receiver);
    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                log::debug!("WebSocket client lagged, dropped {skipped} event(s)");
                continue;
            }
        };
        let Ok(payload) = serde_json::to_string(&event) else {
            continue;
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Per-user data directory, falling back to `./data`
fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .map(|dir| dir.join("themeforge"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn parse_host(host: &str) -> IpAddr {
    host.parse().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Look for a `themes` directory next to or above the working directory.
/// Used when the configured themes directory does not exist.
fn find_themes_dir_fallback() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;

    [
        cwd.join("themes"),
        cwd.join("../themes"),
        cwd.join("../../themes"),
    ]
    .into_iter()
    .filter_map(|candidate| candidate.canonicalize().ok())
    .find(|candidate| candidate.is_dir())
}

fn resolve_themes_dir(settings_manager: &SettingsManager, settings: &ServerSettings) -> PathBuf {
    let configured = resolve_against(settings_manager.data_dir(), &settings.themes_dir);
    if configured.is_dir() {
        return configured;
    }
    match find_themes_dir_fallback() {
        Some(fallback) => {
            log::warn!(
                "Themes directory {configured:?} does not exist, using {fallback:?}"
            );
            fallback
        }
        None => {
            log::warn!("Themes directory {configured:?} does not exist - exports will fail");
            configured
        }
    }
}

/// Graceful shutdown signal handler. Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, server shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let app_data_dir = env::var("THEMEFORGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_data_dir());
    let log_dir_path = env::var("THEMEFORGE_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_data_dir.join("logs"));
    std::fs::create_dir_all(&app_data_dir)?;
    std::fs::create_dir_all(&log_dir_path)?;

    let event_bus = EventBus::new();
    init_logger(&log_dir_path, event_bus.clone())?;

    let settings_manager = Arc::new(SettingsManager::new(app_data_dir.clone()));
    let mut settings = settings_manager.load().unwrap_or_else(|e| {
        log::warn!("Falling back to default settings: {e}");
        ServerSettings::default()
    });
    apply_env_overrides(&mut settings);

    match prune_logs(&log_dir_path, settings.log_retention_days) {
        Ok(0) => {}
        Ok(removed) => log::info!("Pruned {removed} old log file(s)"),
        Err(e) => log::warn!("Log pruning failed: {e}"),
    }

    // If remote access is disabled, force localhost unless the host was set explicitly
    let host = if !settings.remote_enabled && env::var("THEMEFORGE_HOST").is_err() {
        "127.0.0.1".to_string()
    } else {
        settings.host.clone()
    };
    let port = settings.port;
    let auth_token = Some(settings.api_token.trim().to_string()).filter(|token| !token.is_empty());

    let themes_dir = resolve_themes_dir(&settings_manager, &settings);
    let workspaces_dir = settings_manager.workspaces_dir(&settings);
    let documents_dir = settings_manager.documents_dir();
    std::fs::create_dir_all(&workspaces_dir)?;
    std::fs::create_dir_all(&documents_dir)?;

    let theme_manager = Arc::new(ThemeManager::new(themes_dir.clone(), documents_dir.clone()));
    let themes = theme_manager.list_themes();
    log::info!(
        "Available themes ({}): {:?}",
        themes.len(),
        themes.iter().map(|t| &t.id).collect::<Vec<_>>()
    );

    let export_events: Arc<dyn EventSink> = Arc::new(event_bus.clone());
    let exporter = Arc::new(ThemeExporter::new(
        themes_dir,
        workspaces_dir,
        &settings,
        export_events,
    ));

    let rate_limit = NonZeroU32::new(settings.rate_limit_per_minute)
        .or(NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_MINUTE))
        .unwrap_or(NonZeroU32::MIN);
    let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rate_limit)));

    let state = AppState {
        settings_manager,
        theme_manager,
        document_store: Arc::new(DocumentStore::new(documents_dir)),
        exporter,
        export_locks: Arc::new(ExportLocks::new()),
        export_timeout_secs: settings.export_timeout_secs,
        event_bus,
        log_dir: log_dir_path,
        auth_token,
        sessions: Arc::new(SessionStore::new()),
        rate_limiter,
    };

    let cors = build_cors_layer();

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; \
         script-src 'self'; \
         style-src 'self' 'unsafe-inline'; \
         connect-src 'self' ws://localhost:* wss://localhost:* http://localhost:* http://127.0.0.1:* ws://127.0.0.1:*; \
         img-src 'self' data: blob:; \
         frame-ancestors 'none'"
    );

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/api/themes", get(list_themes_handler))
        .route("/api/themes/:theme_id/export", post(export_theme_handler))
        .route("/api/logs", get(logs_handler))
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/auth/csrf", get(auth_csrf))
        .route("/auth/login", post(auth_login))
        .route("/auth/logout", post(auth_logout))
        .route("/auth/check", get(auth_check));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    let address = SocketAddr::new(parse_host(&host), port);
    log::info!("Themeforge backend listening on http://{address}");
    if state.auth_token.is_some() {
        log::info!("  Authentication: enabled");
    } else {
        log::info!("  Authentication: disabled (no token configured)");
    }

    let listener = tokio::net::TcpListener::bind(address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
