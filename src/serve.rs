//! Purpose: Serve the playground pipeline over HTTP.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based loopback server; every request derives from its own short-lived pipeline.
//! Invariants: Response envelopes match `outcome_json`; error kinds remain stable.
//! Invariants: Loopback-only unless explicitly allowed.
//! Notes: No state is shared between requests beyond the immutable share-link base.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, RawQuery, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use url::Url;

use certlogic_fiddle::api::{CertLogic, Error, ErrorKind, Pipeline, ShareState, decode};

use crate::outcome_json::{derivation_json, share_json};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
    pub base_url: Url,
}

struct AppState {
    base_url: Url,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        base_url: config.base_url.clone(),
    });
    let app = router(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to bind {}", config.bind))
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, base_url = %config.base_url, "listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(server_failed)?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(server_failed)?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/fiddle", get(fiddle_from_query).post(fiddle_from_body))
        .route("/v0/share", post(share_from_body))
        .with_state(state)
}

fn server_failed(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("server failed")
        .with_source(err)
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    if config.base_url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("--base-url cannot carry a query: {}", config.base_url))
            .with_hint("Use an http(s) URL like https://fiddle.example.org/."));
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Both fields optional; absent or empty means the default buffer, as in a link.
#[derive(Debug, Default, Deserialize)]
struct FiddleRequest {
    #[serde(default)]
    expr: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

impl FiddleRequest {
    fn into_share_state(self) -> ShareState {
        let defaults = ShareState::default();
        ShareState {
            expression_text: self
                .expr
                .filter(|text| !text.is_empty())
                .unwrap_or(defaults.expression_text),
            data_text: self
                .data
                .filter(|text| !text.is_empty())
                .unwrap_or(defaults.data_text),
        }
    }
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn fiddle_from_query(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    derivation_response(&state, decode(query.as_deref().unwrap_or("")))
}

async fn fiddle_from_body(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FiddleRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => derivation_response(&state, request.into_share_state()),
        Err(rejection) => error_response(request_body_error(rejection)),
    }
}

async fn share_from_body(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FiddleRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(request_body_error(rejection)),
    };
    let pipeline = Pipeline::from_share_state(CertLogic, request.into_share_state());
    match pipeline.share_url(&state.base_url) {
        Ok(url) => json_response(json!({ "share": share_json(&url) })),
        Err(err) => error_response(err),
    }
}

fn derivation_response(state: &AppState, buffers: ShareState) -> Response {
    let pipeline = Pipeline::from_share_state(CertLogic, buffers);
    let derivation = pipeline.derive();
    let share = if derivation.is_shareable() {
        pipeline.share_url(&state.base_url).ok()
    } else {
        None
    };
    json_response(derivation_json(&derivation, share.as_ref()))
}

fn request_body_error(rejection: JsonRejection) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid request body: {}", rejection.body_text()))
        .with_hint("Send a JSON object like {\"expr\": \"...\", \"data\": \"...\"}.")
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer: Option<&'static str>,
}

fn with_version_header(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert("certlogic-fiddle-version", HeaderValue::from_static("0"));
    response
}

fn json_response(payload: serde_json::Value) -> Response {
    with_version_header(Json(payload).into_response())
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage | ErrorKind::Malformed => StatusCode::BAD_REQUEST,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            buffer: err.buffer().map(|buffer| buffer.param()),
        },
    };
    with_version_header((status, Json(body)).into_response())
}
