#![forbid(unsafe_code)]

//! HTTP surface over the [`Orchestrator`].
//!
//! Every handler hands its work to the blocking pool, since loading and
//! querying are synchronous. Errors are returned as `{error, code}` with the
//! status from [`LakeError::http_status`].

use std::{
    net::{IpAddr, SocketAddr},
    sync::{Arc, OnceLock},
};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::{net::TcpListener, task};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::DateRange;
use crate::config::ServerConfig;
use crate::error::LakeError;
use crate::orchestrator::{Answer, Orchestrator, QuestionRequest};
use crate::provider::{ProviderInfo, ProviderKind};

/// Listener options for [`serve`].
#[derive(Clone, Debug)]
pub struct ServeOptions {
    /// Network interface to bind to.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Allowed CORS origins.
    pub allow_origins: Vec<String>,
}

impl ServeOptions {
    /// Options from the `[server]` config section.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let host = config
            .host
            .parse()
            .map_err(|source| ServerError::InvalidHost {
                host: config.host.clone(),
                source,
            })?;
        Ok(Self {
            host,
            port: config.port,
            allow_origins: config.allow_origins.clone(),
        })
    }
}

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured host is not an IP address.
    #[error("invalid listen address '{host}': {source}")]
    InvalidHost {
        /// Configured host.
        host: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },
    /// Binding or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

type AppState = Arc<Orchestrator>;

/// Serves the API until Ctrl-C.
pub async fn serve(orchestrator: Orchestrator, options: ServeOptions) -> Result<(), ServerError> {
    install_tracing_subscriber("info");

    let app = build_router(Arc::new(orchestrator), &options.allow_origins);
    let addr = SocketAddr::from((options.host, options.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, allow_origins = ?options.allow_origins, "lakeq listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Router with every API route mounted.
pub fn build_router(orchestrator: Arc<Orchestrator>, allow_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/available-dates", get(available_dates_handler))
        .route("/api/query", post(query_handler))
        .route("/api/providers", get(providers_handler));

    if let Some(layer) = build_cors_layer(allow_origins) {
        router = router.layer(layer);
    }

    router
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow_origin = if origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::any()
    } else {
        let mut allowed = Vec::new();
        for origin in origins {
            let normalized = normalize_origin(origin);
            match normalized
                .as_deref()
                .and_then(|value| HeaderValue::from_str(value).ok())
            {
                Some(value) => allowed.push(value),
                None => tracing::warn!(%origin, "ignoring invalid CORS origin"),
            }
        }
        if allowed.is_empty() {
            return None;
        }
        AllowOrigin::list(allowed)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE]),
    )
}

fn normalize_origin(origin: &str) -> Option<String> {
    let trimmed = origin.trim().trim_end_matches('/');
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn available_dates_handler(
    State(state): State<AppState>,
) -> Result<Json<DateRange>, ApiError> {
    let range = task::spawn_blocking(move || state.available_dates()).await??;
    Ok(Json(range))
}

async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(request) = payload.map_err(|rejection| LakeError::Validation(rejection.body_text()))?;
    let answer = task::spawn_blocking(move || state.ask(&request)).await??;
    Ok(Json(answer))
}

async fn providers_handler(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        default: state.config().provider.name.clone(),
        providers: ProviderKind::ALL.into_iter().map(ProviderKind::info).collect(),
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ProvidersResponse {
    default: String,
    providers: Vec<ProviderInfo>,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Lake(#[from] LakeError),
    #[error("internal task failure: {0}")]
    Join(#[from] task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Lake(err) => (
                StatusCode::from_u16(err.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.code(),
            ),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::warn!(error = %self, code, "request rejected");
        }
        let body = Json(ErrorPayload {
            error: self.to_string(),
            code,
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
    code: &'static str,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}

/// Installs the global `tracing` subscriber once, logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_directive`.
pub fn install_tracing_subscriber(default_directive: &str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
