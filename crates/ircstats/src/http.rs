// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only HTTP API.
//!
//! - `GET /api/v1/health` - readiness and cache counters
//! - `GET /api/v1/cache` (also `/api/cache`) - current snapshot
//! - `GET /api/v1/whois/:nick` - raw `NickServ INFO`
//! - `GET /api/v1/cwhois/:channel` - raw `ChanServ INFO`

use crate::cache::UserCache;
use crate::error::RpcError;
use crate::rpc::{self, ServicesRpc};
use crate::store::SnapshotStore;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

const UNKNOWN_CHANNEL: &str = "Unknown channel or not registered.";

/// Shared handler state.
pub struct AppState<R> {
    pub store: Arc<SnapshotStore>,
    pub rpc: Arc<R>,
    pub cache: Arc<UserCache>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Fault { ref message, .. } if err.is_not_registered() => {
                ApiError::new(StatusCode::NOT_FOUND, message.clone())
            }
            other => {
                warn!("upstream lookup failed: {}", other);
                ApiError::new(StatusCode::BAD_GATEWAY, other.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    ready: bool,
    generation: u64,
    cache: CacheHealth,
}

#[derive(Serialize)]
struct CacheHealth {
    entries: usize,
    capacity: usize,
    hits: u64,
    misses: u64,
    expired: u64,
}

/// API routes.
pub fn router<R: ServicesRpc + 'static>(state: Arc<AppState<R>>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::<R>))
        .route("/api/v1/cache", get(snapshot::<R>))
        .route("/api/v1/whois/:nick", get(whois::<R>))
        .route("/api/v1/cwhois/:channel", get(cwhois::<R>))
        // Legacy path
        .route("/api/cache", get(snapshot::<R>))
        .with_state(state)
}

/// GET /api/v1/health
async fn health<R>(State(state): State<Arc<AppState<R>>>) -> Json<Health> {
    let stats = state.cache.stats();
    let ready = state.store.is_ready();
    Json(Health {
        status: if ready { "ok" } else { "starting" },
        ready,
        generation: state.store.generation(),
        cache: CacheHealth {
            entries: state.cache.len(),
            capacity: state.cache.capacity(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
        },
    })
}

/// GET /api/v1/cache
async fn snapshot<R>(State(state): State<Arc<AppState<R>>>) -> Result<Response, ApiError> {
    let current = state.store.current().ok_or_else(|| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "no snapshot available yet")
    })?;
    Ok(Json(current).into_response())
}

/// GET /api/v1/whois/:nick
async fn whois<R: ServicesRpc>(
    State(state): State<Arc<AppState<R>>>,
    Path(nick): Path<String>,
) -> Result<Response, ApiError> {
    let text = rpc::whois(state.rpc.as_ref(), &nick).await?;
    Ok(plain_text(text))
}

/// GET /api/v1/cwhois/:channel
async fn cwhois<R: ServicesRpc>(
    State(state): State<Arc<AppState<R>>>,
    Path(channel): Path<String>,
) -> Result<Response, ApiError> {
    let channel = if channel.starts_with('#') {
        channel
    } else {
        format!("#{}", channel)
    };

    match rpc::whois(state.rpc.as_ref(), &channel).await {
        Ok(text) => Ok(plain_text(text)),
        Err(e) if e.is_not_registered() || is_missing_params(&e) => {
            Err(ApiError::new(StatusCode::NOT_FOUND, UNKNOWN_CHANNEL))
        }
        Err(e) => Err(e.into()),
    }
}

fn is_missing_params(err: &RpcError) -> bool {
    match err {
        RpcError::Fault { message, .. } => message.to_lowercase().contains("missing param"),
        _ => false,
    }
}

fn plain_text(text: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response()
}
