use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use chrono::Utc;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::cycle::{CycleReport, FetchCycle};
use crate::badge::{self, Badge};
use crate::config::UrgencyScale;
use crate::panel::PanelView;

#[derive(Clone)]
pub struct ControlState {
    pub cycle: Arc<FetchCycle>,
    pub scale: UrgencyScale,
}

#[derive(Debug, Serialize)]
pub struct RefreshAck {
    pub success: bool,
    pub report: CycleReport,
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/state", get(panel_state))
        .route("/badge", get(current_badge))
        .route("/refresh", post(refresh))
        .route("/hidden", delete(clear_hidden))
        .route("/hidden/:id", post(hide))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<S>(addr: SocketAddr, state: ControlState, shutdown: S) -> anyhow::Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {addr}: {err}"))?;
    tracing::info!(%addr, "control endpoint listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

type HandlerError = (StatusCode, String);

fn internal(err: anyhow::Error) -> HandlerError {
    tracing::error!(?err, "control request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

async fn panel_state(State(state): State<ControlState>) -> Result<Json<PanelView>, HandlerError> {
    let view = crate::app::follow::load_view(state.cycle.store().as_ref(), state.scale)
        .await
        .map_err(internal)?;
    Ok(Json(view))
}

async fn current_badge(State(state): State<ControlState>) -> Result<Json<Badge>, HandlerError> {
    let snapshot = state.cycle.store().load_snapshot().await.map_err(internal)?;
    Ok(Json(badge::from_snapshot(&snapshot, Utc::now())))
}

async fn refresh(State(state): State<ControlState>) -> Result<Json<RefreshAck>, HandlerError> {
    let report = state.cycle.trigger("refresh").await.map_err(internal)?;
    Ok(Json(RefreshAck {
        success: true,
        report,
    }))
}

async fn hide(
    State(state): State<ControlState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, HandlerError> {
    let id = id.trim();
    if id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "id is required".to_owned()));
    }
    let hidden = state.cycle.store().hide(id).await.map_err(internal)?;
    Ok(Json(hidden))
}

async fn clear_hidden(State(state): State<ControlState>) -> Result<StatusCode, HandlerError> {
    state.cycle.store().clear_hidden().await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}
