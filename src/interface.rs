//! HTTP interface of the daemon.
//!
//! | Route            | Method | Body           | Response                 |
//! |------------------|--------|----------------|--------------------------|
//! | `/display-state` | GET    |                | `{"on": bool}`           |
//! | `/display-state` | PUT    | `{"on": bool}` | committed `{"on": bool}` |
//! | `/refresh`       | POST   |                | 204                      |
//!
//! Any other method on these routes is answered with 405 by the router.
//! The PUT body is decoded as JSON whatever its `Content-Type` says.
//! Requests still running after the configured request timeout get 504.

use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde_json::json;

use crate::{actuator::ActuatorError, app_context::AppState, display_state::DisplayState};

/// Failures reported to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not decode display state: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error("request did not complete within {0:?}")]
    TimedOut(Duration),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Actuator(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::InvalidInput(e) => warn!("Rejected display state request: {e}"),
            ApiError::Actuator(e) => error!("Display actuator failed: {e}"),
            ApiError::TimedOut(limit) => warn!("Request aborted after {limit:?}"),
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Builds the router serving the display endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/display-state",
            get(get_display_state).put(put_display_state),
        )
        .route("/refresh", post(refresh_window))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_timeout))
        .with_state(state)
}

/// Drops the handler once the request timeout elapses. Dropping it fires the
/// request token, which stops any external command still running.
async fn enforce_timeout(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let limit = state.config.request_timeout();
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => ApiError::TimedOut(limit).into_response(),
    }
}

async fn get_display_state(State(state): State<AppState>) -> Json<DisplayState> {
    Json(state.controller.state().await)
}

async fn put_display_state(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DisplayState>, ApiError> {
    let desired: DisplayState =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    info!("Display state requested: on={}", desired.on);

    // Cancels the external command if the client goes away mid-request.
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let committed = state.controller.set_state(desired, &cancel).await?;
    Ok(Json(committed))
}

async fn refresh_window(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    info!("Window refresh requested");

    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    state.controller.refresh(&cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}
