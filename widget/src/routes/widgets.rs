//! Widget document endpoint.
//!
//! Serves `GET /widgets/{id}?token=...` as the JSON document the display
//! device polls.

use crate::layout::WidgetDocument;
use crate::render::render;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the widget endpoint.
#[derive(Debug, Deserialize)]
pub struct WidgetQuery {
    /// Shared secret of the widget.
    #[serde(default)]
    pub token: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Creates the widget routes.
pub fn widget_routes() -> Router<AppState> {
    Router::new().route("/widgets/{id}", get(get_widget))
}

async fn get_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WidgetQuery>,
) -> Result<Json<WidgetDocument>, (StatusCode, Json<ErrorResponse>)> {
    let Some(widget) = state.widget(&id, &query.token) else {
        tracing::debug!(widget = %id, "No widget for id and token");
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not_found",
                message: format!("No widget named {id} for the given token"),
            }),
        ));
    };

    let samples = state.samples().snapshot().map_err(|e| {
        tracing::error!(error = %e, "Failed to read samples");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal_error",
                message: e.to_string(),
            }),
        )
    })?;

    Ok(Json(render(widget, &samples, &state.status())))
}
