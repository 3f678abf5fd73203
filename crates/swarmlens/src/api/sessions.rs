use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use swarmlens_sessions::{SessionDetail, SessionRecord, SessionsError, SourceFilter};

use super::AppState;

type ApiError = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub source: Option<String>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let filter = match params.source {
        Some(raw) => raw
            .parse::<SourceFilter>()
            .map_err(|e| error_body(StatusCode::BAD_REQUEST, e))?,
        None => SourceFilter::All,
    };

    Ok(Json(state.store.list_sessions(filter).await))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = state.store.get_session(&id).await.map_err(|e| {
        tracing::warn!("Failed to read session {}: {}", id, e);
        error_body(status_for(&e), e.to_string())
    })?;

    Ok(Json(detail))
}

fn status_for(err: &SessionsError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_body(status: StatusCode, message: String) -> ApiError {
    (status, Json(json!({ "error": message })))
}
