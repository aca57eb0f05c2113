use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let stats = state.store.stats().await?;
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds();

    Ok(Json(json!({
        "data": {
            "file_count": stats.file_count,
            "total_size_bytes": stats.total_size_bytes,
            "next_id": stats.next_id,
            "uptime_seconds": uptime,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "error": null
    })))
}
