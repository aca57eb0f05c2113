use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;

use crate::error::{AppError, ServiceError};
use crate::models::file::{FileInfo, RpcResult, UploadQuery};
use crate::state::AppState;

/// `upload(name, bytes)`. The request body is the payload; a missing `name`
/// is treated as empty and rejected by the store.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<RpcResult<u64>>, AppError> {
    let name = query.name.unwrap_or_default();
    let outcome = state.store.upload(name, body).await?;
    Ok(Json(outcome.into()))
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileInfo>>, AppError> {
    let files = state.store.list().await?;
    Ok(Json(files))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RpcResult<()>>, AppError> {
    let outcome = state.store.delete(id).await?;
    Ok(Json(outcome.into()))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (file, blob) = match state.store.fetch(id).await? {
        Ok(found) => found,
        Err(ServiceError::NotFound(id)) => {
            return Err(AppError::NotFound(format!("File {} not found", id)))
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let etag = format!("\"{}\"", file.checksum);

    // Check If-None-Match
    if let Some(inm) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        if inm == etag || inm == file.checksum {
            return Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, &etag)
                .body(Body::empty())
                .map_err(|e| AppError::Internal(e.to_string()));
        }
    }

    let content_type = mime_guess::from_path(&file.info.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, &etag)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_safe_name(&file.info.name)),
        )
        .body(Body::from(blob.bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Names are stored verbatim; only the copy placed in the header is made
/// printable ASCII.
fn header_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
