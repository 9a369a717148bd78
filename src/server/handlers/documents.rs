use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::core::errors::ApiError;
use crate::ingest::{DocumentRecord, DocumentStatus};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub document_id: String,
    pub filename: String,
    pub status: DocumentStatus,
}

/// Accepts a manual upload and returns 202 immediately; processing runs in
/// the background and is observable via the status endpoint.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::invalid_input)?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|name| name.to_string())
                .ok_or_else(|| ApiError::invalid_input("file field has no filename"))?;
            let bytes = field.bytes().await.map_err(ApiError::invalid_input)?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::invalid_input("multipart field 'file' is required"))?;

    if bytes.len() > state.settings.server.max_upload_bytes {
        return Err(ApiError::invalid_input(format!(
            "file exceeds the {} byte upload limit",
            state.settings.server.max_upload_bytes
        )));
    }

    let document = state.ingestion.submit(bytes, &filename).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            document_id: document.id,
            filename: document.filename,
            status: document.status,
        }),
    ))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(state.ingestion.list_documents().await?))
}

pub async fn get_document_status(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentRecord>, ApiError> {
    Ok(Json(state.ingestion.status(&document_id).await?))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.ingestion.delete_document(&document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
