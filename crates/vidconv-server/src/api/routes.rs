//! Route handlers.

use std::io;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, warn};
use vidconv_core::app::RegistryCounts;
use vidconv_core::domain::{Artifact, ArtifactRole};
use vidconv_core::registry::DeleteOutcome;
use vidconv_core::{ArtifactId, LifecycleError, TargetFormat};

use super::delivery::DeliveryStream;
use super::error::{ApiError, ApiResult};
use super::server::AppState;

/// Multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "video";

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.lifecycle.config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/upload", post(upload))
        .route("/convert/{format}", post(convert))
        .route("/download/{filename}", get(download))
        .route("/cleanup/{filename}", delete(cleanup))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub id: ArtifactId,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let reader = StreamReader::new(Box::pin(field.map_err(io::Error::other)));
        let receipt = state
            .lifecycle
            .intake()
            .accept(&original_name, reader)
            .await?;

        return Ok(Json(UploadResponse {
            success: true,
            id: receipt.artifact.id,
            filename: receipt.file_name,
            original_name: receipt.original_name,
            size: receipt.size,
        }));
    }

    Err(ApiError::bad_request(format!(
        "No file uploaded in field \"{UPLOAD_FIELD}\""
    )))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Intake file name as returned by `/upload` (or the bare id).
    pub filename: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub id: ArtifactId,
    pub filename: String,
    pub download_url: String,
}

async fn convert(
    State(state): State<AppState>,
    Path(format): Path<String>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Json<ConvertResponse>> {
    let format: TargetFormat = format
        .parse()
        .map_err(|e: vidconv_core::domain::UnknownFormat| ApiError::bad_request(e.to_string()))?;
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let intake = resolve(&state, &request.filename, ArtifactRole::Intake)?;
    let result = state.lifecycle.conversion().convert(intake.id, format).await?;

    let filename = result.file_name().unwrap_or_default().to_string();
    Ok(Json(ConvertResponse {
        success: true,
        id: result.id,
        download_url: format!("/download/{filename}"),
        filename,
    }))
}

async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> ApiResult<Response> {
    let artifact = resolve(&state, &filename, ArtifactRole::Result)?;

    let file = match tokio::fs::File::open(&artifact.path).await {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(artifact_id = %artifact.id, "tracked result is missing on disk");
            return Err(LifecycleError::ArtifactNotFound(filename).into());
        }
        Err(err) => return Err(LifecycleError::Io(err).into()),
    };
    let length = file.metadata().await.map(|m| m.len()).ok();

    let lifecycle = Arc::clone(&state.lifecycle);
    let id = artifact.id;
    let body = DeliveryStream::new(ReaderStream::new(file), move || {
        debug!(artifact_id = %id, "download completed");
        lifecycle.reaper().schedule(id);
    });

    let content_type = artifact
        .path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(TargetFormat::from_extension)
        .map(TargetFormat::content_type)
        .unwrap_or("application/octet-stream");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        artifact.file_name().unwrap_or_default()
    );

    let mut response = Body::from_stream(body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    /// `removed` or `already_gone`. `retry_pending` when the file could not
    /// be removed yet; the next request or sweep tries again. `in_progress`
    /// while another task is removing it.
    pub status: &'static str,
}

async fn cleanup(State(state): State<AppState>, Path(filename): Path<String>) -> ApiResult<Json<CleanupResponse>> {
    let id = ArtifactId::from_file_name(&filename)
        .ok_or_else(|| ApiError::bad_request(format!("Not an artifact name: {filename}")))?;

    let registry = state.lifecycle.registry();
    let owned = registry
        .get(id)
        .is_some_and(|artifact| names_artifact(&filename, &artifact));
    let status = if owned {
        match registry.reclaim(id).await {
            DeleteOutcome::Removed => "removed",
            DeleteOutcome::AlreadyAbsent => "already_gone",
            DeleteOutcome::Failed => "retry_pending",
            DeleteOutcome::Skipped if registry.get(id).is_some() => "in_progress",
            DeleteOutcome::Skipped => "already_gone",
        }
    } else {
        "already_gone"
    };

    Ok(Json(CleanupResponse {
        success: true,
        status,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub artifacts: RegistryCounts,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.lifecycle.is_shutting_down() {
        "shutting_down"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        artifacts: state.lifecycle.counts(),
    })
}

/// Active artifact of `role` named by `name` (`<id>.<ext>` or a bare id).
fn resolve(state: &AppState, name: &str, role: ArtifactRole) -> Result<Artifact, ApiError> {
    ArtifactId::from_file_name(name)
        .and_then(|id| state.lifecycle.registry().get_active(id, Some(role)))
        .filter(|artifact| names_artifact(name, artifact))
        .ok_or_else(|| LifecycleError::ArtifactNotFound(name.to_string()).into())
}

fn names_artifact(name: &str, artifact: &Artifact) -> bool {
    artifact.file_name() == Some(name) || artifact.id.to_string() == name
}
