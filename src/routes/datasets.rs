use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{generate_id, AnalysisSummaryView, Dataset, DatasetStatus, DatasetSummary},
    routes::extract::AuthUser,
    services::ingest::{prepare_upload, UploadKind},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/datasets/upload", post(upload_dataset))
        .route("/api/datasets/list", get(list_datasets))
        .route("/api/datasets/:id", get(get_dataset).delete(delete_dataset))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    message: &'static str,
    dataset: DatasetSummary,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    datasets: Vec<DatasetSummary>,
    total: usize,
}

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    dataset: DatasetSummary,
    analyses: Vec<AnalysisSummaryView>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    message: &'static str,
}

async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            upload = Some((filename, mime_type, data));
            break;
        }
    }
    let (filename, mime_type, data) =
        upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    tracing::info!(
        "Upload from user {}: {} ({}), {}KB",
        auth.user_id(),
        filename,
        mime_type,
        data.len() / 1024
    );

    let kind = UploadKind::detect(&filename, &mime_type).ok_or_else(|| {
        tracing::warn!("Unsupported upload type: {} ({})", filename, mime_type);
        AppError::InvalidInput("Invalid file type. Allowed: CSV, JSON, Excel".to_string())
    })?;

    let size = data.len();
    let prepared = prepare_upload(kind, data)?;

    let dataset_id = generate_id("dataset");
    let storage_path = format!("uploads/{}/{}/{}", auth.user_id(), dataset_id, filename);
    state.store.store_file(&storage_path, prepared.content).await?;

    let now = Utc::now();
    let dataset = state
        .store
        .create_dataset(Dataset {
            id: dataset_id,
            user_id: auth.user_id().to_string(),
            filename: filename.clone(),
            original_name: filename,
            mime_type: if mime_type.is_empty() {
                kind.default_mime().to_string()
            } else {
                mime_type
            },
            size,
            storage_path,
            status: DatasetStatus::Uploaded,
            row_count: prepared.row_count,
            column_count: prepared.columns.len(),
            columns: prepared.columns,
            created_at: now,
            updated_at: now,
        })
        .await?;

    tracing::info!(
        "Stored dataset {} ({} rows, {} columns) in {:?}",
        dataset.id,
        dataset.row_count,
        dataset.column_count,
        start.elapsed()
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        dataset: DatasetSummary::from(&dataset),
    }))
}

async fn list_datasets(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListResponse>, AppError> {
    let datasets = state.store.list_datasets_by_user(auth.user_id()).await?;

    Ok(Json(ListResponse {
        total: datasets.len(),
        datasets: datasets.iter().map(DatasetSummary::from).collect(),
    }))
}

async fn owned_dataset(state: &AppState, auth: &AuthUser, id: &str) -> Result<Dataset, AppError> {
    let dataset = state
        .store
        .get_dataset(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Dataset not found".to_string()))?;
    auth.ensure_owner(&dataset.user_id)?;
    Ok(dataset)
}

async fn get_dataset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DatasetResponse>, AppError> {
    let dataset = owned_dataset(&state, &auth, &id).await?;
    let analyses = state.store.list_analyses_by_dataset(&id).await?;

    Ok(Json(DatasetResponse {
        dataset: DatasetSummary::from(&dataset),
        analyses: analyses.iter().map(AnalysisSummaryView::from).collect(),
    }))
}

async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    owned_dataset(&state, &auth, &id).await?;
    state.store.delete_dataset(&id).await?;
    tracing::info!("Deleted dataset {}", id);

    Ok(Json(DeleteResponse {
        message: "Dataset deleted successfully",
    }))
}
