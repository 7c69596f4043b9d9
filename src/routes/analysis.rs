use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        generate_id, Analysis, AnalysisStatus, AnalysisSummaryView, AnalysisUpdate, DatasetStatus,
        DatasetUpdate,
    },
    routes::extract::AuthUser,
    services::analysis::{self, AnalysisResult},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analysis/run/:dataset_id", post(run_analysis))
        .route("/api/analysis/results/:analysis_id", get(get_results))
        .route("/api/analysis/list", get(list_analyses))
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    message: &'static str,
    analysis: AnalysisSummaryView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    id: String,
    dataset_id: String,
    dataset_name: String,
    status: AnalysisStatus,
    progress: u8,
    results: Option<AnalysisResult>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    analysis: AnalysisView,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    analyses: Vec<AnalysisSummaryView>,
    total: usize,
}

async fn run_analysis(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(dataset_id): Path<String>,
) -> Result<Json<RunResponse>, AppError> {
    let start = std::time::Instant::now();

    let dataset = state
        .store
        .get_dataset(&dataset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Dataset not found".to_string()))?;
    auth.ensure_owner(&dataset.user_id)?;

    let now = Utc::now();
    let record = state
        .store
        .create_analysis(Analysis {
            id: generate_id("analysis"),
            dataset_id: dataset.id.clone(),
            user_id: auth.user_id().to_string(),
            status: AnalysisStatus::Pending,
            progress: 0,
            results: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
        .await?;
    tracing::info!("Starting analysis {} for dataset {}", record.id, dataset.id);

    let Some(content) = state.store.get_file(&dataset.storage_path).await? else {
        tracing::error!("File {} missing for dataset {}", dataset.storage_path, dataset.id);
        state
            .store
            .update_analysis(
                &record.id,
                AnalysisUpdate {
                    status: Some(AnalysisStatus::Error),
                    ..Default::default()
                },
            )
            .await?;
        return Err(AppError::NotFound("Dataset file not found".to_string()));
    };

    state
        .store
        .update_analysis(
            &record.id,
            AnalysisUpdate {
                status: Some(AnalysisStatus::Preprocessing),
                progress: Some(25),
                ..Default::default()
            },
        )
        .await?;

    let results = analysis::analyze(&content, &dataset.columns, &mut rand::thread_rng());

    let completed = state
        .store
        .update_analysis(
            &record.id,
            AnalysisUpdate {
                status: Some(AnalysisStatus::Completed),
                progress: Some(100),
                results: Some(results),
                completed_at: Some(Utc::now()),
            },
        )
        .await?
        .ok_or_else(|| AppError::Internal(format!("Analysis {} vanished", record.id)))?;

    state
        .store
        .update_dataset(
            &dataset.id,
            DatasetUpdate {
                status: Some(DatasetStatus::Analyzed),
            },
        )
        .await?;

    tracing::info!("Analysis {} completed in {:?}", completed.id, start.elapsed());

    Ok(Json(RunResponse {
        message: "Analysis started",
        analysis: AnalysisSummaryView::from(&completed),
    }))
}

async fn get_results(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(analysis_id): Path<String>,
) -> Result<Json<ResultsResponse>, AppError> {
    let record = state
        .store
        .get_analysis(&analysis_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))?;
    auth.ensure_owner(&record.user_id)?;

    let dataset_name = state
        .store
        .get_dataset(&record.dataset_id)
        .await?
        .map(|d| d.filename)
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(Json(ResultsResponse {
        analysis: AnalysisView {
            id: record.id,
            dataset_id: record.dataset_id,
            dataset_name,
            status: record.status,
            progress: record.progress,
            results: record.results,
            created_at: record.created_at,
            completed_at: record.completed_at,
        },
    }))
}

async fn list_analyses(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListResponse>, AppError> {
    let analyses = state.store.list_analyses_by_user(auth.user_id()).await?;

    Ok(Json(ListResponse {
        total: analyses.len(),
        analyses: analyses.iter().map(AnalysisSummaryView::from).collect(),
    }))
}
