use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{generate_id, AnalysisStatus, ChatContext, ChatMessage, ChatRole},
    routes::extract::AuthUser,
    services::assistant::{respond, AssistantContext, DatasetBrief},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/assistant/chat",
        post(chat).get(history).delete(clear_history),
    )
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    context: Option<ChatContext>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    message: ChatMessage,
    response: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    message: &'static str,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // Anything but a non-empty string is rejected.
    let message = match request.message {
        Value::String(text) if !text.is_empty() => text,
        _ => return Err(AppError::InvalidInput("Message is required".to_string())),
    };

    let user_id = auth.user_id();
    let datasets = state.store.list_datasets_by_user(user_id).await?;
    let analyses = state.store.list_analyses_by_user(user_id).await?;

    let context = AssistantContext {
        datasets: datasets
            .into_iter()
            .map(|d| DatasetBrief {
                filename: d.filename,
                row_count: d.row_count,
                column_count: d.column_count,
            })
            .collect(),
        results: analyses
            .into_iter()
            .filter(|a| a.status == AnalysisStatus::Completed)
            .filter_map(|a| a.results)
            .collect(),
    };

    state
        .store
        .add_chat_message(ChatMessage {
            id: generate_id("msg"),
            user_id: user_id.to_string(),
            role: ChatRole::User,
            content: message.clone(),
            context: request.context,
            created_at: Utc::now(),
        })
        .await?;

    let response = respond(&message, &context);
    tracing::debug!("Assistant replied to {} with {} chars", user_id, response.len());

    let saved = state
        .store
        .add_chat_message(ChatMessage {
            id: generate_id("msg"),
            user_id: user_id.to_string(),
            role: ChatRole::Assistant,
            content: response.clone(),
            context: None,
            created_at: Utc::now(),
        })
        .await?;

    Ok(Json(ChatResponse {
        message: saved,
        response,
    }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<HistoryResponse>, AppError> {
    let messages = state
        .store
        .chat_history(auth.user_id(), state.config.chat_history_limit)
        .await?;

    Ok(Json(HistoryResponse { messages }))
}

async fn clear_history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ClearResponse>, AppError> {
    state.store.clear_chat_history(auth.user_id()).await?;
    tracing::info!("Cleared chat history for {}", auth.user_id());

    Ok(Json(ClearResponse {
        message: "Chat history cleared",
    }))
}
