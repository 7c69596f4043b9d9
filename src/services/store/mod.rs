//! Storage seam for users, datasets, analyses, uploaded files and chat
//! history. Handlers only see `Arc<dyn Store>`; the adapter is chosen at
//! startup from the config.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{
    Analysis, AnalysisStatus, AnalysisUpdate, ChatMessage, Dataset, DatasetUpdate, User,
    UserStats, UserUpdate,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: User) -> AppResult<User>;
    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;
    /// Case-insensitive lookup.
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<Option<User>>;
    /// Removes the user together with their datasets and chat history.
    async fn delete_user(&self, id: &str) -> AppResult<bool>;

    // Datasets
    async fn create_dataset(&self, dataset: Dataset) -> AppResult<Dataset>;
    async fn get_dataset(&self, id: &str) -> AppResult<Option<Dataset>>;
    /// Newest first.
    async fn list_datasets_by_user(&self, user_id: &str) -> AppResult<Vec<Dataset>>;
    async fn update_dataset(&self, id: &str, update: DatasetUpdate) -> AppResult<Option<Dataset>>;
    /// Also drops the stored file and every analysis of the dataset.
    async fn delete_dataset(&self, id: &str) -> AppResult<bool>;

    // Analyses
    async fn create_analysis(&self, analysis: Analysis) -> AppResult<Analysis>;
    async fn get_analysis(&self, id: &str) -> AppResult<Option<Analysis>>;
    async fn list_analyses_by_dataset(&self, dataset_id: &str) -> AppResult<Vec<Analysis>>;
    async fn list_analyses_by_user(&self, user_id: &str) -> AppResult<Vec<Analysis>>;
    async fn update_analysis(&self, id: &str, update: AnalysisUpdate) -> AppResult<Option<Analysis>>;
    async fn delete_analysis(&self, id: &str) -> AppResult<bool>;

    // Files
    async fn store_file(&self, path: &str, content: String) -> AppResult<()>;
    async fn get_file(&self, path: &str) -> AppResult<Option<String>>;
    async fn delete_file(&self, path: &str) -> AppResult<bool>;

    // Chat
    async fn add_chat_message(&self, message: ChatMessage) -> AppResult<ChatMessage>;
    /// The last `limit` messages, oldest first.
    async fn chat_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<ChatMessage>>;
    async fn clear_chat_history(&self, user_id: &str) -> AppResult<()>;

    async fn user_stats(&self, user_id: &str) -> AppResult<UserStats> {
        let datasets = self.list_datasets_by_user(user_id).await?;
        let analyses = self.list_analyses_by_user(user_id).await?;

        let completed: Vec<&Analysis> = analyses
            .iter()
            .filter(|a| a.status == AnalysisStatus::Completed)
            .collect();
        let total_insights = completed
            .iter()
            .filter_map(|a| a.results.as_ref())
            .map(|r| r.insights.len())
            .sum();

        Ok(UserStats {
            total_datasets: datasets.len(),
            total_analyses: analyses.len(),
            completed_analyses: completed.len(),
            total_insights,
        })
    }
}

/// Builds the adapter named by the config.
pub fn from_config(config: &Config) -> AppResult<Arc<dyn Store>> {
    match &config.database_path {
        Some(path) => {
            tracing::info!("Using SQLite store at {}", path);
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        None => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub(crate) fn apply_user_update(user: &mut User, update: UserUpdate) {
    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(hash) = update.password_hash {
        user.password_hash = hash;
    }
    user.updated_at = Utc::now();
}

pub(crate) fn apply_dataset_update(dataset: &mut Dataset, update: DatasetUpdate) {
    if let Some(status) = update.status {
        dataset.status = status;
    }
    dataset.updated_at = Utc::now();
}

pub(crate) fn apply_analysis_update(analysis: &mut Analysis, update: AnalysisUpdate) {
    if let Some(status) = update.status {
        analysis.status = status;
    }
    if let Some(progress) = update.progress {
        analysis.progress = progress.min(100);
    }
    if update.results.is_some() {
        analysis.results = update.results;
    }
    if update.completed_at.is_some() {
        analysis.completed_at = update.completed_at;
    }
    analysis.updated_at = Utc::now();
}

pub(crate) fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}
