use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::analysis::AnalysisResult;

/// `<prefix>_<uuid>` identifiers, e.g. `dataset_4f0c…`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user as returned to clients, without the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Uploaded,
    Processing,
    Analyzed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: usize,
    pub storage_path: String,
    pub status: DatasetStatus,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: String,
    pub filename: String,
    pub size: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub status: DatasetStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Dataset> for DatasetSummary {
    fn from(d: &Dataset) -> Self {
        Self {
            id: d.id.clone(),
            filename: d.filename.clone(),
            size: d.size,
            row_count: d.row_count,
            column_count: d.column_count,
            columns: d.columns.clone(),
            status: d.status,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetUpdate {
    pub status: Option<DatasetStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Preprocessing,
    Analyzing,
    Generating,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: String,
    pub dataset_id: String,
    pub user_id: String,
    pub status: AnalysisStatus,
    pub progress: u8,
    pub results: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummaryView {
    pub id: String,
    pub dataset_id: String,
    pub status: AnalysisStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Analysis> for AnalysisSummaryView {
    fn from(a: &Analysis) -> Self {
        Self {
            id: a.id.clone(),
            dataset_id: a.dataset_id.clone(),
            status: a.status,
            progress: a.progress,
            created_at: a.created_at,
            completed_at: a.completed_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisUpdate {
    pub status: Option<AnalysisStatus>,
    pub progress: Option<u8>,
    pub results: Option<AnalysisResult>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dataset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub analysis_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context: Option<ChatContext>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_datasets: usize,
    pub total_analyses: usize,
    pub completed_analyses: usize,
    pub total_insights: usize,
}
