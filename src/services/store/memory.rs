use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{apply_analysis_update, apply_dataset_update, apply_user_update, newest_first, Store};
use crate::error::{AppError, AppResult};
use crate::models::{
    Analysis, AnalysisUpdate, ChatMessage, Dataset, DatasetUpdate, User, UserUpdate,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    // lower-cased email -> user id
    users_by_email: HashMap<String, String>,
    datasets: HashMap<String, Dataset>,
    analyses: HashMap<String, Analysis>,
    chat: HashMap<String, Vec<ChatMessage>>,
    files: HashMap<String, String>,
}

impl Tables {
    fn remove_dataset(&mut self, id: &str) -> bool {
        match self.datasets.remove(id) {
            Some(dataset) => {
                self.files.remove(&dataset.storage_path);
                self.analyses.retain(|_, a| a.dataset_id != id);
                true
            }
            None => false,
        }
    }
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut tables = self.tables.write();
        let key = user.email.to_lowercase();
        if tables.users_by_email.contains_key(&key) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        tables.users_by_email.insert(key, user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.tables.read().users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read();
        Ok(tables
            .users_by_email
            .get(&email.to_lowercase())
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<Option<User>> {
        let mut tables = self.tables.write();
        Ok(tables.users.get_mut(id).map(|user| {
            apply_user_update(user, update);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.remove(id) else {
            return Ok(false);
        };
        tables.users_by_email.remove(&user.email.to_lowercase());

        let owned: Vec<String> = tables
            .datasets
            .values()
            .filter(|d| d.user_id == id)
            .map(|d| d.id.clone())
            .collect();
        for dataset_id in owned {
            tables.remove_dataset(&dataset_id);
        }
        tables.chat.remove(id);
        Ok(true)
    }

    async fn create_dataset(&self, dataset: Dataset) -> AppResult<Dataset> {
        self.tables
            .write()
            .datasets
            .insert(dataset.id.clone(), dataset.clone());
        Ok(dataset)
    }

    async fn get_dataset(&self, id: &str) -> AppResult<Option<Dataset>> {
        Ok(self.tables.read().datasets.get(id).cloned())
    }

    async fn list_datasets_by_user(&self, user_id: &str) -> AppResult<Vec<Dataset>> {
        let mut datasets: Vec<Dataset> = self
            .tables
            .read()
            .datasets
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut datasets, |d| d.created_at);
        Ok(datasets)
    }

    async fn update_dataset(&self, id: &str, update: DatasetUpdate) -> AppResult<Option<Dataset>> {
        let mut tables = self.tables.write();
        Ok(tables.datasets.get_mut(id).map(|dataset| {
            apply_dataset_update(dataset, update);
            dataset.clone()
        }))
    }

    async fn delete_dataset(&self, id: &str) -> AppResult<bool> {
        Ok(self.tables.write().remove_dataset(id))
    }

    async fn create_analysis(&self, analysis: Analysis) -> AppResult<Analysis> {
        self.tables
            .write()
            .analyses
            .insert(analysis.id.clone(), analysis.clone());
        Ok(analysis)
    }

    async fn get_analysis(&self, id: &str) -> AppResult<Option<Analysis>> {
        Ok(self.tables.read().analyses.get(id).cloned())
    }

    async fn list_analyses_by_dataset(&self, dataset_id: &str) -> AppResult<Vec<Analysis>> {
        let mut analyses: Vec<Analysis> = self
            .tables
            .read()
            .analyses
            .values()
            .filter(|a| a.dataset_id == dataset_id)
            .cloned()
            .collect();
        newest_first(&mut analyses, |a| a.created_at);
        Ok(analyses)
    }

    async fn list_analyses_by_user(&self, user_id: &str) -> AppResult<Vec<Analysis>> {
        let mut analyses: Vec<Analysis> = self
            .tables
            .read()
            .analyses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut analyses, |a| a.created_at);
        Ok(analyses)
    }

    async fn update_analysis(&self, id: &str, update: AnalysisUpdate) -> AppResult<Option<Analysis>> {
        let mut tables = self.tables.write();
        Ok(tables.analyses.get_mut(id).map(|analysis| {
            apply_analysis_update(analysis, update);
            analysis.clone()
        }))
    }

    async fn delete_analysis(&self, id: &str) -> AppResult<bool> {
        Ok(self.tables.write().analyses.remove(id).is_some())
    }

    async fn store_file(&self, path: &str, content: String) -> AppResult<()> {
        self.tables.write().files.insert(path.to_string(), content);
        Ok(())
    }

    async fn get_file(&self, path: &str) -> AppResult<Option<String>> {
        Ok(self.tables.read().files.get(path).cloned())
    }

    async fn delete_file(&self, path: &str) -> AppResult<bool> {
        Ok(self.tables.write().files.remove(path).is_some())
    }

    async fn add_chat_message(&self, message: ChatMessage) -> AppResult<ChatMessage> {
        self.tables
            .write()
            .chat
            .entry(message.user_id.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn chat_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<ChatMessage>> {
        let tables = self.tables.read();
        let messages = tables.chat.get(user_id).map(Vec::as_slice).unwrap_or(&[]);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages[skip..].to_vec())
    }

    async fn clear_chat_history(&self, user_id: &str) -> AppResult<()> {
        self.tables.write().chat.remove(user_id);
        Ok(())
    }
}
